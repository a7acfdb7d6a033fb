//! Environment-driven configuration
//!
//! Only the backend base URL is required. Gateway and analytics
//! options are optional; the features that need them degrade to
//! silent no-ops when unset.

use url::Url;

/// Client configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend REST API base URL (`API_BASE_URL`, required).
    pub api_base_url: Url,
    /// Razorpay publishable key for the modal checkout
    /// (`RAZORPAY_KEY_ID`). Used as a fallback when the order
    /// response omits one.
    pub razorpay_key_id: Option<String>,
    /// Google Ads destination id (`GOOGLE_ADS_ID`).
    pub google_ads_id: Option<String>,
    /// Conversion label for free signups (`GOOGLE_ADS_SIGNUP_LABEL`).
    pub signup_label: Option<String>,
    /// Conversion label for starter purchases (`GOOGLE_ADS_STARTER_LABEL`).
    pub starter_label: Option<String>,
    /// Conversion label for pro purchases (`GOOGLE_ADS_PRO_LABEL`).
    pub pro_label: Option<String>,
    /// IP geolocation endpoint for gateway routing (`GEO_LOOKUP_URL`).
    pub geo_lookup_url: Option<Url>,
}

/// Configuration loading failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid URL in {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_base_url = required_url("API_BASE_URL")?;
        let geo_lookup_url = optional_url("GEO_LOOKUP_URL")?;

        let config = Self {
            api_base_url,
            razorpay_key_id: optional("RAZORPAY_KEY_ID"),
            google_ads_id: optional("GOOGLE_ADS_ID"),
            signup_label: optional("GOOGLE_ADS_SIGNUP_LABEL"),
            starter_label: optional("GOOGLE_ADS_STARTER_LABEL"),
            pro_label: optional("GOOGLE_ADS_PRO_LABEL"),
            geo_lookup_url,
        };

        if config.google_ads_id.is_none() {
            tracing::warn!("Conversion tracking not configured (missing GOOGLE_ADS_ID)");
        }
        if config.razorpay_key_id.is_none() {
            tracing::warn!("Modal checkout key not configured (missing RAZORPAY_KEY_ID)");
        }
        if config.geo_lookup_url.is_none() {
            tracing::info!("Geolocation lookup not configured, orders default to IN");
        }

        Ok(config)
    }

    /// Whether conversion tracking can fire for the given label.
    pub fn tracking_configured(&self, label: Option<&str>) -> bool {
        self.google_ads_id.is_some() && label.is_some()
    }
}

fn optional(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn required_url(name: &'static str) -> Result<Url, ConfigError> {
    let raw = std::env::var(name).map_err(|_| ConfigError::Missing(name))?;
    Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { name, source })
}

fn optional_url(name: &'static str) -> Result<Option<Url>, ConfigError> {
    match optional(name) {
        Some(raw) => Url::parse(&raw)
            .map(Some)
            .map_err(|source| ConfigError::InvalidUrl { name, source }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "API_BASE_URL",
            "RAZORPAY_KEY_ID",
            "GOOGLE_ADS_ID",
            "GOOGLE_ADS_SIGNUP_LABEL",
            "GOOGLE_ADS_STARTER_LABEL",
            "GOOGLE_ADS_PRO_LABEL",
            "GEO_LOOKUP_URL",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn base_url_is_required() {
        clear_env();
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("API_BASE_URL")));
    }

    #[test]
    #[serial]
    fn optional_settings_default_to_none() {
        clear_env();
        std::env::set_var("API_BASE_URL", "https://api.example.com");
        let config = Config::from_env().unwrap();
        assert_eq!(config.api_base_url.as_str(), "https://api.example.com/");
        assert!(config.google_ads_id.is_none());
        assert!(!config.tracking_configured(Some("label")));
    }

    #[test]
    #[serial]
    fn tracking_requires_both_id_and_label() {
        clear_env();
        std::env::set_var("API_BASE_URL", "https://api.example.com");
        std::env::set_var("GOOGLE_ADS_ID", "AW-123456");
        let config = Config::from_env().unwrap();
        assert!(config.tracking_configured(Some("label")));
        assert!(!config.tracking_configured(None));
    }

    #[test]
    #[serial]
    fn invalid_base_url_is_rejected() {
        clear_env();
        std::env::set_var("API_BASE_URL", "not a url");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { name: "API_BASE_URL", .. }));
    }
}
