//! Conversion reporting
//!
//! Reports monetized conversions to the configured analytics
//! destination. Reporting is best-effort product telemetry, never a
//! hard dependency: when the destination id or the plan's label is
//! missing, every call is a silent no-op.
//!
//! A purchase fires at most once per payment identifier, no matter
//! which path reached it (modal completion or redirect success).

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use resumebuilder_client::Config;
use resumebuilder_shared::Plan;

/// A conversion event bound for the analytics destination.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionEvent {
    /// `"<destination id>/<label>"`.
    pub send_to: String,
    /// Value in INR; zero for free signups.
    pub value_inr: u32,
    pub currency: &'static str,
    /// Payment identifier, used downstream for deduplication too.
    pub transaction_id: Option<String>,
    /// User email for enhanced attribution, when known.
    pub email: Option<String>,
    pub plan: Option<Plan>,
}

/// Destination seam. The production sink logs the event; embedders
/// with a real analytics pipeline provide their own.
pub trait AnalyticsSink: Send + Sync {
    fn send_conversion(&self, event: &ConversionEvent);
}

/// Sink that records conversions to the log stream.
pub struct LoggingSink;

impl AnalyticsSink for LoggingSink {
    fn send_conversion(&self, event: &ConversionEvent) {
        tracing::info!(
            send_to = %event.send_to,
            value_inr = event.value_inr,
            transaction_id = event.transaction_id.as_deref().unwrap_or("-"),
            "conversion reported"
        );
    }
}

/// Fires conversion events, gated on configuration and deduplicated
/// per payment identifier.
pub struct ConversionReporter {
    destination_id: Option<String>,
    signup_label: Option<String>,
    starter_label: Option<String>,
    pro_label: Option<String>,
    sink: Arc<dyn AnalyticsSink>,
    reported: Mutex<HashSet<String>>,
}

impl ConversionReporter {
    pub fn new(config: &Config, sink: Arc<dyn AnalyticsSink>) -> Arc<Self> {
        Arc::new(Self {
            destination_id: config.google_ads_id.clone(),
            signup_label: config.signup_label.clone(),
            starter_label: config.starter_label.clone(),
            pro_label: config.pro_label.clone(),
            sink,
            reported: Mutex::new(HashSet::new()),
        })
    }

    fn purchase_label(&self, plan: Plan) -> Option<&str> {
        match plan {
            Plan::Free => None,
            Plan::Starter => self.starter_label.as_deref(),
            Plan::Pro => self.pro_label.as_deref(),
        }
    }

    /// Report a paid conversion. Returns whether an event fired.
    pub fn report_purchase(&self, plan: Plan, payment_id: &str, email: Option<&str>) -> bool {
        let (Some(destination), Some(label)) = (&self.destination_id, self.purchase_label(plan))
        else {
            tracing::debug!(%plan, "conversion tracking not configured, skipping purchase");
            return false;
        };

        {
            let mut reported = self
                .reported
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !reported.insert(payment_id.to_string()) {
                tracing::debug!(payment_id, "purchase already reported, skipping duplicate");
                return false;
            }
        }

        self.sink.send_conversion(&ConversionEvent {
            send_to: format!("{destination}/{label}"),
            value_inr: plan.conversion_value_inr(),
            currency: "INR",
            transaction_id: Some(payment_id.to_string()),
            email: email.map(str::to_string),
            plan: Some(plan),
        });
        true
    }

    /// Report a free signup. Returns whether an event fired.
    pub fn report_signup(&self, email: Option<&str>) -> bool {
        let (Some(destination), Some(label)) = (&self.destination_id, &self.signup_label) else {
            tracing::debug!("conversion tracking not configured, skipping signup");
            return false;
        };

        self.sink.send_conversion(&ConversionEvent {
            send_to: format!("{destination}/{label}"),
            value_inr: 0,
            currency: "INR",
            transaction_id: None,
            email: email.map(str::to_string),
            plan: None,
        });
        true
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{configured_reporter, RecordingSink};
    use super::*;

    #[test]
    fn unconfigured_reporter_is_a_silent_noop() {
        let sink = Arc::new(RecordingSink::default());
        let config = Config {
            api_base_url: url::Url::parse("https://api.example.com").unwrap(),
            razorpay_key_id: None,
            google_ads_id: None,
            signup_label: None,
            starter_label: None,
            pro_label: None,
            geo_lookup_url: None,
        };
        let reporter = ConversionReporter::new(&config, sink.clone() as Arc<dyn AnalyticsSink>);

        assert!(!reporter.report_purchase(Plan::Pro, "pay_1", None));
        assert!(!reporter.report_signup(Some("a@b.c")));
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_plan_label_skips_only_that_plan() {
        let sink = Arc::new(RecordingSink::default());
        let config = Config {
            api_base_url: url::Url::parse("https://api.example.com").unwrap(),
            razorpay_key_id: None,
            google_ads_id: Some("AW-123".into()),
            signup_label: None,
            starter_label: Some("starter1".into()),
            pro_label: None,
            geo_lookup_url: None,
        };
        let reporter = ConversionReporter::new(&config, sink.clone() as Arc<dyn AnalyticsSink>);

        assert!(!reporter.report_purchase(Plan::Pro, "pay_1", None));
        assert!(reporter.report_purchase(Plan::Starter, "pay_2", None));
        assert_eq!(sink.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn purchase_fires_once_per_payment_id() {
        let (reporter, sink) = configured_reporter();

        assert!(reporter.report_purchase(Plan::Pro, "pay_1", Some("a@b.c")));
        // Same payment id reached via a different code path.
        assert!(!reporter.report_purchase(Plan::Pro, "pay_1", Some("a@b.c")));
        // A different payment is a separate conversion.
        assert!(reporter.report_purchase(Plan::Starter, "pay_2", None));

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].send_to, "AW-123/pro1");
        assert_eq!(events[0].value_inr, 999);
        assert_eq!(events[0].transaction_id.as_deref(), Some("pay_1"));
        assert_eq!(events[1].value_inr, 299);
    }

    #[test]
    fn signup_reports_zero_value() {
        let (reporter, sink) = configured_reporter();
        assert!(reporter.report_signup(Some("a@b.c")));

        let events = sink.events.lock().unwrap();
        assert_eq!(events[0].send_to, "AW-123/signup1");
        assert_eq!(events[0].value_inr, 0);
        assert!(events[0].transaction_id.is_none());
    }
}
