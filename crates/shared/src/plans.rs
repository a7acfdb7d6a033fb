//! Subscription plans, billing cycles, and the INR price table.

use serde::{Deserialize, Serialize};

/// Sentinel for unlimited usage on the pro plan.
pub const UNLIMITED: i64 = -1;

/// Subscription plan tier.
///
/// Serialized lowercase on the wire; the backend is inconsistent about
/// casing in a few legacy paths ("FREE" vs "free"), so deserialization
/// is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Plan {
    Free,
    Starter,
    Pro,
}

/// Error returned when a plan string is not recognized.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown plan: {0}")]
pub struct InvalidPlan(pub String);

impl std::str::FromStr for Plan {
    type Err = InvalidPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "starter" => Ok(Plan::Starter),
            "pro" => Ok(Plan::Pro),
            _ => Err(InvalidPlan(s.to_string())),
        }
    }
}

impl TryFrom<String> for Plan {
    type Error = InvalidPlan;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Starter => "starter",
            Plan::Pro => "pro",
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, Plan::Free)
    }

    /// Display price in INR for a plan/cycle combination.
    ///
    /// Longer cycles carry the discounts from the backend price table;
    /// the backend computes the charged amount independently and these
    /// values must match it.
    pub fn price_inr(&self, cycle: BillingCycle) -> u32 {
        match (self, cycle) {
            (Plan::Free, _) => 0,
            (Plan::Starter, BillingCycle::Monthly) => 299,
            (Plan::Starter, BillingCycle::Quarterly) => 799,
            (Plan::Starter, BillingCycle::HalfYearly) => 1499,
            (Plan::Starter, BillingCycle::Yearly) => 2799,
            (Plan::Pro, BillingCycle::Monthly) => 999,
            (Plan::Pro, BillingCycle::Quarterly) => 2699,
            (Plan::Pro, BillingCycle::HalfYearly) => 4999,
            (Plan::Pro, BillingCycle::Yearly) => 8999,
        }
    }

    /// Monetary value reported for a paid conversion of this plan.
    ///
    /// Conversions are always reported at the monthly price regardless
    /// of the purchased cycle.
    pub fn conversion_value_inr(&self) -> u32 {
        self.price_inr(BillingCycle::Monthly)
    }

    pub fn limits(&self) -> PlanLimits {
        match self {
            Plan::Free => PlanLimits {
                resume_limit: 1,
                ats_analysis_limit: 2,
            },
            Plan::Starter => PlanLimits {
                resume_limit: 5,
                ats_analysis_limit: 10,
            },
            Plan::Pro => PlanLimits {
                resume_limit: UNLIMITED,
                ats_analysis_limit: UNLIMITED,
            },
        }
    }
}

/// Usage limits attached to a plan. `UNLIMITED` (-1) means no cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub resume_limit: i64,
    pub ats_analysis_limit: i64,
}

/// Billing cycle length, the `duration_months` multiplier on orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

/// Error returned for a month count outside {1, 3, 6, 12}.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid billing cycle: {0} months (expected 1, 3, 6 or 12)")]
pub struct InvalidBillingCycle(pub u32);

impl BillingCycle {
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Quarterly => 3,
            BillingCycle::HalfYearly => 6,
            BillingCycle::Yearly => 12,
        }
    }
}

impl TryFrom<u32> for BillingCycle {
    type Error = InvalidBillingCycle;

    fn try_from(months: u32) -> Result<Self, Self::Error> {
        match months {
            1 => Ok(BillingCycle::Monthly),
            3 => Ok(BillingCycle::Quarterly),
            6 => Ok(BillingCycle::HalfYearly),
            12 => Ok(BillingCycle::Yearly),
            other => Err(InvalidBillingCycle(other)),
        }
    }
}

impl From<BillingCycle> for u32 {
    fn from(cycle: BillingCycle) -> u32 {
        cycle.months()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_parses_case_insensitively() {
        assert_eq!("pro".parse::<Plan>().unwrap(), Plan::Pro);
        assert_eq!("FREE".parse::<Plan>().unwrap(), Plan::Free);
        assert_eq!("Starter".parse::<Plan>().unwrap(), Plan::Starter);
        assert!("enterprise".parse::<Plan>().is_err());
    }

    #[test]
    fn plan_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Plan::Pro).unwrap(), "\"pro\"");
        let plan: Plan = serde_json::from_str("\"STARTER\"").unwrap();
        assert_eq!(plan, Plan::Starter);
    }

    #[test]
    fn price_table_matches_backend() {
        assert_eq!(Plan::Starter.price_inr(BillingCycle::Monthly), 299);
        assert_eq!(Plan::Starter.price_inr(BillingCycle::Quarterly), 799);
        assert_eq!(Plan::Starter.price_inr(BillingCycle::HalfYearly), 1499);
        assert_eq!(Plan::Starter.price_inr(BillingCycle::Yearly), 2799);
        assert_eq!(Plan::Pro.price_inr(BillingCycle::Monthly), 999);
        assert_eq!(Plan::Pro.price_inr(BillingCycle::Quarterly), 2699);
        assert_eq!(Plan::Pro.price_inr(BillingCycle::HalfYearly), 4999);
        assert_eq!(Plan::Pro.price_inr(BillingCycle::Yearly), 8999);
        assert_eq!(Plan::Free.price_inr(BillingCycle::Yearly), 0);
    }

    #[test]
    fn conversion_value_is_monthly_price() {
        assert_eq!(Plan::Starter.conversion_value_inr(), 299);
        assert_eq!(Plan::Pro.conversion_value_inr(), 999);
    }

    #[test]
    fn limits_per_plan() {
        assert_eq!(Plan::Free.limits().resume_limit, 1);
        assert_eq!(Plan::Free.limits().ats_analysis_limit, 2);
        assert_eq!(Plan::Starter.limits().resume_limit, 5);
        assert_eq!(Plan::Pro.limits().resume_limit, UNLIMITED);
    }

    #[test]
    fn billing_cycle_round_trips_months() {
        for months in [1u32, 3, 6, 12] {
            let cycle = BillingCycle::try_from(months).unwrap();
            assert_eq!(cycle.months(), months);
        }
        assert!(BillingCycle::try_from(2).is_err());
        assert!(BillingCycle::try_from(0).is_err());
    }
}
