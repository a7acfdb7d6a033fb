#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shared subscription vocabulary for the resume builder client.
//!
//! Holds the plan tiers, billing cycles, the display price table, and
//! per-plan usage limits. The backend remains the source of truth for
//! the amount actually charged; everything in this crate is for client
//! display and conversion reporting only.

pub mod plans;

pub use plans::{BillingCycle, InvalidBillingCycle, InvalidPlan, Plan, PlanLimits, UNLIMITED};
