//! Order initiation
//!
//! Turns a plan selection into a priced order. The backend owns the
//! price: the client sends plan, cycle, and a best-effort country
//! code, and gets back the amount it will actually be charged plus
//! the gateway to pay it through.

use resumebuilder_client::{ApiClient, ApiResult};
use resumebuilder_shared::{BillingCycle, Plan};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{BillingError, BillingResult};
use crate::gateway::{CheckoutOrder, CreateOrderResponse, ModalCompletion};
use crate::geo::GeoLocator;

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    plan: Plan,
    duration_months: u32,
    country: &'a str,
}

/// Modal-path verification request: the gateway-issued triple proves
/// the payment to the backend.
#[derive(Serialize)]
struct ConfirmModalRequest<'a> {
    razorpay_order_id: &'a str,
    razorpay_payment_id: &'a str,
    razorpay_signature: &'a str,
    plan: Plan,
}

/// Backend confirmation after a modal payment verifies.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmation {
    pub success: bool,
    #[serde(default)]
    pub subscription_type: Option<Plan>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub subscription_expiry: Option<OffsetDateTime>,
}

/// Creates orders and confirms modal payments.
#[derive(Clone)]
pub struct OrderService {
    api: ApiClient,
    geo: GeoLocator,
    fallback_key: Option<String>,
}

impl OrderService {
    pub fn new(api: ApiClient, geo: GeoLocator, fallback_key: Option<String>) -> Self {
        Self {
            api,
            geo,
            fallback_key,
        }
    }

    /// Request a priced order for a paid plan.
    ///
    /// The free plan never creates an order; selecting it is handled
    /// upstream as a no-op and rejected here as a safety net.
    pub async fn create(&self, plan: Plan, cycle: BillingCycle) -> BillingResult<CheckoutOrder> {
        if !plan.is_paid() {
            return Err(BillingError::Validation(
                "the free plan does not require an order".into(),
            ));
        }

        let country = self.geo.country_code().await;
        tracing::info!(%plan, months = cycle.months(), %country, "creating payment order");

        let raw: CreateOrderResponse = self
            .api
            .post_json(
                "/api/payment/create-order",
                &CreateOrderRequest {
                    plan,
                    duration_months: cycle.months(),
                    country: &country,
                },
            )
            .await?;

        CheckoutOrder::from_response(raw, self.fallback_key.as_deref())
    }

    /// Verify a modal payment server-side, immediately after the
    /// widget's completion handler fires.
    pub async fn confirm_modal(
        &self,
        completion: &ModalCompletion,
        plan: Plan,
    ) -> ApiResult<PaymentConfirmation> {
        tracing::info!(
            order_id = %completion.order_id,
            payment_id = %completion.payment_id,
            "verifying modal payment"
        );
        self.api
            .post_json(
                "/api/payment/verify",
                &ConfirmModalRequest {
                    razorpay_order_id: &completion.order_id,
                    razorpay_payment_id: &completion.payment_id,
                    razorpay_signature: &completion.signature,
                    plan,
                },
            )
            .await
    }
}
