//! Payment gateway adapter
//!
//! Two payment surfaces sit behind one launch call: an in-page modal
//! widget (Razorpay, used for the home market) and a hosted checkout
//! redirect (Dodo, used internationally). The order response decides
//! which one runs; call sites never branch on gateway strings.

use serde::Deserialize;
use url::Url;

use crate::error::{BillingError, BillingResult};

/// Gateway discriminator on the order response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum GatewayKind {
    #[serde(rename = "modal")]
    Modal,
    #[serde(rename = "hosted-redirect")]
    HostedRedirect,
}

/// Raw `POST /api/payment/create-order` response.
#[derive(Debug, Deserialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub gateway: GatewayKind,
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default)]
    pub checkout_url: Option<String>,
}

/// Everything the modal widget needs to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalCheckout {
    pub order_id: String,
    /// Amount in minor units (paise for INR), as quoted by the backend.
    pub amount: i64,
    pub currency: String,
    /// Publishable gateway key.
    pub key_id: String,
}

/// Hosted checkout handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedCheckout {
    pub session_id: String,
    pub checkout_url: Url,
}

/// A priced order, dispatched to exactly one gateway surface.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOrder {
    Modal(ModalCheckout),
    HostedRedirect(HostedCheckout),
}

impl CheckoutOrder {
    /// Validate a raw order response into a launchable order.
    ///
    /// `fallback_key` is the configured publishable key, used when the
    /// backend omits one for the modal gateway.
    pub fn from_response(
        raw: CreateOrderResponse,
        fallback_key: Option<&str>,
    ) -> BillingResult<Self> {
        match raw.gateway {
            GatewayKind::Modal => {
                let key_id = raw
                    .key_id
                    .or_else(|| fallback_key.map(str::to_string))
                    .ok_or(BillingError::MalformedOrder("key_id"))?;
                Ok(CheckoutOrder::Modal(ModalCheckout {
                    order_id: raw.order_id,
                    amount: raw.amount,
                    currency: raw.currency,
                    key_id,
                }))
            }
            GatewayKind::HostedRedirect => {
                let checkout_url = raw
                    .checkout_url
                    .ok_or(BillingError::MalformedOrder("checkout_url"))?;
                let checkout_url = Url::parse(&checkout_url)
                    .map_err(|_| BillingError::MalformedOrder("checkout_url"))?;
                Ok(CheckoutOrder::HostedRedirect(HostedCheckout {
                    session_id: raw.order_id,
                    checkout_url,
                }))
            }
        }
    }

    pub fn order_id(&self) -> &str {
        match self {
            CheckoutOrder::Modal(m) => &m.order_id,
            CheckoutOrder::HostedRedirect(h) => &h.session_id,
        }
    }
}

/// Identifiers the modal widget hands back when the user pays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalCompletion {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// What happened when an order was handed to its gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchOutcome {
    /// Full-page navigation issued; reconciliation resumes on the
    /// success page after the gateway redirects back.
    RedirectedToGateway,
    /// The modal resolved with gateway-issued identifiers.
    Completed(ModalCompletion),
    /// The modal was closed without paying.
    Dismissed,
}

/// The UI surface payments run on. Implemented by the embedding
/// application; tests substitute recorders.
pub trait CheckoutSurface: Send + Sync {
    /// Navigate the whole page to the hosted checkout URL. This ends
    /// the current client lifecycle.
    fn redirect_to(&self, url: &Url);

    /// Open the embedded widget and wait for the user. `None` means
    /// the widget was dismissed.
    fn open_modal(
        &self,
        checkout: &ModalCheckout,
    ) -> impl std::future::Future<Output = Option<ModalCompletion>> + Send;
}

/// Dispatches a priced order to the correct payment surface.
pub struct GatewayAdapter<S: CheckoutSurface> {
    surface: S,
}

impl<S: CheckoutSurface> GatewayAdapter<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    pub async fn launch(&self, order: &CheckoutOrder) -> LaunchOutcome {
        match order {
            CheckoutOrder::HostedRedirect(hosted) => {
                tracing::info!(
                    session_id = %hosted.session_id,
                    "redirecting to hosted checkout"
                );
                self.surface.redirect_to(&hosted.checkout_url);
                LaunchOutcome::RedirectedToGateway
            }
            CheckoutOrder::Modal(modal) => {
                tracing::info!(order_id = %modal.order_id, "opening checkout modal");
                match self.surface.open_modal(modal).await {
                    Some(completion) => LaunchOutcome::Completed(completion),
                    None => {
                        tracing::info!(order_id = %modal.order_id, "checkout modal dismissed");
                        LaunchOutcome::Dismissed
                    }
                }
            }
        }
    }
}
