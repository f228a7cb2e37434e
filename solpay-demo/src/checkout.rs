//! The merchant side: a checkout that turns an order into a payment link.

use solpay::{Address, TransferRequest};
use url::Url;

use crate::config::CheckoutConfig;

/// A pending order and the link the customer pays it with.
#[derive(Debug, Clone)]
pub struct Checkout {
    /// The transfer request describing the payment.
    pub request: TransferRequest,
    /// The request encoded as a `solana:` URL.
    pub url: Url,
}

impl Checkout {
    /// The unique reference the merchant watches for.
    #[must_use]
    pub fn reference(&self) -> Option<Address> {
        self.request.reference().and_then(|r| r.first().copied())
    }
}

/// Creates a payment link for an order paid to `recipient`.
///
/// Every call attaches a fresh random reference, so two checkouts never share
/// a transaction.
#[must_use]
pub fn simulate_checkout(recipient: Address, config: &CheckoutConfig) -> Checkout {
    let reference = Address::new(rand::random::<[u8; 32]>());
    let mut builder = TransferRequest::builder(recipient)
        .amount(config.amount.clone())
        .reference(reference)
        .label(&config.label)
        .message(&config.message)
        .memo(&config.memo);
    if let Some(mint) = config.spl_token {
        builder = builder.spl_token(mint);
    }
    let request = builder.build();
    let url = solpay::uri::encode_url(&request);

    tracing::info!(%reference, amount = %config.amount, "Checkout created");

    Checkout { request, url }
}
