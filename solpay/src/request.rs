//! The transfer request record.
//!
//! A [`TransferRequest`] is the payable intent behind a `solana:` URI. It is
//! built once by checkout logic (via [`TransferRequest::builder`]) or produced
//! by [`crate::uri::parse_url`], and is never mutated afterwards.

use std::fmt;

use crate::address::Address;
use crate::amount::Amount;

/// A Solana Pay transfer request.
///
/// Optional fields are `None` when absent. `reference` is `None` when no
/// reference was given; when present it holds at least one address, in the
/// order the references were added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    recipient: Address,
    amount: Option<Amount>,
    spl_token: Option<Address>,
    reference: Option<Vec<Address>>,
    label: Option<String>,
    message: Option<String>,
    memo: Option<String>,
}

impl TransferRequest {
    /// Starts building a request paying `recipient`.
    #[must_use]
    pub const fn builder(recipient: Address) -> TransferRequestBuilder {
        TransferRequestBuilder {
            request: Self {
                recipient,
                amount: None,
                spl_token: None,
                reference: None,
                label: None,
                message: None,
                memo: None,
            },
        }
    }

    /// Account that receives the payment.
    #[must_use]
    pub const fn recipient(&self) -> Address {
        self.recipient
    }

    /// Amount to transfer, if fixed by the request.
    #[must_use]
    pub const fn amount(&self) -> Option<&Amount> {
        self.amount.as_ref()
    }

    /// Token mint of the transferred asset; `None` means native SOL.
    #[must_use]
    pub const fn spl_token(&self) -> Option<Address> {
        self.spl_token
    }

    /// Correlation references, in order.
    #[must_use]
    pub fn reference(&self) -> Option<&[Address]> {
        self.reference.as_deref()
    }

    /// Label describing the source of the request (merchant, app).
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Message describing the nature of the request (item, order).
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Memo to be included in the transfer transaction.
    #[must_use]
    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }
}

/// Writes the request as its `solana:` URI.
impl fmt::Display for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::uri::encode(self))
    }
}

/// Builder for [`TransferRequest`].
///
/// Empty strings passed to the text setters are treated as absent, matching
/// how the URI form treats empty query values.
#[derive(Debug, Clone)]
pub struct TransferRequestBuilder {
    request: TransferRequest,
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    Some(value.into()).filter(|s| !s.is_empty())
}

impl TransferRequestBuilder {
    /// Sets the amount.
    #[must_use]
    pub fn amount(mut self, amount: Amount) -> Self {
        self.request.amount = Some(amount);
        self
    }

    /// Sets the SPL token mint.
    #[must_use]
    pub fn spl_token(mut self, mint: Address) -> Self {
        self.request.spl_token = Some(mint);
        self
    }

    /// Appends one reference.
    #[must_use]
    pub fn reference(mut self, reference: Address) -> Self {
        self.request
            .reference
            .get_or_insert_with(Vec::new)
            .push(reference);
        self
    }

    /// Appends several references, keeping their order.
    #[must_use]
    pub fn references<I>(self, references: I) -> Self
    where
        I: IntoIterator<Item = Address>,
    {
        references.into_iter().fold(self, Self::reference)
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.request.label = non_empty(label);
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.request.message = non_empty(message);
        self
    }

    /// Sets the memo.
    #[must_use]
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.request.memo = non_empty(memo);
        self
    }

    /// Finishes the request.
    #[must_use]
    pub fn build(self) -> TransferRequest {
        self.request
    }
}
