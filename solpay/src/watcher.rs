//! Waiting for and validating the payment behind a transfer request.
//!
//! [`PaymentWatcher`] drives a small state machine:
//!
//! ```text
//! Pending ──found──▶ Confirmed ──valid──▶ Validated
//!    │                   │
//!    └──error/deadline/cancel──▶ Failed ◀──invalid──┘
//! ```
//!
//! While pending it sleeps for the poll interval, asks the
//! [`ReferenceLookup`] for a transaction tagged with the request's
//! references, and repeats only after that answer has been handled. A
//! [`FindReferenceError::NotFound`] answer keeps it pending; anything else
//! ends the search. Returning from the search drops the timer, so no lookup
//! runs after a terminal outcome.
//!
//! The current state is published on a [`tokio::sync::watch`] channel; see
//! [`PaymentWatcher::subscribe`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::address::{Address, Signature};
use crate::ledger::{
    FindReferenceError, FindReferenceOptions, Finality, ReferenceLookup, Transfer,
    TransferValidator, ValidateTransferError, ValidateTransferFields,
};
use crate::request::TransferRequest;

/// Default delay between two lookups.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Polling configuration for [`PaymentWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Delay before each lookup. Default: 250ms.
    pub interval: Duration,
    /// Upper bound on the whole search. Default: none, poll until found.
    pub deadline: Option<Duration>,
    /// Commitment level the transaction must reach. Default: confirmed.
    pub finality: Finality,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
            finality: Finality::default(),
        }
    }
}

impl WatchConfig {
    /// Sets the poll interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bounds the search to `deadline`.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the required finality.
    #[must_use]
    pub const fn with_finality(mut self, finality: Finality) -> Self {
        self.finality = finality;
        self
    }
}

/// Progress of a watched payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Waiting for a transaction carrying the references.
    Pending,
    /// A transaction was found; not yet validated.
    Confirmed(Signature),
    /// The transaction was found and matches the request.
    Validated(Signature),
    /// The search or the validation failed.
    Failed,
}

impl PaymentStatus {
    /// Returns `true` once no further transition can happen.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Validated(_) | Self::Failed)
    }
}

/// Terminal failures of a watched payment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// The request carries no reference, so its transaction cannot be located.
    #[error("transfer request has no reference to watch for")]
    MissingReference,
    /// The lookup failed with a non-transient error.
    #[error("transaction lookup failed: {0}")]
    Lookup(FindReferenceError),
    /// The transaction was found but does not match the request.
    #[error("payment validation failed: {0}")]
    Validation(ValidateTransferError),
    /// No transaction was found before the configured deadline.
    #[error("no transaction found within {deadline:?} ({polls} polls)")]
    DeadlineExceeded {
        /// The configured deadline.
        deadline: Duration,
        /// Lookups performed before giving up.
        polls: u64,
    },
    /// The watch was cancelled through its cancellation token.
    #[error("watch cancelled after {polls} polls")]
    Cancelled {
        /// Lookups performed before cancellation.
        polls: u64,
    },
}

/// Waits for the transaction paying a transfer request, then validates it.
///
/// # Type Parameters
///
/// - `L` - The reference lookup used while pending
/// - `V` - The validator used once confirmed
pub struct PaymentWatcher<L, V> {
    lookup: L,
    validator: V,
    config: WatchConfig,
    status: watch::Sender<PaymentStatus>,
    cancel: CancellationToken,
}

impl<L, V> std::fmt::Debug for PaymentWatcher<L, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentWatcher")
            .field("config", &self.config)
            .field("status", &*self.status.borrow())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<L, V> PaymentWatcher<L, V>
where
    L: ReferenceLookup,
    V: TransferValidator,
{
    /// Creates a watcher in the [`PaymentStatus::Pending`] state.
    #[must_use]
    pub fn new(lookup: L, validator: V, config: WatchConfig) -> Self {
        let (status, _) = watch::channel(PaymentStatus::Pending);
        Self {
            lookup,
            validator,
            config,
            status,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the cancellation token; cancelling it stops a pending search.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns a token that cancels this watcher's search when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> PaymentStatus {
        *self.status.borrow()
    }

    /// Subscribes to status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PaymentStatus> {
        self.status.subscribe()
    }

    /// Returns the polling configuration.
    #[must_use]
    pub const fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Waits for the request's transaction and validates it against the request.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::MissingReference`] if the request has no
    /// reference, and otherwise any error from [`Self::wait_for_signature`]
    /// or [`Self::validate`].
    pub async fn watch(&self, request: &TransferRequest) -> Result<Signature, WatchError> {
        let Some(reference) = request.reference() else {
            self.transition(PaymentStatus::Failed);
            return Err(WatchError::MissingReference);
        };
        let signature = self.wait_for_signature(reference).await?;
        self.validate(&signature, &ValidateTransferFields::from(request))
            .await?;
        Ok(signature)
    }

    /// Polls until a transaction carrying every address in `reference` is found.
    ///
    /// On success the status becomes [`PaymentStatus::Confirmed`]; on error it
    /// becomes [`PaymentStatus::Failed`].
    ///
    /// # Errors
    ///
    /// - [`WatchError::Lookup`] with the first non-transient lookup error
    /// - [`WatchError::DeadlineExceeded`] if a deadline is configured and passes
    /// - [`WatchError::Cancelled`] if the cancellation token fires
    pub async fn wait_for_signature(&self, reference: &[Address]) -> Result<Signature, WatchError> {
        let polls = AtomicU64::new(0);
        let search = self.poll_until_found(reference, &polls);
        let outcome = match self.config.deadline {
            Some(deadline) => tokio::time::timeout(deadline, search)
                .await
                .unwrap_or_else(|_| {
                    Err(WatchError::DeadlineExceeded {
                        deadline,
                        polls: polls.load(Ordering::Relaxed),
                    })
                }),
            None => search.await,
        };

        match &outcome {
            Ok(signature) => {
                #[cfg(feature = "telemetry")]
                tracing::info!(%signature, polls = polls.load(Ordering::Relaxed), "Signature found");
                self.transition(PaymentStatus::Confirmed(*signature));
            }
            Err(_e) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %_e, "Stopped waiting for transaction");
                self.transition(PaymentStatus::Failed);
            }
        }
        outcome
    }

    /// Validates a found transaction.
    ///
    /// On success the status becomes [`PaymentStatus::Validated`]; on error it
    /// becomes [`PaymentStatus::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Validation`] with the validator's error.
    pub async fn validate(
        &self,
        signature: &Signature,
        fields: &ValidateTransferFields,
    ) -> Result<Transfer, WatchError> {
        match self.validator.validate_transfer(signature, fields).await {
            Ok(transfer) => {
                self.transition(PaymentStatus::Validated(*signature));
                Ok(transfer)
            }
            Err(e) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(%signature, error = %e, "Payment validation failed");
                self.transition(PaymentStatus::Failed);
                Err(WatchError::Validation(e))
            }
        }
    }

    async fn poll_until_found(
        &self,
        reference: &[Address],
        polls: &AtomicU64,
    ) -> Result<Signature, WatchError> {
        let options = FindReferenceOptions {
            finality: self.config.finality,
        };
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    return Err(WatchError::Cancelled {
                        polls: polls.load(Ordering::Relaxed),
                    });
                }
                () = tokio::time::sleep(self.config.interval) => {}
            }

            let _attempt = polls.fetch_add(1, Ordering::Relaxed) + 1;
            #[cfg(feature = "telemetry")]
            tracing::debug!(attempt = _attempt, "Checking for transaction");

            match self.lookup.find_reference(reference, &options).await {
                Ok(info) => return Ok(info.signature),
                Err(e) if e.is_transient() => {}
                Err(e) => return Err(WatchError::Lookup(e)),
            }
        }
    }

    fn transition(&self, next: PaymentStatus) {
        let _previous = self.status.send_replace(next);
        #[cfg(feature = "telemetry")]
        tracing::debug!(from = ?_previous, to = ?next, "Payment status changed");
    }
}
