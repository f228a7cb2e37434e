//! Collaborator contracts for the ledger side of a payment.
//!
//! The payment flow depends on a cluster for four things, each behind its own
//! trait so callers can mix real clients, simulations and test stubs:
//!
//! - [`ReferenceLookup`] - Find the signature of a transaction tagged with references
//! - [`TransferBuilder`] - Build an unsigned transfer from a sender and request fields
//! - [`TransactionSender`] - Submit a signed transfer and wait for confirmation
//! - [`TransferValidator`] - Check that a confirmed transaction pays what was requested
//!
//! Only [`FindReferenceError::NotFound`] is a transient condition; every
//! other error is terminal for the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::{Address, Signature};
use crate::amount::Amount;
use crate::request::TransferRequest;

/// Commitment level a lookup waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finality {
    /// Voted on by a supermajority of the cluster.
    #[default]
    Confirmed,
    /// Rooted; cannot be rolled back.
    Finalized,
}

/// Options for [`ReferenceLookup::find_reference`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindReferenceOptions {
    /// Commitment level the transaction must have reached.
    pub finality: Finality,
}

/// A transaction signature found for a set of references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedSignatureInfo {
    /// Signature of the matching transaction.
    pub signature: Signature,
    /// Slot the transaction was processed in.
    pub slot: u64,
    /// Memo attached to the transaction, if any.
    pub memo: Option<String>,
}

/// Errors from [`ReferenceLookup::find_reference`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FindReferenceError {
    /// No transaction with the references has reached the requested finality yet.
    #[error("not found")]
    NotFound,
    /// The cluster could not be queried.
    #[error("rpc error: {0}")]
    Rpc(String),
}

impl FindReferenceError {
    /// Returns `true` for the "not found yet" condition, which callers retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Fields used to build a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTransferFields {
    /// Account receiving the transfer.
    pub recipient: Address,
    /// Amount to move.
    pub amount: Amount,
    /// Token mint; `None` for native SOL.
    pub spl_token: Option<Address>,
    /// References attached to the transfer as read-only accounts.
    pub reference: Option<Vec<Address>>,
    /// Memo attached to the transfer.
    pub memo: Option<String>,
}

/// An unsigned transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Account paying for the transfer.
    pub sender: Address,
    /// Account receiving the transfer.
    pub recipient: Address,
    /// Amount moved.
    pub amount: Amount,
    /// Token mint; `None` for native SOL.
    pub spl_token: Option<Address>,
    /// References attached to the transfer.
    pub reference: Option<Vec<Address>>,
    /// Memo attached to the transfer.
    pub memo: Option<String>,
}

impl Transfer {
    /// Builds a transfer from `sender` using the given fields.
    #[must_use]
    pub fn new(sender: Address, fields: CreateTransferFields) -> Self {
        Self {
            sender,
            recipient: fields.recipient,
            amount: fields.amount,
            spl_token: fields.spl_token,
            reference: fields.reference,
            memo: fields.memo,
        }
    }

    /// Returns `true` if every address in `references` is attached to the transfer.
    #[must_use]
    pub fn has_references(&self, references: &[Address]) -> bool {
        let attached = self.reference.as_deref().unwrap_or_default();
        references.iter().all(|r| attached.contains(r))
    }

    /// Marks the transfer as authorized by `signer`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferSignError`] if `signer` is not the transfer's sender.
    pub fn sign(self, signer: Address) -> Result<SignedTransfer, TransferSignError> {
        if signer != self.sender {
            return Err(TransferSignError {
                signer,
                sender: self.sender,
            });
        }
        Ok(SignedTransfer {
            transfer: self,
            signer,
        })
    }
}

/// Error returned when a transfer is signed by someone other than its sender.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Signer {signer} is not the transfer sender {sender}")]
pub struct TransferSignError {
    /// Address that attempted to sign.
    pub signer: Address,
    /// Address required to sign.
    pub sender: Address,
}

/// A transfer authorized by its sender, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    /// The authorized transfer.
    pub transfer: Transfer,
    /// Address that signed.
    pub signer: Address,
}

/// Errors from [`TransferBuilder::create_transfer`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreateTransferError {
    /// The sender account does not exist.
    #[error("sender not found: {0}")]
    SenderNotFound(Address),
    /// The sender cannot cover the amount.
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Sender's current balance.
        balance: Amount,
        /// Amount requested by the transfer.
        requested: Amount,
    },
    /// The cluster could not be queried.
    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Errors from [`TransactionSender::send_and_confirm`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendTransactionError {
    /// The transaction was rejected by the cluster.
    #[error("transaction rejected: {0}")]
    Rejected(String),
    /// The cluster could not be reached.
    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Expected properties of a confirmed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateTransferFields {
    /// Account that must have received the transfer.
    pub recipient: Address,
    /// Amount that must have been transferred; `None` accepts any amount.
    pub amount: Option<Amount>,
    /// Token mint that must have been transferred; `None` for native SOL.
    pub spl_token: Option<Address>,
    /// References that must be attached to the transaction.
    pub reference: Option<Vec<Address>>,
    /// Memo that must be attached to the transaction.
    pub memo: Option<String>,
}

impl From<&TransferRequest> for ValidateTransferFields {
    fn from(request: &TransferRequest) -> Self {
        Self {
            recipient: request.recipient(),
            amount: request.amount().cloned(),
            spl_token: request.spl_token(),
            reference: request.reference().map(<[Address]>::to_vec),
            memo: request.memo().map(str::to_owned),
        }
    }
}

/// Errors from [`TransferValidator::validate_transfer`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidateTransferError {
    /// No confirmed transaction has the signature.
    #[error("transaction not found: {0}")]
    NotFound(Signature),
    /// The transaction pays someone else.
    #[error("recipient not found: expected {expected}, got {actual}")]
    RecipientMismatch {
        /// Recipient asked for.
        expected: Address,
        /// Recipient found in the transaction.
        actual: Address,
    },
    /// The transaction moves a different amount.
    #[error("amount not transferred: expected {expected}, got {actual}")]
    AmountMismatch {
        /// Amount asked for.
        expected: Amount,
        /// Amount found in the transaction.
        actual: Amount,
    },
    /// The transaction moves a different asset.
    #[error("invalid token: expected {expected:?}, got {actual:?}")]
    TokenMismatch {
        /// Mint asked for.
        expected: Option<Address>,
        /// Mint found in the transaction.
        actual: Option<Address>,
    },
    /// A required reference is not attached.
    #[error("invalid reference")]
    ReferenceMissing,
    /// The memo differs.
    #[error("invalid memo")]
    MemoMismatch,
    /// The cluster could not be queried.
    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Finds transactions by the references attached to them.
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    /// Returns the most recent transaction carrying every address in `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`FindReferenceError::NotFound`] while no such transaction has
    /// reached `options.finality`, or [`FindReferenceError::Rpc`] if the
    /// cluster cannot be queried.
    async fn find_reference(
        &self,
        reference: &[Address],
        options: &FindReferenceOptions,
    ) -> Result<ConfirmedSignatureInfo, FindReferenceError>;
}

/// Builds unsigned transfers.
#[async_trait]
pub trait TransferBuilder: Send + Sync {
    /// Creates a transfer from `sender` for the given fields.
    ///
    /// # Errors
    ///
    /// Returns [`CreateTransferError`] if the sender is unknown or underfunded.
    async fn create_transfer(
        &self,
        sender: &Address,
        fields: CreateTransferFields,
    ) -> Result<Transfer, CreateTransferError>;
}

/// Submits signed transfers.
#[async_trait]
pub trait TransactionSender: Send + Sync {
    /// Sends the transfer and waits until the cluster accepts it.
    ///
    /// # Errors
    ///
    /// Returns [`SendTransactionError`] if the cluster rejects the transfer.
    async fn send_and_confirm(
        &self,
        transaction: SignedTransfer,
    ) -> Result<Signature, SendTransactionError>;
}

/// Validates confirmed transfers against expectations.
#[async_trait]
pub trait TransferValidator: Send + Sync {
    /// Checks that the transaction `signature` matches `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidateTransferError`] describing the first mismatch.
    async fn validate_transfer(
        &self,
        signature: &Signature,
        fields: &ValidateTransferFields,
    ) -> Result<Transfer, ValidateTransferError>;
}

#[async_trait]
impl<T: ReferenceLookup + ?Sized> ReferenceLookup for Arc<T> {
    async fn find_reference(
        &self,
        reference: &[Address],
        options: &FindReferenceOptions,
    ) -> Result<ConfirmedSignatureInfo, FindReferenceError> {
        (**self).find_reference(reference, options).await
    }
}

#[async_trait]
impl<T: TransferBuilder + ?Sized> TransferBuilder for Arc<T> {
    async fn create_transfer(
        &self,
        sender: &Address,
        fields: CreateTransferFields,
    ) -> Result<Transfer, CreateTransferError> {
        (**self).create_transfer(sender, fields).await
    }
}

#[async_trait]
impl<T: TransactionSender + ?Sized> TransactionSender for Arc<T> {
    async fn send_and_confirm(
        &self,
        transaction: SignedTransfer,
    ) -> Result<Signature, SendTransactionError> {
        (**self).send_and_confirm(transaction).await
    }
}

#[async_trait]
impl<T: TransferValidator + ?Sized> TransferValidator for Arc<T> {
    async fn validate_transfer(
        &self,
        signature: &Signature,
        fields: &ValidateTransferFields,
    ) -> Result<Transfer, ValidateTransferError> {
        (**self).validate_transfer(signature, fields).await
    }
}
