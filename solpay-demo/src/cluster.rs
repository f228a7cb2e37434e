//! An in-process stand-in for a Solana cluster.
//!
//! [`SimulatedCluster`] keeps balances and a ledger of sent transfers in
//! memory and implements every collaborator trait from [`solpay::ledger`].
//! A sent transfer only becomes visible to [`ReferenceLookup`] after
//! `confirmation_polls` lookups have missed it (one more for
//! [`Finality::Finalized`]), which exercises the watcher's retry path the way
//! a real confirmation delay would.

use std::collections::HashMap;

use async_trait::async_trait;
use solpay::ledger::{
    ConfirmedSignatureInfo, CreateTransferError, CreateTransferFields, FindReferenceError,
    FindReferenceOptions, Finality, ReferenceLookup, SendTransactionError, SignedTransfer,
    TransactionSender, Transfer, TransferBuilder, TransferValidator, ValidateTransferError,
    ValidateTransferFields,
};
use solpay::{Address, Amount, Signature};
use tokio::sync::RwLock;

use crate::config::DemoConfig;

/// Version reported by the simulated cluster.
pub const SIMULATED_VERSION: &str = "solana-core 2.1.0 (simulated)";

/// Balance key: owner and token mint (`None` for native SOL).
type BalanceKey = (Address, Option<Address>);

#[derive(Debug, Clone)]
struct LedgerEntry {
    signature: Signature,
    slot: u64,
    transfer: Transfer,
    lookups: u32,
}

#[derive(Debug, Default)]
struct LedgerState {
    slot: u64,
    balances: HashMap<BalanceKey, Amount>,
    entries: Vec<LedgerEntry>,
}

/// A simulated cluster holding balances and confirmed transfers.
#[derive(Debug)]
pub struct SimulatedCluster {
    label: String,
    version: String,
    confirmation_polls: u32,
    state: RwLock<LedgerState>,
}

impl SimulatedCluster {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new(label: impl Into<String>, confirmation_polls: u32) -> Self {
        Self {
            label: label.into(),
            version: SIMULATED_VERSION.to_owned(),
            confirmation_polls,
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Establishes the connection described by `config`.
    #[must_use]
    pub fn connect(config: &DemoConfig) -> Self {
        let cluster = Self::new(&config.cluster, config.confirmation_polls);
        tracing::info!(
            cluster = %cluster.label,
            version = %cluster.version,
            commitment = ?config.finality,
            "Connection to cluster established"
        );
        cluster
    }

    /// Credits `amount` of native SOL to `owner`, creating the account if needed.
    pub async fn airdrop(&self, owner: Address, amount: Amount) {
        tracing::info!(%owner, %amount, "Airdrop received");
        self.credit((owner, None), amount).await;
    }

    /// Credits `amount` of `mint` tokens to `owner`.
    pub async fn mint_to(&self, owner: Address, mint: Address, amount: Amount) {
        tracing::info!(%owner, %mint, %amount, "Tokens minted");
        self.credit((owner, Some(mint)), amount).await;
    }

    /// Current balance of `owner` in `mint` (`None` for SOL), if the account exists.
    pub async fn balance(&self, owner: &Address, mint: Option<Address>) -> Option<Amount> {
        self.state.read().await.balances.get(&(*owner, mint)).cloned()
    }

    async fn credit(&self, key: BalanceKey, amount: Amount) {
        let mut state = self.state.write().await;
        let balance = state.balances.entry(key).or_default();
        *balance = std::mem::take(balance) + amount;
    }

    const fn lookups_until_visible(&self, finality: Finality) -> u32 {
        match finality {
            Finality::Confirmed => self.confirmation_polls,
            Finality::Finalized => self.confirmation_polls.saturating_add(1),
        }
    }
}

#[async_trait]
impl ReferenceLookup for SimulatedCluster {
    async fn find_reference(
        &self,
        reference: &[Address],
        options: &FindReferenceOptions,
    ) -> Result<ConfirmedSignatureInfo, FindReferenceError> {
        let threshold = self.lookups_until_visible(options.finality);
        let mut state = self.state.write().await;
        let entry = state
            .entries
            .iter_mut()
            .rev()
            .find(|entry| entry.transfer.has_references(reference))
            .ok_or(FindReferenceError::NotFound)?;

        entry.lookups = entry.lookups.saturating_add(1);
        if entry.lookups <= threshold {
            return Err(FindReferenceError::NotFound);
        }
        Ok(ConfirmedSignatureInfo {
            signature: entry.signature,
            slot: entry.slot,
            memo: entry.transfer.memo.clone(),
        })
    }
}

#[async_trait]
impl TransferBuilder for SimulatedCluster {
    async fn create_transfer(
        &self,
        sender: &Address,
        fields: CreateTransferFields,
    ) -> Result<Transfer, CreateTransferError> {
        let balance = self
            .balance(sender, fields.spl_token)
            .await
            .ok_or(CreateTransferError::SenderNotFound(*sender))?;
        if balance < fields.amount {
            return Err(CreateTransferError::InsufficientFunds {
                balance,
                requested: fields.amount.clone(),
            });
        }
        Ok(Transfer::new(*sender, fields))
    }
}

#[async_trait]
impl TransactionSender for SimulatedCluster {
    async fn send_and_confirm(
        &self,
        transaction: SignedTransfer,
    ) -> Result<Signature, SendTransactionError> {
        let SignedTransfer { transfer, signer } = transaction;
        if signer != transfer.sender {
            return Err(SendTransactionError::Rejected(format!(
                "missing signature for {}",
                transfer.sender
            )));
        }

        let mut state = self.state.write().await;
        let sender_key = (transfer.sender, transfer.spl_token);
        let remaining = state
            .balances
            .get(&sender_key)
            .and_then(|balance| balance.checked_sub(&transfer.amount))
            .ok_or_else(|| SendTransactionError::Rejected("insufficient funds".to_owned()))?;
        state.balances.insert(sender_key, remaining);
        let credited = state
            .balances
            .entry((transfer.recipient, transfer.spl_token))
            .or_default();
        *credited = std::mem::take(credited) + transfer.amount.clone();

        state.slot += 1;
        let slot = state.slot;
        let signature = random_signature();
        tracing::debug!(%signature, slot, amount = %transfer.amount, "Transfer processed");
        state.entries.push(LedgerEntry {
            signature,
            slot,
            transfer,
            lookups: 0,
        });
        Ok(signature)
    }
}

#[async_trait]
impl TransferValidator for SimulatedCluster {
    async fn validate_transfer(
        &self,
        signature: &Signature,
        fields: &ValidateTransferFields,
    ) -> Result<Transfer, ValidateTransferError> {
        let state = self.state.read().await;
        let transfer = state
            .entries
            .iter()
            .find(|entry| entry.signature == *signature)
            .map(|entry| &entry.transfer)
            .ok_or(ValidateTransferError::NotFound(*signature))?;

        if transfer.recipient != fields.recipient {
            return Err(ValidateTransferError::RecipientMismatch {
                expected: fields.recipient,
                actual: transfer.recipient,
            });
        }
        if transfer.spl_token != fields.spl_token {
            return Err(ValidateTransferError::TokenMismatch {
                expected: fields.spl_token,
                actual: transfer.spl_token,
            });
        }
        if let Some(expected) = fields
            .amount
            .as_ref()
            .filter(|expected| **expected != transfer.amount)
        {
            return Err(ValidateTransferError::AmountMismatch {
                expected: expected.clone(),
                actual: transfer.amount.clone(),
            });
        }
        if !transfer.has_references(fields.reference.as_deref().unwrap_or_default()) {
            return Err(ValidateTransferError::ReferenceMissing);
        }
        if fields.memo.is_some() && transfer.memo != fields.memo {
            return Err(ValidateTransferError::MemoMismatch);
        }
        Ok(transfer.clone())
    }
}

fn random_signature() -> Signature {
    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(&rand::random::<[u8; 32]>());
    bytes[32..].copy_from_slice(&rand::random::<[u8; 32]>());
    Signature::new(bytes)
}
