//! Error type for the demo flow.

use solpay::ParseUrlError;
use solpay::WatchError;
use solpay::ledger::{CreateTransferError, SendTransactionError, TransferSignError};

use crate::config::ConfigError;
use crate::keypair::KeypairError;

/// Any failure that ends the demo.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The paying identity could not be loaded.
    #[error(transparent)]
    Keypair(#[from] KeypairError),
    /// Neither the command line nor the configuration names a merchant.
    #[error("No merchant address: pass one on the command line or set `merchant` in the config")]
    MissingRecipient,
    /// The wallet could not parse the payment link.
    #[error("Invalid payment link: {0}")]
    Url(#[from] ParseUrlError),
    /// The wallet could not build the transfer.
    #[error("Can not create transfer: {0}")]
    CreateTransfer(#[from] CreateTransferError),
    /// The wallet signed with the wrong identity.
    #[error(transparent)]
    Sign(#[from] TransferSignError),
    /// The cluster did not accept the transfer.
    #[error("Can not send transfer: {0}")]
    Send(#[from] SendTransactionError),
    /// The payment was not found or did not validate.
    #[error(transparent)]
    Watch(#[from] WatchError),
}
