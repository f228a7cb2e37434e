//! Simulated Solana Pay payment flow.
//!
//! Plays both sides of a Solana Pay checkout against an in-process cluster:
//! the merchant creates a `solana:` payment link, a simulated wallet pays it,
//! and the merchant finds the transaction by its reference and validates it.
//!
//! # Modules
//!
//! - [`config`] - Demo configuration with environment variable expansion
//! - [`keypair`] - Loading the paying identity from a key file
//! - [`cluster`] - In-process cluster implementing the ledger traits
//! - [`checkout`] - Merchant checkout producing a payment link
//! - [`wallet`] - Customer wallet paying a payment link
//! - [`flow`] - The end-to-end flow
//! - [`shutdown`] - Cancelling the flow on SIGINT/SIGTERM
//! - [`error`] - Demo error type

pub mod checkout;
pub mod cluster;
pub mod config;
pub mod error;
pub mod flow;
pub mod keypair;
pub mod shutdown;
pub mod wallet;

pub use config::DemoConfig;
pub use error::DemoError;
