#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for Solana Pay transfer requests.
//!
//! A transfer request is a payment intent encoded as a `solana:` URI. A
//! merchant encodes the request, a wallet parses it and submits a transfer
//! tagged with the request's references, and the merchant then watches the
//! ledger for that transfer and validates it.
//!
//! # Modules
//!
//! - [`address`] - Base58 account addresses and transaction signatures
//! - [`amount`] - Exact, non-negative decimal amounts
//! - [`request`] - The [`TransferRequest`] record and its builder
//! - [`uri`] - Encoding and strict parsing of `solana:` URIs
//! - [`ledger`] - Collaborator traits for lookup, building, sending and validation
//! - [`watcher`] - Polling state machine that waits for and validates a payment
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for the payment watcher
//!
//! # Example
//!
//! ```rust
//! use solpay::{Address, TransferRequest};
//!
//! let recipient: Address = "36vqn1tAJrWC6DcxZtKp7wpTqtP6jhr2DDJJbjs6AUUY".parse().unwrap();
//! let request = TransferRequest::builder(recipient)
//!     .amount("0.05".parse().unwrap())
//!     .label("SOL Transfer")
//!     .build();
//!
//! let url = solpay::uri::encode_url(&request);
//! assert_eq!(
//!     url.as_str(),
//!     "solana:36vqn1tAJrWC6DcxZtKp7wpTqtP6jhr2DDJJbjs6AUUY?amount=0.05&label=SOL+Transfer"
//! );
//! assert_eq!(solpay::uri::parse_url(url.as_str()).unwrap(), request);
//! ```

pub mod address;
pub mod amount;
pub mod ledger;
pub mod request;
pub mod uri;
pub mod watcher;

pub use address::{Address, Signature};
pub use amount::Amount;
pub use request::TransferRequest;
pub use uri::ParseUrlError;
pub use watcher::{PaymentStatus, PaymentWatcher, WatchConfig, WatchError};
