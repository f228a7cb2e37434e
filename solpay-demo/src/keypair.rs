//! Sender identity loaded from a local key file.
//!
//! The file holds a JSON array of 64 bytes: the 32-byte secret key followed
//! by the 32-byte public key, the layout written by `solana-keygen`. Only the
//! public half is interpreted here; the simulated cluster authorizes
//! transfers by signer address, not by cryptographic signature.

use std::fmt;
use std::path::{Path, PathBuf};

use solpay::Address;

/// Number of bytes in a key file.
pub const KEYPAIR_LENGTH: usize = 64;

/// Errors reading a key file.
#[derive(Debug, thiserror::Error)]
pub enum KeypairError {
    /// The file could not be read.
    #[error("Can not read key file {}: {source}", path.display())]
    Read {
        /// Path of the key file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not a JSON array of bytes.
    #[error("Key file {} is not a JSON byte array: {source}", path.display())]
    Format {
        /// Path of the key file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// The array has the wrong number of bytes.
    #[error("Key file must hold 64 bytes, found {0}")]
    Length(usize),
}

/// A sender identity: secret and public key halves.
#[derive(Clone, PartialEq, Eq)]
pub struct Keypair {
    secret: [u8; 32],
    public: Address,
}

impl Keypair {
    /// Builds a keypair from its 64-byte serialized form.
    ///
    /// # Errors
    ///
    /// Returns [`KeypairError::Length`] if `bytes` is not 64 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeypairError> {
        let (secret, public) = bytes
            .split_first_chunk::<32>()
            .filter(|(_, rest)| rest.len() == 32)
            .ok_or(KeypairError::Length(bytes.len()))?;
        let mut public_bytes = [0u8; 32];
        public_bytes.copy_from_slice(public);
        Ok(Self {
            secret: *secret,
            public: Address::new(public_bytes),
        })
    }

    /// The public address of this identity.
    #[must_use]
    pub const fn pubkey(&self) -> Address {
        self.public
    }

    /// The 64-byte serialized form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; KEYPAIR_LENGTH] {
        let mut bytes = [0u8; KEYPAIR_LENGTH];
        bytes[..32].copy_from_slice(&self.secret);
        bytes[32..].copy_from_slice(self.public.as_bytes());
        bytes
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.public)
            .finish_non_exhaustive()
    }
}

/// Reads a keypair from a JSON key file.
///
/// # Errors
///
/// Returns [`KeypairError`] if the file is missing, malformed, or has the
/// wrong length.
pub fn read_keypair_file(path: impl AsRef<Path>) -> Result<Keypair, KeypairError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| KeypairError::Read {
        path: path.to_owned(),
        source,
    })?;
    let bytes: Vec<u8> = serde_json::from_str(&content).map_err(|source| KeypairError::Format {
        path: path.to_owned(),
        source,
    })?;
    Keypair::from_bytes(&bytes)
}
