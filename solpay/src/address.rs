//! Fixed-size binary identifiers with a canonical base58 text form.
//!
//! - [`Address`] - A 32-byte account address (public key)
//! - [`Signature`] - A 64-byte transaction signature
//!
//! Both types parse only canonical base58 that decodes to exactly the
//! expected number of bytes. Anything else is rejected with
//! [`Base58DecodeError`]; inputs are never padded or truncated.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// Error returned when a string is not a canonical base58 encoding of the
/// expected length.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Base58DecodeError {
    /// The input contains characters outside the base58 alphabet.
    #[error("Invalid base58 string: {0}")]
    Alphabet(String),
    /// The input decodes to the wrong number of bytes.
    #[error("Expected {expected} bytes, decoded {actual}")]
    Length {
        /// Number of bytes the identifier requires.
        expected: usize,
        /// Number of bytes the input decoded to.
        actual: usize,
    },
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], Base58DecodeError> {
    let bytes = bs58::decode(s)
        .into_vec()
        .map_err(|e| Base58DecodeError::Alphabet(e.to_string()))?;
    let actual = bytes.len();
    <[u8; N]>::try_from(bytes).map_err(|_| Base58DecodeError::Length {
        expected: N,
        actual,
    })
}

macro_rules! base58_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Length of the binary form in bytes.
            pub const LEN: usize = $len;

            /// Wraps raw bytes.
            #[must_use]
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Returns the raw bytes.
            #[must_use]
            pub const fn to_bytes(&self) -> [u8; $len] {
                self.0
            }

            /// Returns the raw bytes as a slice.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&bs58::encode(self.0).into_string())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({self})", stringify!($name))
            }
        }

        impl FromStr for $name {
            type Err = Base58DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_fixed::<$len>(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::from_str(&s).map_err(de::Error::custom)
            }
        }
    };
}

base58_bytes!(
    /// A Solana account address: a 32-byte public key.
    ///
    /// Used for payment recipients, token mints and references. Equality is
    /// byte-wise.
    ///
    /// # Serialization
    ///
    /// Serializes to/from its base58 string:
    /// `"36vqn1tAJrWC6DcxZtKp7wpTqtP6jhr2DDJJbjs6AUUY"`
    Address,
    32
);

base58_bytes!(
    /// A 64-byte transaction signature, identifying a transaction on the ledger.
    Signature,
    64
);

#[cfg(test)]
mod tests {
    use super::*;

    const MERCHANT: &str = "36vqn1tAJrWC6DcxZtKp7wpTqtP6jhr2DDJJbjs6AUUY";

    #[test]
    fn test_address_roundtrip_text() {
        let address: Address = MERCHANT.parse().unwrap();
        assert_eq!(address.to_string(), MERCHANT);
    }

    #[test]
    fn test_address_all_zero_is_system_program() {
        let address = Address::new([0; 32]);
        assert_eq!(address.to_string(), "11111111111111111111111111111111");
        assert_eq!(
            "11111111111111111111111111111111".parse::<Address>().unwrap(),
            address
        );
    }

    #[test]
    fn test_address_rejects_invalid_alphabet() {
        let err = "0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl".parse::<Address>().unwrap_err();
        assert!(matches!(err, Base58DecodeError::Alphabet(_)));
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let err = "36vqn1tAJrWC6DcxZtKp7wpT".parse::<Address>().unwrap_err();
        assert!(matches!(
            err,
            Base58DecodeError::Length { expected: 32, .. }
        ));
    }

    #[test]
    fn test_address_rejects_empty() {
        let err = "".parse::<Address>().unwrap_err();
        assert_eq!(
            err,
            Base58DecodeError::Length {
                expected: 32,
                actual: 0
            }
        );
    }

    #[test]
    fn test_signature_is_not_an_address() {
        let signature = Signature::new([7; 64]);
        let text = signature.to_string();
        assert_eq!(text.parse::<Signature>().unwrap(), signature);
        assert!(text.parse::<Address>().is_err());
    }

    #[test]
    fn test_address_serde_as_string() {
        let address: Address = MERCHANT.parse().unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{MERCHANT}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }

    #[test]
    fn test_address_debug_shows_base58() {
        let address: Address = MERCHANT.parse().unwrap();
        assert_eq!(format!("{address:?}"), format!("Address({MERCHANT})"));
    }
}
