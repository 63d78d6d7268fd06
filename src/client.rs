//! Remote client capability
//!
//! The SDK never talks to an RPC endpoint directly. The embedding
//! application supplies a [`RemoteClient`] that performs read-only contract
//! calls and reports the chain head; everything else (transport, ABI
//! encoding, retries, timeouts) is the client's concern.

use crate::error::AddressError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 20-byte EVM address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Registries answer unknown names with the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| AddressError::InvalidHex(s.to_string()))?;
        let bytes = hex::decode(digits).map_err(|_| AddressError::InvalidHex(s.to_string()))?;
        let array: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength {
                expected: 20,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// Decoded contract call argument or return value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallValue {
    Address(Address),
    Uint(u128),
    Int(i128),
    Bool(bool),
    String(String),
    /// Fixed or dynamic byte string (`bytes21`, `bytes`)
    Bytes(Vec<u8>),
    /// Multiple return values or a struct
    Tuple(Vec<CallValue>),
}

impl CallValue {
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(addr) => Some(*addr),
            _ => None,
        }
    }

    /// Unsigned integer, accepting non-negative signed values
    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Self::Uint(v) => Some(*v),
            Self::Int(v) => u128::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Signed integer, accepting unsigned values that fit
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Uint(v) => i128::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[CallValue]> {
        match self {
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

/// Read-only access to a chain, supplied by the embedding application
#[async_trait::async_trait]
pub trait RemoteClient: Send + Sync {
    /// Execute a read-only contract call
    ///
    /// `signature` is the canonical function signature, e.g.
    /// `getContractAddressByName(string)`.
    async fn call(
        &self,
        contract: Address,
        signature: &str,
        args: &[CallValue],
    ) -> anyhow::Result<CallValue>;

    /// Current block height
    async fn block_number(&self) -> anyhow::Result<u64>;
}
