use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use wincode::{SchemaRead, SchemaWrite};

/// A 20-byte ledger address. Users, sessions, registries and the directory
/// all live in the same address space.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    SchemaRead,
    SchemaWrite,
    Serialize,
    Deserialize,
)]
pub struct Address(#[serde(with = "hex::serde")] pub [u8; 20]);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must be 40 hex characters, got {0}")]
    InvalidLength(usize),
    #[error("address is not valid hex: {0}")]
    InvalidHex(String),
}

impl Address {
    pub const LEN: usize = 20;
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Deterministically derives an address from a domain tag and seed parts.
    /// Formula: SHA256( domain || 0x00 || part_0 || ... || part_n )[..20]
    pub fn derive(domain: &str, parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain.as_bytes());
        hasher.update([0u8]);
        for part in parts {
            hasher.update(part);
        }
        let digest = hasher.finalize();
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[..20]);
        Address(out)
    }

    /// Address of a human-readable account label (CLI users, test actors).
    pub fn from_label(label: &str) -> Self {
        Self::derive("chronoshare/account", &[label.as_bytes()])
    }

    /// Address of a component deployed by `deployer` under `kind` with the given nonce.
    pub fn contract(deployer: &Address, kind: &str, nonce: u64) -> Self {
        Self::derive(
            "chronoshare/contract",
            &[deployer.as_ref(), kind.as_bytes(), &nonce.to_be_bytes()],
        )
    }

    /// Short form for logs: first and last two bytes.
    pub fn short(&self) -> String {
        format!(
            "0x{}..{}",
            hex::encode(&self.0[..2]),
            hex::encode(&self.0[18..])
        )
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
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

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        if stripped.len() != 40 {
            return Err(AddressError::InvalidLength(stripped.len()));
        }
        let mut out = [0u8; 20];
        hex::decode_to_slice(stripped, &mut out)
            .map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Ok(Address(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_derivation_is_deterministic() {
        assert_eq!(Address::from_label("alice"), Address::from_label("alice"));
        assert_ne!(Address::from_label("alice"), Address::from_label("bob"));
    }

    #[test]
    fn contract_addresses_depend_on_kind_and_nonce() {
        let deployer = Address::from_label("directory");
        let s1 = Address::contract(&deployer, "session", 1);
        let r1 = Address::contract(&deployer, "registry", 1);
        let s2 = Address::contract(&deployer, "session", 2);
        assert_ne!(s1, r1);
        assert_ne!(s1, s2);
    }

    #[test]
    fn display_parses_back() {
        let addr = Address::from_label("carol");
        let text = addr.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("0x1234".parse::<Address>(), Err(AddressError::InvalidLength(4)));
        let bad = format!("0x{}", "zz".repeat(20));
        assert!(matches!(bad.parse::<Address>(), Err(AddressError::InvalidHex(_))));
    }

    #[test]
    fn json_uses_hex_strings() {
        let addr = Address([0xab; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(20)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
