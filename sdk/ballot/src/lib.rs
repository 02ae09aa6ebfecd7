//! Chronoshare ballot payloads
//!
//! The ledger stores these blobs verbatim. Encryption, share generation and
//! reconstruction happen off-ledger; nothing here interprets the bytes.
//!
//! ```text
//! voter ──VoteSubmission──▶ session.votes[i] = EncryptedVote
//! holder ──(i, share_index, bytes)──▶ session.shares[j] = DecryptionShare
//! ```

use chronoshare_address::Address;
use serde::{Deserialize, Serialize};

/// Caller-supplied vote payload, before the ledger attaches the voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSubmission {
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
    /// Compressed G1 point `g1^r`
    #[serde(with = "hex::serde")]
    pub g1r: Vec<u8>,
    /// Compressed G2 point `g2^r`
    #[serde(with = "hex::serde")]
    pub g2r: Vec<u8>,
    /// Hex-encoded scalars, one per holder
    pub alpha: Vec<String>,
    pub threshold: u32,
}

impl VoteSubmission {
    pub fn into_vote(self, voter: Address) -> EncryptedVote {
        EncryptedVote {
            ciphertext: self.ciphertext,
            g1r: self.g1r,
            g2r: self.g2r,
            alpha: self.alpha,
            threshold: self.threshold,
            voter,
        }
    }
}

/// A cast vote as recorded in the session's append-only vote log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedVote {
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub g1r: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub g2r: Vec<u8>,
    pub alpha: Vec<String>,
    pub threshold: u32,
    pub voter: Address,
}

/// A holder's decryption share for one vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionShare {
    pub vote_index: u64,
    pub holder: Address,
    pub share_index: u32,
    #[serde(with = "hex::serde")]
    pub share: Vec<u8>,
}

/// Decryption value published by a holder after its shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionValue {
    pub holder: Address,
    pub value_hex: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_vote_attaches_voter() {
        let voter = Address::from_label("voter");
        let vote = VoteSubmission {
            ciphertext: vec![1, 2, 3],
            g1r: vec![4],
            g2r: vec![5],
            alpha: vec!["0a".into(), "0b".into()],
            threshold: 2,
        }
        .into_vote(voter);

        assert_eq!(vote.voter, voter);
        assert_eq!(vote.ciphertext, vec![1, 2, 3]);
        assert_eq!(vote.alpha.len(), 2);
    }

    #[test]
    fn byte_fields_serialize_as_hex() {
        let share = DecryptionShare {
            vote_index: 0,
            holder: Address([1u8; 20]),
            share_index: 1,
            share: vec![0xde, 0xad],
        };
        let json = serde_json::to_value(&share).unwrap();
        assert_eq!(json["share"], "dead");

        let back: DecryptionShare = serde_json::from_value(json).unwrap();
        assert_eq!(back, share);
    }
}
