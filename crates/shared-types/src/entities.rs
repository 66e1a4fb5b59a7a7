//! # Push Entities
//!
//! A push arrives as a [`PushNote`]: one or more [`PushedReference`] changes
//! signed by the relaying node. Each reference also carries the pusher's
//! signature over its derived [`TxDetail`]. Hosts vote on notes with a
//! [`PushEndorsement`].

use crate::errors::PushKeyIdError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// A 32-byte digest.
pub type Hash = [u8; 32];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// A 20-byte account address.
pub type Address = [u8; 20];

/// Hex length of a git object hash.
pub const GIT_HASH_LEN: usize = 40;

/// Old-hash sentinel for a reference that does not exist yet.
pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000";

/// Returns true when `hash` is the all-zero object hash.
pub fn is_zero_hash(hash: &str) -> bool {
    !hash.is_empty() && hash.bytes().all(|b| b == b'0')
}

// =============================================================================
// PUSH KEY IDENTIFIER
// =============================================================================

/// Identifier of a registered push key (20 bytes).
///
/// String form is `pk` followed by 40 lowercase hex characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PushKeyId(pub [u8; 20]);

impl PushKeyId {
    pub const PREFIX: &'static str = "pk";

    /// Build from a byte slice, `None` unless exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for PushKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, hex::encode(self.0))
    }
}

impl FromStr for PushKeyId {
    type Err = PushKeyIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(Self::PREFIX)
            .ok_or(PushKeyIdError::MissingPrefix)?;
        if body.len() != 40 || body.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(PushKeyIdError::InvalidBody);
        }
        let bytes = hex::decode(body).map_err(|_| PushKeyIdError::InvalidBody)?;
        Self::from_slice(&bytes).ok_or(PushKeyIdError::InvalidBody)
    }
}

// =============================================================================
// PUSH NOTE
// =============================================================================

/// One reference update inside a push note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushedReference {
    /// Full reference name, e.g. `refs/heads/master`.
    pub name: String,
    /// Hash before the push; [`ZERO_HASH`] for a new reference.
    pub old_hash: String,
    /// Hash after the push.
    pub new_hash: String,
    /// Must equal the on-chain reference nonce + 1.
    pub nonce: u64,
    /// Decimal fee string.
    pub fee: String,
    /// Decimal value; only meaningful for merge-request references.
    pub value: Option<String>,
    /// Numeric merge proposal ID (at most 8 digits).
    pub merge_proposal_id: Option<String>,
    /// Pusher's signature over this reference's [`TxDetail`].
    pub push_sig: Vec<u8>,
    /// Git objects introduced by this reference update.
    pub objects: Vec<String>,
}

impl PushedReference {
    /// True when the reference does not exist before this push.
    pub fn is_new(&self) -> bool {
        is_zero_hash(&self.old_hash)
    }
}

/// A pending push transaction relayed by a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNote {
    /// Target repository name.
    pub repo_name: String,
    /// Namespace the repository was addressed through.
    pub namespace: Option<String>,
    /// Changed references, in push order.
    pub references: Vec<PushedReference>,
    /// Raw 20-byte push key ID of the pusher.
    pub pusher_key_id: Vec<u8>,
    /// Address the push key is expected to belong to.
    pub pusher_address: Address,
    /// Pusher's next account nonce.
    pub pusher_account_nonce: u64,
    /// Unix time (seconds) the note was created.
    pub timestamp: u64,
    /// Ed25519 public key of the relaying node.
    pub node_pub_key: Vec<u8>,
    /// Node signature over [`PushNote::bytes_no_sig`].
    pub node_sig: Vec<u8>,
    /// Total size in bytes of all pushed objects.
    pub size: u64,
}

#[derive(Serialize)]
struct PushNoteNoSig<'a> {
    repo_name: &'a str,
    namespace: &'a Option<String>,
    references: &'a [PushedReference],
    pusher_key_id: &'a [u8],
    pusher_address: &'a Address,
    pusher_account_nonce: u64,
    timestamp: u64,
    node_pub_key: &'a [u8],
    size: u64,
}

impl PushNote {
    /// Canonical bytes covered by the node signature.
    pub fn bytes_no_sig(&self) -> Vec<u8> {
        bincode::serialize(&PushNoteNoSig {
            repo_name: &self.repo_name,
            namespace: &self.namespace,
            references: &self.references,
            pusher_key_id: &self.pusher_key_id,
            pusher_address: &self.pusher_address,
            pusher_account_nonce: self.pusher_account_nonce,
            timestamp: self.timestamp,
            node_pub_key: &self.node_pub_key,
            size: self.size,
        })
        .unwrap_or_default()
    }

    /// Canonical bytes of the whole note, signature included.
    pub fn bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }

    /// Note identifier (SHA-256 of the signed note).
    pub fn id(&self) -> Hash {
        Sha256::digest(self.bytes()).into()
    }

    /// The pusher key ID, if well-formed.
    pub fn pusher_key(&self) -> Option<PushKeyId> {
        PushKeyId::from_slice(&self.pusher_key_id)
    }

    /// String form of the pusher key ID (hex fallback when malformed).
    pub fn pusher_key_id_string(&self) -> String {
        match self.pusher_key() {
            Some(id) => id.to_string(),
            None => hex::encode(&self.pusher_key_id),
        }
    }

    /// All object hashes introduced by the note.
    pub fn pushed_objects(&self) -> impl Iterator<Item = &str> {
        self.references
            .iter()
            .flat_map(|r| r.objects.iter().map(String::as_str))
    }
}

// =============================================================================
// TRANSACTION DETAIL
// =============================================================================

/// Signed per-reference metadata.
///
/// Derived from a note's reference (or supplied directly with a single-ref
/// push); its signature is the reference's `push_sig`, base58 encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxDetail {
    pub repo_name: String,
    pub repo_namespace: Option<String>,
    pub reference: String,
    pub fee: String,
    pub value: Option<String>,
    pub nonce: u64,
    /// String form of the push key ID (`pk…`).
    pub push_key_id: String,
    /// Base58-encoded signature over [`TxDetail::bytes_no_sig`].
    pub signature: String,
    pub merge_proposal_id: Option<String>,
    /// Object hash the pusher asserts the reference points at.
    pub head: Option<String>,
}

#[derive(Serialize)]
struct TxDetailNoSig<'a> {
    repo_name: &'a str,
    repo_namespace: &'a Option<String>,
    reference: &'a str,
    fee: &'a str,
    value: &'a Option<String>,
    nonce: u64,
    push_key_id: &'a str,
    merge_proposal_id: &'a Option<String>,
    head: &'a Option<String>,
}

impl TxDetail {
    /// Canonical bytes covered by the push signature.
    pub fn bytes_no_sig(&self) -> Vec<u8> {
        bincode::serialize(&TxDetailNoSig {
            repo_name: &self.repo_name,
            repo_namespace: &self.repo_namespace,
            reference: &self.reference,
            fee: &self.fee,
            value: &self.value,
            nonce: self.nonce,
            push_key_id: &self.push_key_id,
            merge_proposal_id: &self.merge_proposal_id,
            head: &self.head,
        })
        .unwrap_or_default()
    }
}

// =============================================================================
// ENDORSEMENT
// =============================================================================

/// A reference state a host vouches for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsedReference {
    /// Current on-chain hash of the reference as seen by the endorser.
    pub hash: Vec<u8>,
}

/// A host's vote on a push note.
///
/// Standalone endorsements carry the note ID and BLS signature; endorsements
/// embedded in a note omit both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEndorsement {
    pub note_id: Option<Hash>,
    pub endorser_pub_key: Option<PublicKey>,
    pub sig_bls: Option<Vec<u8>>,
    pub references: Vec<EndorsedReference>,
}

#[derive(Serialize)]
struct EndorsementNoSig<'a> {
    note_id: &'a Option<Hash>,
    endorser_pub_key: &'a Option<PublicKey>,
    references: &'a [EndorsedReference],
}

impl PushEndorsement {
    /// Canonical bytes covered by the BLS signature.
    pub fn bytes_for_bls_sig(&self) -> Vec<u8> {
        bincode::serialize(&EndorsementNoSig {
            note_id: &self.note_id,
            endorser_pub_key: &self.endorser_pub_key,
            references: &self.references,
        })
        .unwrap_or_default()
    }
}
