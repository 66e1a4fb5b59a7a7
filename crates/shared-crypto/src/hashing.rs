//! # BLAKE3 Hashing
//!
//! Identifier derivation for push keys and namespaces.

/// BLAKE3 hash output (256-bit).
pub type Hash = [u8; 32];

/// Length of a push key identifier.
pub const PUSH_KEY_ID_LEN: usize = 20;

/// Hash data with BLAKE3.
pub fn blake3_hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Derive the 20-byte push key ID of an Ed25519 public key.
pub fn push_key_id(public_key: &[u8]) -> [u8; PUSH_KEY_ID_LEN] {
    let digest = blake3_hash(public_key);
    let mut id = [0u8; PUSH_KEY_ID_LEN];
    id.copy_from_slice(&digest[..PUSH_KEY_ID_LEN]);
    id
}

/// Hex hash under which a namespace name is registered.
pub fn hash_namespace(name: &str) -> String {
    hex::encode(blake3_hash(name.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_key_id_is_hash_prefix() {
        let pk = [5u8; 32];
        let id = push_key_id(&pk);
        assert_eq!(&id[..], &blake3_hash(&pk)[..20]);
        assert_ne!(id, push_key_id(&[6u8; 32]));
    }

    #[test]
    fn test_hash_namespace() {
        let h = hash_namespace("ns1");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_namespace("ns1"));
        assert_ne!(h, hash_namespace("ns2"));
    }
}
