//! Identifier and hash syntax rules.

use lazy_static::lazy_static;
use regex::Regex;
use shared_types::{PushKeyId, GIT_HASH_LEN};

lazy_static! {
    static ref NAME_RE: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").expect("static regex");
    static ref DIGITS_RE: Regex = Regex::new(r"^[0-9]+$").expect("static regex");
}

pub const MIN_NAME_LEN: usize = 3;
pub const MAX_NAME_LEN: usize = 128;

/// Repository, namespace and label names: 3-128 chars of `[a-zA-Z0-9_-]`.
pub fn is_valid_name(name: &str) -> bool {
    (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&name.len()) && NAME_RE.is_match(name)
}

/// Non-empty ASCII digits only.
pub fn is_digits(value: &str) -> bool {
    DIGITS_RE.is_match(value)
}

/// A full 40-character hex object hash.
pub fn is_valid_hash(hash: &str) -> bool {
    hash.len() == GIT_HASH_LEN && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

/// A push key ID in its `pk…` string form.
pub fn is_valid_push_key_id(id: &str) -> bool {
    id.parse::<PushKeyId>().is_ok()
}
