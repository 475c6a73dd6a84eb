//! # Digests
//!
//! SHA-256 over a sequence of fields, used by the case timeline hash chain.
//!
//! Fields are length-prefixed before hashing so that `("ab", "c")` and
//! `("a", "bc")` never collide.

use sha2::{Digest, Sha256};

/// Digest of 64 zeros used as the predecessor of the first entry in a chain.
pub const GENESIS_DIGEST: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Compute the lowercase hex SHA-256 of the given fields.
pub fn sha256_hex<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut hasher = Sha256::new();
    for field in fields {
        let bytes = field.as_ref();
        hasher.update((bytes.len() as u64).to_be_bytes());
        hasher.update(bytes);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_64_hex_chars() {
        let d = sha256_hex(["a", "b"]);
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(sha256_hex(["x", "y"]), sha256_hex(["x", "y"]));
    }

    #[test]
    fn field_boundaries_are_significant() {
        assert_ne!(sha256_hex(["ab", "c"]), sha256_hex(["a", "bc"]));
    }

    #[test]
    fn genesis_is_not_a_real_digest() {
        assert_ne!(sha256_hex(Vec::<&str>::new()), GENESIS_DIGEST);
    }
}
