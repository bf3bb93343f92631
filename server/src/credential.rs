//! Credential verification. The session layer only ever sees this trait:
//! the stored hash is an opaque string, the verifier says whether a password
//! matches and whether the hash is in a legacy format that should be
//! upgraded on the spot.

use rand::RngCore;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub matched: bool,
    /// True when the password matched against an outdated hash format; the
    /// caller is expected to rehash and persist before signaling success.
    pub needs_upgrade: bool,
}

pub trait CredentialVerifier {
    fn verify(&self, stored_hash: &str, password: &str) -> Verification;
    fn hash(&self, password: &str) -> String;
}

/// Salted SHA-256 verifier. Modern hashes look like
/// `sha256$<salt-hex>$<digest-hex>`; a bare 64-char hex digest is the
/// unsalted legacy format and matches with `needs_upgrade` set.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Verifier;

const MODERN_PREFIX: &str = "sha256$";

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn digest_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex_encode(&hasher.finalize())
}

impl CredentialVerifier for Sha256Verifier {
    fn verify(&self, stored_hash: &str, password: &str) -> Verification {
        if password.is_empty() || stored_hash.is_empty() {
            return Verification { matched: false, needs_upgrade: false };
        }

        if let Some(rest) = stored_hash.strip_prefix(MODERN_PREFIX) {
            let mut pieces = rest.splitn(2, '$');
            let salt = pieces.next().unwrap_or_default();
            let digest = pieces.next().unwrap_or_default();
            let matched = !digest.is_empty()
                && digest_hex(&[salt.as_bytes(), password.as_bytes()]) == digest;
            return Verification { matched, needs_upgrade: false };
        }

        // Legacy: unsalted hex digest of the bare password.
        let matched = stored_hash.len() == 64
            && digest_hex(&[password.as_bytes()]) == stored_hash.to_ascii_lowercase();
        Verification { matched, needs_upgrade: matched }
    }

    fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt_hex = hex_encode(&salt);
        let digest = digest_hex(&[salt_hex.as_bytes(), password.as_bytes()]);
        format!("{MODERN_PREFIX}{salt_hex}${digest}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modern_hash_round_trips() {
        let v = Sha256Verifier;
        let hash = v.hash("pass12");
        let check = v.verify(&hash, "pass12");
        assert!(check.matched);
        assert!(!check.needs_upgrade);
    }

    #[test]
    fn wrong_password_fails() {
        let v = Sha256Verifier;
        let hash = v.hash("pass12");
        assert!(!v.verify(&hash, "pass13").matched);
        assert!(!v.verify(&hash, "").matched);
    }

    #[test]
    fn two_hashes_of_same_password_differ() {
        let v = Sha256Verifier;
        assert_ne!(v.hash("pass12"), v.hash("pass12"));
    }

    #[test]
    fn legacy_hash_matches_and_flags_upgrade() {
        let v = Sha256Verifier;
        let legacy = digest_hex(&[b"pass12"]);
        let check = v.verify(&legacy, "pass12");
        assert!(check.matched);
        assert!(check.needs_upgrade);

        let bad = v.verify(&legacy, "nope");
        assert!(!bad.matched);
        assert!(!bad.needs_upgrade);
    }
}
