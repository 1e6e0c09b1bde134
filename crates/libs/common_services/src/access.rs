//! Recovery codes for albums: minted once, stored only as a keyed hash.

use thiserror::Error;

/// Excludes visually ambiguous characters (I, L, O, 0, 1).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_GROUPS: usize = 3;
const CODE_GROUP_LEN: usize = 4;

const KEY_CONTEXT: &str = "face_albums recovery code v1";

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("access code salt is not configured")]
    SaltMissing,
}

/// A freshly minted recovery code. The plaintext is returned exactly once
/// and never persisted.
#[derive(Debug, Clone)]
pub struct MintedCode {
    pub plaintext: String,
    pub hash: String,
    pub hint: String,
}

/// Mints and verifies recovery codes with a key derived from the
/// process-wide salt.
#[derive(Debug, Clone)]
pub struct AccessCodes {
    key: Option<[u8; 32]>,
}

impl AccessCodes {
    #[must_use]
    pub fn new(salt: Option<&str>) -> Self {
        Self {
            key: salt.map(|salt| blake3::derive_key(KEY_CONTEXT, salt.as_bytes())),
        }
    }

    /// Whether a salt is configured and new albums get recovery codes.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Generates a human-readable code like `XXXX-XXXX-XXXX`. The stored
    /// hint is the trailing group.
    pub fn mint(&self) -> Result<MintedCode, AccessError> {
        let groups: Vec<String> = (0..CODE_GROUPS)
            .map(|_| {
                (0..CODE_GROUP_LEN)
                    .map(|_| {
                        let idx = rand::random_range(0..CODE_ALPHABET.len());
                        CODE_ALPHABET[idx] as char
                    })
                    .collect()
            })
            .collect();
        let plaintext = groups.join("-");
        let hash = self.hash(&normalize(&plaintext))?;
        let hint = groups[CODE_GROUPS - 1].clone();
        Ok(MintedCode {
            plaintext,
            hash,
            hint,
        })
    }

    /// Verifies a user-provided code against a stored hash. The provided
    /// code is normalized first, so separators and casing don't matter.
    pub fn verify(&self, provided: &str, stored_hash: &str) -> Result<bool, AccessError> {
        let hash = self.hash(&normalize(provided))?;
        Ok(hash == stored_hash)
    }

    fn hash(&self, normalized: &str) -> Result<String, AccessError> {
        let key = self.key.as_ref().ok_or(AccessError::SaltMissing)?;
        Ok(blake3::keyed_hash(key, normalized.as_bytes())
            .to_hex()
            .to_string())
    }
}

/// Uppercases and strips everything that isn't alphanumeric.
fn normalize(code: &str) -> String {
    code.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_code_is_grouped_and_confusable_free() {
        let codes = AccessCodes::new(Some("test-salt"));
        let minted = codes.mint().expect("salt configured");
        let groups: Vec<&str> = minted.plaintext.split('-').collect();
        assert_eq!(groups.len(), CODE_GROUPS);
        for group in &groups {
            assert_eq!(group.len(), CODE_GROUP_LEN);
            assert!(group.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
        assert_eq!(minted.hint, *groups.last().unwrap());
    }

    #[test]
    fn verify_ignores_case_and_separators() {
        let codes = AccessCodes::new(Some("test-salt"));
        let minted = codes.mint().unwrap();
        let sloppy = minted.plaintext.to_lowercase().replace('-', " ");
        assert!(codes.verify(&sloppy, &minted.hash).unwrap());
        assert!(!codes.verify("AAAA-BBBB-CCCC", &minted.hash).unwrap());
    }

    #[test]
    fn different_salts_produce_different_hashes() {
        let a = AccessCodes::new(Some("salt-a"));
        let b = AccessCodes::new(Some("salt-b"));
        let minted = a.mint().unwrap();
        assert!(!b.verify(&minted.plaintext, &minted.hash).unwrap());
    }

    #[test]
    fn missing_salt_fails_deterministically() {
        let codes = AccessCodes::new(None);
        assert!(!codes.is_enabled());
        assert!(matches!(codes.mint(), Err(AccessError::SaltMissing)));
        assert!(matches!(
            codes.verify("AAAA", "deadbeef"),
            Err(AccessError::SaltMissing)
        ));
    }
}
