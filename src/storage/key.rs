//! Storage key generation

use super::StorageError;
use crate::media::Orientation;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::TryRngCore;
use std::fmt;

/// Random bytes per token (256 bits)
pub const TOKEN_BYTES: usize = 32;

/// Draw [`TOKEN_BYTES`] from the OS RNG and encode them URL-safe, unpadded
pub fn random_token() -> Result<String, StorageError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| StorageError::EntropyUnavailable(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Object key of the form `<orientation>/<token>.mp4`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    orientation: Orientation,
    token: String,
}

impl StorageKey {
    /// Generate a fresh key under the orientation's prefix
    pub fn generate(orientation: Orientation) -> Result<Self, StorageError> {
        Ok(Self {
            orientation,
            token: random_token()?,
        })
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.mp4", self.orientation.prefix(), self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn is_url_safe(token: &str) -> bool {
        !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn test_token_encodes_256_bits() {
        let token = random_token().unwrap();
        // 32 bytes -> 43 unpadded base64 characters
        assert_eq!(token.len(), 43);
        assert!(is_url_safe(&token));
    }

    #[test]
    fn test_key_shape() {
        for orientation in [
            Orientation::Landscape,
            Orientation::Portrait,
            Orientation::Other,
        ] {
            let key = StorageKey::generate(orientation).unwrap().to_string();
            let rest = key
                .strip_prefix(&format!("{}/", orientation.prefix()))
                .unwrap();
            let token = rest.strip_suffix(".mp4").unwrap();
            assert!(is_url_safe(token), "bad token in {}", key);
        }
    }

    #[test]
    fn test_keys_are_distinct() {
        let keys: HashSet<String> = (0..10_000)
            .map(|_| StorageKey::generate(Orientation::Landscape).unwrap().to_string())
            .collect();
        assert_eq!(keys.len(), 10_000);
    }
}
