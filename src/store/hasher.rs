use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use sha2::Digest;

/// One-way transform from a plaintext token to the key kept in the registry.
///
/// `digest` runs concurrently from many tasks, so implementations must build
/// their hashing context per call instead of sharing one.
pub trait TokenHasher: Send + Sync {
    fn digest(&self, token: &str) -> String;
}

/// Hash used for registry keys, chosen on `start`.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
    #[serde(skip)]
    Custom(Arc<dyn TokenHasher>),
}

impl HashAlgorithm {
    pub fn custom(hasher: impl TokenHasher + 'static) -> Self {
        HashAlgorithm::Custom(Arc::new(hasher))
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Custom(_) => "custom",
        }
    }
}

impl TokenHasher for HashAlgorithm {
    fn digest(&self, token: &str) -> String {
        match self {
            HashAlgorithm::Sha224 => hex::encode(sha2::Sha224::digest(token.as_bytes())),
            HashAlgorithm::Sha256 => hex::encode(sha2::Sha256::digest(token.as_bytes())),
            HashAlgorithm::Sha384 => hex::encode(sha2::Sha384::digest(token.as_bytes())),
            HashAlgorithm::Sha512 => hex::encode(sha2::Sha512::digest(token.as_bytes())),
            HashAlgorithm::Custom(hasher) => hasher.digest(token),
        }
    }
}

impl fmt::Debug for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn sha256_is_lowercase_hex() {
        let digest = HashAlgorithm::Sha256.digest("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_lengths_follow_algorithm() {
        assert_eq!(HashAlgorithm::Sha224.digest("token").len(), 56);
        assert_eq!(HashAlgorithm::Sha384.digest("token").len(), 96);
        assert_eq!(HashAlgorithm::Sha512.digest("token").len(), 128);
    }

    #[test]
    fn repeated_digests_are_stable() {
        let hash = HashAlgorithm::Sha512;
        assert_eq!(hash.digest("same"), hash.digest("same"));
        assert_ne!(hash.digest("same"), hash.digest("other"));
    }

    struct Counting(AtomicUsize);

    impl TokenHasher for Counting {
        fn digest(&self, token: &str) -> String {
            self.0.fetch_add(1, Ordering::SeqCst);
            format!("len-{}", token.len())
        }
    }

    #[test]
    fn custom_hasher_is_delegated() {
        let hash = HashAlgorithm::custom(Counting(AtomicUsize::new(0)));
        assert_eq!(hash.digest("abcd"), "len-4");
        assert_eq!(hash.name(), "custom");
    }

    #[test]
    fn deserializes_lowercase_names() {
        let hash: HashAlgorithm = serde_yaml::from_str("sha384").unwrap();
        assert_eq!(hash.name(), "sha384");
        assert!(serde_yaml::from_str::<HashAlgorithm>("md5").is_err());
    }
}
