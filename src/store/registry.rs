use std::collections::HashMap;

use tokio::time::Instant;

/// Result of looking a digest up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Valid,
    Expired,
    Absent,
}

impl Lookup {
    pub fn is_valid(&self) -> bool {
        matches!(self, Lookup::Valid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lookup::Valid => "valid",
            Lookup::Expired => "expired",
            Lookup::Absent => "absent",
        }
    }
}

/// digest -> expiry. A record is invalid from its expiry instant onwards.
#[derive(Debug, Default)]
pub struct Registry {
    tokens: HashMap<String, Instant>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh record; returns false if the digest is already present.
    pub fn insert_unique(&mut self, digest: String, expires_at: Instant) -> bool {
        if self.tokens.contains_key(&digest) {
            return false;
        }
        self.tokens.insert(digest, expires_at);
        true
    }

    /// Validates a digest, renewing it to `renew_until` when valid and
    /// deleting it when expired.
    pub fn checkout(&mut self, digest: &str, now: Instant, renew_until: Instant) -> Lookup {
        match self.tokens.get_mut(digest) {
            None => Lookup::Absent,
            Some(expires_at) if *expires_at <= now => {
                self.tokens.remove(digest);
                Lookup::Expired
            }
            Some(expires_at) => {
                *expires_at = renew_until;
                Lookup::Valid
            }
        }
    }

    /// Validates and removes a digest in one step.
    pub fn redeem(&mut self, digest: &str, now: Instant) -> Lookup {
        match self.tokens.remove(digest) {
            None => Lookup::Absent,
            Some(expires_at) if expires_at <= now => Lookup::Expired,
            Some(_) => Lookup::Valid,
        }
    }

    pub fn remove(&mut self, digest: &str) -> bool {
        self.tokens.remove(digest).is_some()
    }

    /// Removes every record expired at `now`, returning how many went.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|_, expires_at| *expires_at > now);
        before - self.tokens.len()
    }

    pub fn clear(&mut self) -> usize {
        let cleared = self.tokens.len();
        self.tokens.clear();
        cleared
    }

    #[cfg(test)]
    pub fn expires_at(&self, digest: &str) -> Option<Instant> {
        self.tokens.get(digest).copied()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn duplicate_digest_is_rejected() {
        let now = Instant::now();
        let mut registry = Registry::new();
        assert!(registry.insert_unique("d1".into(), now + SEC));
        assert!(!registry.insert_unique("d1".into(), now + SEC * 5));
        assert_eq!(registry.expires_at("d1"), Some(now + SEC));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn checkout_renews_valid_record() {
        let now = Instant::now();
        let mut registry = Registry::new();
        registry.insert_unique("d1".into(), now + SEC);

        let later = now + SEC / 2;
        assert_eq!(registry.checkout("d1", later, later + SEC), Lookup::Valid);
        assert_eq!(registry.expires_at("d1"), Some(later + SEC));
    }

    #[test]
    fn checkout_deletes_expired_record() {
        let now = Instant::now();
        let mut registry = Registry::new();
        registry.insert_unique("d1".into(), now + SEC);

        let at_expiry = now + SEC;
        assert_eq!(registry.checkout("d1", at_expiry, at_expiry + SEC), Lookup::Expired);
        assert!(registry.is_empty());
        assert_eq!(registry.checkout("d1", at_expiry, at_expiry + SEC), Lookup::Absent);
    }

    #[test]
    fn redeem_consumes_record() {
        let now = Instant::now();
        let mut registry = Registry::new();
        registry.insert_unique("d1".into(), now + SEC);
        registry.insert_unique("d2".into(), now);

        assert_eq!(registry.redeem("d1", now), Lookup::Valid);
        assert_eq!(registry.redeem("d1", now), Lookup::Absent);
        assert_eq!(registry.redeem("d2", now), Lookup::Expired);
        assert!(registry.is_empty());
    }

    #[test]
    fn sweep_keeps_only_live_records() {
        let now = Instant::now();
        let mut registry = Registry::new();
        registry.insert_unique("old".into(), now);
        registry.insert_unique("edge".into(), now + SEC);
        registry.insert_unique("live".into(), now + SEC * 2);

        assert_eq!(registry.sweep(now + SEC), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.expires_at("live").is_some());
        assert_eq!(registry.clear(), 1);
        assert!(!registry.remove("live"));
    }
}
