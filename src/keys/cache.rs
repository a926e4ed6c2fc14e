//! Single-slot memoization of parsed key pairs.
//!
//! Builds usually sign many outputs with the same `.snk` file. Parsing a key pair is cheap, but
//! deriving and validating its private parameters is not, so the most recently parsed key pair
//! is kept together with the exact bytes it came from. A lookup hits only when the new content
//! is byte-for-byte identical; any other successful parse replaces the slot as a whole.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use arc_swap::ArcSwapOption;
use log::debug;

use crate::blob::{ParsedKey, RsaParameters};

/// One cached key pair.
#[derive(Debug, PartialEq, Eq)]
pub struct CachedKeyPair {
    /// Raw file content the entry was parsed from
    pub content: Vec<u8>,
    /// Canonical public key
    pub public_key: Vec<u8>,
    /// Private parameters, if the content carried them completely
    pub private_key: Option<RsaParameters>,
}

/// Lock-free single-slot cache of the most recently parsed key pair.
///
/// Strategies own one cache each and share it between their clones through an [`Arc`].
/// Readers never block; a store replaces the previous entry atomically.
///
/// # Examples
///
/// ```rust
/// use dotsign::keys::KeyPairCache;
/// use dotsign::blob::try_parse_key;
///
/// let cache = KeyPairCache::new();
/// let content = vec![0u8; 8];
///
/// assert!(cache.get_or_parse(&content, try_parse_key).is_none());
/// assert_eq!(cache.misses(), 1);
/// assert!(cache.current().is_none());
/// ```
#[derive(Default)]
pub struct KeyPairCache {
    slot: ArcSwapOption<CachedKeyPair>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl KeyPairCache {
    /// Create an empty cache.
    pub fn new() -> KeyPairCache {
        KeyPairCache::default()
    }

    /// Look up `content`, parsing and storing it on a miss.
    ///
    /// `parse` runs only when the slot holds different content. A failed parse leaves the slot
    /// untouched.
    pub fn get_or_parse<F>(&self, content: &[u8], parse: F) -> Option<Arc<CachedKeyPair>>
    where
        F: FnOnce(&[u8]) -> Option<ParsedKey>,
    {
        if let Some(entry) = self.lookup(content) {
            return Some(entry);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let parsed = parse(content)?;
        let entry = Arc::new(CachedKeyPair {
            content: content.to_vec(),
            public_key: parsed.public_key,
            private_key: parsed.private_key,
        });

        debug!("caching key pair of {} bytes", content.len());
        self.slot.store(Some(Arc::clone(&entry)));
        Some(entry)
    }

    /// Returns the cached entry if it was parsed from exactly `content`.
    pub fn lookup(&self, content: &[u8]) -> Option<Arc<CachedKeyPair>> {
        let current = self.slot.load_full()?;
        if current.content.as_slice() != content {
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!("key pair cache hit ({} bytes)", content.len());
        Some(current)
    }

    /// The current entry, if any.
    pub fn current(&self) -> Option<Arc<CachedKeyPair>> {
        self.slot.load_full()
    }

    /// Drops the current entry.
    pub fn clear(&self) {
        self.slot.store(None);
    }

    /// Number of lookups answered from the slot.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of lookups that required a parse.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for KeyPairCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairCache")
            .field("occupied", &self.slot.load().is_some())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, thread};

    use super::*;
    use crate::{
        blob::{try_extract_public_key, try_parse_key},
        test::private_key_blob,
    };

    #[test]
    fn hit_on_identical_content() {
        let cache = KeyPairCache::new();
        let blob = private_key_blob(1024);
        let calls = Cell::new(0);
        let parse = |content: &[u8]| {
            calls.set(calls.get() + 1);
            try_parse_key(content)
        };

        let first = cache.get_or_parse(&blob, parse).unwrap();
        let second = cache.get_or_parse(&blob, parse).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn different_content_replaces_slot() {
        let cache = KeyPairCache::new();
        let a = private_key_blob(1024);
        let b = private_key_blob(2048);

        cache.get_or_parse(&a, try_parse_key).unwrap();
        cache.get_or_parse(&b, try_parse_key).unwrap();

        assert_eq!(cache.current().unwrap().content, b);
        assert!(cache.lookup(&a).is_none());
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn failed_parse_keeps_slot() {
        let cache = KeyPairCache::new();
        let blob = private_key_blob(1024);
        cache.get_or_parse(&blob, try_parse_key).unwrap();

        assert!(cache.get_or_parse(&[0x07; 24], try_parse_key).is_none());
        assert_eq!(cache.current().unwrap().content, blob);
    }

    #[test]
    fn concurrent_callers_see_whole_entries() {
        let cache = KeyPairCache::new();
        let blobs = [private_key_blob(1024), private_key_blob(2048)];
        let public_keys = [
            try_extract_public_key(&blobs[0]).unwrap(),
            try_extract_public_key(&blobs[1]).unwrap(),
        ];

        thread::scope(|scope| {
            for worker in 0..8 {
                let cache = &cache;
                let blobs = &blobs;
                let public_keys = &public_keys;
                scope.spawn(move || {
                    for round in 0..200 {
                        let index = (worker + round) % 2;
                        let entry = cache.get_or_parse(&blobs[index], try_parse_key).unwrap();

                        assert_eq!(entry.content, blobs[index]);
                        assert_eq!(entry.public_key, public_keys[index]);
                    }
                });
            }
        });

        let current = cache.current().unwrap();
        assert!(current.content == blobs[0] || current.content == blobs[1]);
        let index = usize::from(current.content == blobs[1]);
        assert_eq!(current.public_key, public_keys[index]);
        assert_eq!(cache.hits() + cache.misses(), 8 * 200);
    }

    #[test]
    fn prefix_is_not_a_hit() {
        let cache = KeyPairCache::new();
        let blob = private_key_blob(1024);
        cache.get_or_parse(&blob, try_parse_key).unwrap();

        assert!(cache.lookup(&blob[..blob.len() - 1]).is_none());
        cache.clear();
        assert!(cache.current().is_none());
    }
}
