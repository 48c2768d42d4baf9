//! Session-wide table of blobs waiting to be sent.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;

use super::FILE_PLACEHOLDER_PREFIX;

/// Blobs staged for upload, keyed by opaque id.
///
/// The table is shared between the caller and every socket of a session.
/// Each entry is consumed at most once: [`PendingUploads::take`] removes it
/// atomically, so two concurrent sends can never both claim the same blob.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use peerframe::upload::PendingUploads;
///
/// let uploads = PendingUploads::new();
/// let token = uploads.insert("abc", Bytes::from_static(b"gcode"));
/// assert_eq!(token, "#__graphql_file__:abc");
/// assert_eq!(uploads.take("abc"), Some(Bytes::from_static(b"gcode")));
/// assert_eq!(uploads.take("abc"), None);
/// ```
#[derive(Debug, Default)]
pub struct PendingUploads {
    entries: DashMap<String, Bytes>,
    next_id: AtomicU64,
}

impl PendingUploads {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Stage `blob` under `id`, returning the placeholder token to embed.
    ///
    /// Staging a second blob under the same id replaces the first.
    pub fn insert(&self, id: impl Into<String>, blob: Bytes) -> String {
        let id = id.into();
        let token = Self::placeholder(&id);
        self.entries.insert(id, blob);
        token
    }

    /// Stage `blob` under a freshly generated id.
    pub fn stage(&self, blob: Bytes) -> String {
        let id = format!("upload-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.insert(id, blob)
    }

    /// Remove and return the blob staged under `id`.
    #[must_use]
    pub fn take(&self, id: &str) -> Option<Bytes> {
        self.entries.remove(id).map(|(_, blob)| blob)
    }

    /// Put back blobs claimed by a send that did not go through.
    pub(crate) fn restore(&self, claimed: impl IntoIterator<Item = (String, Bytes)>) {
        for (id, blob) in claimed {
            self.entries.insert(id, blob);
        }
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool { self.entries.contains_key(id) }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Placeholder token referring to `id`.
    #[must_use]
    pub fn placeholder(id: &str) -> String { format!("{FILE_PLACEHOLDER_PREFIX}{id}") }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn staged_ids_are_unique() {
        let uploads = PendingUploads::new();
        let first = uploads.stage(Bytes::from_static(b"a"));
        let second = uploads.stage(Bytes::from_static(b"b"));
        assert_ne!(first, second);
        assert_eq!(uploads.len(), 2);
    }

    #[test]
    fn restore_returns_claimed_entries() {
        let uploads = PendingUploads::new();
        uploads.insert("abc", Bytes::from_static(b"blob"));
        let blob = uploads.take("abc").expect("staged blob");
        assert!(uploads.is_empty());

        uploads.restore([(String::from("abc"), blob)]);
        assert!(uploads.contains("abc"));
    }

    #[tokio::test]
    async fn concurrent_takes_claim_an_entry_once() {
        let uploads = Arc::new(PendingUploads::new());
        uploads.insert("shared", Bytes::from_static(b"blob"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let uploads = Arc::clone(&uploads);
                tokio::spawn(async move { uploads.take("shared").is_some() })
            })
            .collect();

        let mut claimed = 0;
        for handle in handles {
            if handle.await.expect("task completed") {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
    }
}
