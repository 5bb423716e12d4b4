use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use crate::Payload;

/// Per-request view of the cookie payload, inserted into request extensions by
/// [`SecureCookieLayer`](crate::SecureCookieLayer).
///
/// Clones share state, so a handler's changes are visible to the layer once the handler returns.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    payload: Mutex<Payload>,
    modified: AtomicBool,
    deleted: AtomicBool,
}

impl Session {
    pub(crate) fn new(payload: Payload) -> Self {
        Self {
            inner: Arc::new(Inner {
                payload: Mutex::new(payload),
                ..Inner::default()
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Sets `key`, returning the previous value.
    ///
    /// Inserting after [`delete`](Self::delete) starts a fresh payload that replaces the cookie.
    pub fn insert<K: Into<String>, V: Into<String>>(&self, key: K, value: V) -> Option<String> {
        let previous = self.lock().insert(key.into(), value.into());
        self.inner.deleted.store(false, Ordering::Release);
        self.mark_modified();
        previous
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        let removed = self.lock().remove(key);
        if removed.is_some() {
            self.mark_modified();
        }
        removed
    }

    /// Empties the payload. The cookie is removed once the response is written.
    pub fn clear(&self) {
        self.lock().clear();
        self.mark_modified();
    }

    /// Empties the payload and removes the cookie, even if the client never sent one.
    pub fn delete(&self) {
        self.clear();
        self.inner.deleted.store(true, Ordering::Release);
    }

    /// A snapshot of the current payload.
    pub fn payload(&self) -> Payload {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_modified(&self) -> bool {
        self.inner.modified.load(Ordering::Acquire)
    }

    pub fn is_deleted(&self) -> bool {
        self.inner.deleted.load(Ordering::Acquire)
    }

    fn mark_modified(&self) {
        self.inner.modified.store(true, Ordering::Release);
    }

    // Poisoning is ignored: the payload map has no cross-entry invariants.
    fn lock(&self) -> MutexGuard<'_, Payload> {
        self.inner
            .payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> Session {
        Session::new(Payload::from([("user".to_owned(), "alice".to_owned())]))
    }

    #[test]
    fn reads_do_not_mark_modified() {
        let session = loaded();
        assert_eq!(session.get("user").as_deref(), Some("alice"));
        assert_eq!(session.get("missing"), None);
        assert!(!session.is_empty());
        assert!(!session.is_modified());
    }

    #[test]
    fn writes_are_shared_between_clones() {
        let session = loaded();
        let clone = session.clone();

        assert_eq!(clone.insert("user", "bob").as_deref(), Some("alice"));
        assert_eq!(session.get("user").as_deref(), Some("bob"));
        assert!(session.is_modified());
    }

    #[test]
    fn removing_missing_key_is_not_a_modification() {
        let session = loaded();
        assert_eq!(session.remove("missing"), None);
        assert!(!session.is_modified());

        assert_eq!(session.remove("user").as_deref(), Some("alice"));
        assert!(session.is_modified());
        assert!(session.is_empty());
    }

    #[test]
    fn delete_clears_and_flags() {
        let session = loaded();
        session.delete();

        assert!(session.is_empty());
        assert!(session.is_deleted());
        assert!(session.payload().is_empty());
    }

    #[test]
    fn insert_after_delete_starts_fresh() {
        let session = loaded();
        session.delete();
        session.insert("flash", "bye");

        assert!(!session.is_deleted());
        assert_eq!(session.get("user"), None);
        assert_eq!(session.get("flash").as_deref(), Some("bye"));
        assert!(session.is_modified());
    }
}
