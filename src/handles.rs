use std::{collections::HashMap, sync::Mutex};

/// Short numeric alias handed out in callback payloads.
pub type Handle = u64;

/// Process-wide allocator mapping short ids to values (document paths,
/// person names).
///
/// Ids increase monotonically and are never reused while the table is
/// alive. Allocation and insertion happen under one lock, so concurrent
/// callers never receive the same id. The table is not persisted: after a
/// restart every previously issued id resolves to `None`.
#[derive(Debug)]
pub struct HandleTable<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

#[derive(Debug)]
struct Inner<T> {
    next: Handle,
    entries: HashMap<Handle, T>,
}

impl<T> Default for Inner<T> {
    fn default() -> Self {
        Self {
            next: 0,
            entries: HashMap::new(),
        }
    }
}

impl<T: Clone> HandleTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under a fresh id and return the id.
    pub fn allocate(&self, value: T) -> Handle {
        let mut inner = self.lock();
        let id = inner.next;
        inner.next += 1;
        inner.entries.insert(id, value);
        id
    }

    /// Look up an id; stale or unknown ids yield `None`.
    pub fn resolve(&self, id: Handle) -> Option<T> {
        self.lock().entries.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        // Inserts are single map operations; poisoning leaves no partial state.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
