//! Session store
//!
//! Each session owns the state of one document workflow: the tool lifecycle,
//! the uploaded bytes and the editors. Sessions live in an LRU so abandoned
//! ones are evicted once `max_sessions` is reached.

use crate::editor::{CropEditor, PageOrder, WatermarkEditor};
use crate::error::{Error, Result};
use crate::source::LocalFile;
use crate::tool::ToolState;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// State of one document workflow
#[derive(Debug, Default)]
pub struct Session {
    pub tool: ToolState,
    /// Bytes of the uploaded file, kept for local previews
    pub file: Option<LocalFile>,
    pub crop: CropEditor,
    pub watermark: WatermarkEditor,
    pub page_order: Option<PageOrder>,
}

impl Session {
    /// Forget the document and restore every editor
    pub fn reset(&mut self) {
        *self = Session::default();
    }

    /// Install a freshly uploaded file and size the page order to it
    pub fn attach(&mut self, file: LocalFile) {
        self.page_order = self.tool.page_count.map(PageOrder::for_pages);
        self.crop.reset();
        self.file = Some(file);
    }
}

pub type SessionHandle = Arc<AsyncMutex<Session>>;

/// LRU-bounded map from session id to session
pub struct SessionStore {
    inner: Mutex<LruCache<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Create an empty session and return its id
    pub fn create(&self) -> (String, SessionHandle) {
        let mut inner = self.inner.lock();
        let id = loop {
            let key = uuid::Uuid::new_v4().to_string();
            if !inner.contains(&key) {
                break key;
            }
        };
        let handle = SessionHandle::default();
        if let Some((evicted, _)) = inner.push(id.clone(), handle.clone()) {
            tracing::debug!(session = %evicted, "session evicted");
        }
        (id, handle)
    }

    pub fn get(&self, id: &str) -> Result<SessionHandle> {
        self.inner
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound { id: id.to_string() })
    }

    /// Lock a session for one action; a session already in use is rejected, not queued
    pub fn acquire(&self, id: &str) -> Result<OwnedMutexGuard<Session>> {
        self.get(id)?
            .try_lock_owned()
            .map_err(|_| Error::SessionBusy { id: id.to_string() })
    }

    /// Use an existing session or create one when `id` is `None`
    pub fn acquire_or_create(&self, id: Option<&str>) -> Result<(String, OwnedMutexGuard<Session>)> {
        match id {
            Some(id) => Ok((id.to_string(), self.acquire(id)?)),
            None => {
                let (id, handle) = self.create();
                let guard = handle
                    .try_lock_owned()
                    .map_err(|_| Error::SessionBusy { id: id.clone() })?;
                Ok((id, guard))
            }
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        self.inner.lock().pop(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
