//! The versioning engine.
//!
//! One append-only snapshot chain per session: every committed mutation
//! bumps the version by exactly one, retires the pre-mutation state into a
//! bounded set of retained snapshots, and rewrites `current.json`. Undo
//! restores the chain's previous snapshot and is destructive of redo.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use plat_model::{Site, SiteHistory};

use crate::error::{Result, StoreError};
use crate::session::{SessionId, SessionResolver};
use crate::snapshot::{
    RETAIN_LIMIT, current_path, prune_retained, read_snapshot, version_file_name, write_snapshot,
};

/// Snapshot store over a session resolver.
///
/// The on-disk layout has no compare-and-swap protection, so every
/// load-mutate-commit cycle runs under a per-session mutex. This serializes
/// writers within one process; cross-process exclusion is the deployment's
/// problem.
pub struct GeometryStore<R> {
    sessions: R,
    retain_limit: usize,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<R: SessionResolver> GeometryStore<R> {
    pub fn new(sessions: R) -> Self {
        Self {
            sessions,
            retain_limit: RETAIN_LIMIT,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Override the retention window (tests shrink it).
    #[must_use]
    pub fn with_retain_limit(mut self, limit: usize) -> Self {
        self.retain_limit = limit;
        self
    }

    pub(crate) fn session_lock(&self, session: &SessionId) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            locks
                .entry(session.as_str().to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Load the current site for a session; a fresh version-0 site when no
    /// snapshot exists yet.
    pub fn load(&self, session: &SessionId) -> Result<Site> {
        let lock = self.session_lock(session);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load_locked(session)
    }

    pub(crate) fn load_locked(&self, session: &SessionId) -> Result<Site> {
        let root = self.sessions.resolve(session)?;
        match read_snapshot(&current_path(&root))? {
            Some(doc) => {
                let site = Site::from_storage(doc)?;
                tracing::debug!(%session, version = site.version, "loaded current snapshot");
                Ok(site)
            }
            None => Ok(Site::for_session(session.as_str())),
        }
    }

    /// Commit a mutated site as the next snapshot and return it.
    ///
    /// The pre-mutation `current` is re-read to learn its version N and, if
    /// N > 0, retained verbatim as `version_N.json` for undo. The mutated
    /// site is stamped with version N+1 and a history record pointing at
    /// the retained file, then written as the new `current`.
    pub fn commit(&self, session: &SessionId, site: Site, action: &str) -> Result<Site> {
        let lock = self.session_lock(session);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.commit_locked(session, site, action)
    }

    pub(crate) fn commit_locked(
        &self,
        session: &SessionId,
        mut site: Site,
        action: &str,
    ) -> Result<Site> {
        let root = self.sessions.resolve(session)?;
        let current = current_path(&root);

        let (current_version, previous_file) = match read_snapshot(&current)? {
            Some(doc) if doc.version > 0 => {
                let name = version_file_name(doc.version);
                write_snapshot(&root.join(&name), &doc)?;
                (doc.version, Some(name))
            }
            Some(doc) => (doc.version, None),
            None => (0, None),
        };

        site.version = current_version + 1;
        site.history = Some(SiteHistory {
            current_version: site.version,
            previous_version_file: previous_file,
        });
        if site.session_id.is_none() {
            site.session_id = Some(session.as_str().to_string());
        }

        write_snapshot(&current, &site.to_storage())?;
        prune_retained(&root, self.retain_limit);
        tracing::info!(%session, version = site.version, action, "committed snapshot");
        Ok(site)
    }

    /// Restore the chain's previous snapshot as `current`, decrementing the
    /// version by one. Destroys any redo capability.
    pub fn undo(&self, session: &SessionId) -> Result<Site> {
        let lock = self.session_lock(session);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let root = self.sessions.resolve(session)?;
        let current = current_path(&root);
        let Some(doc) = read_snapshot(&current)? else {
            return Err(StoreError::NothingToUndo);
        };
        if doc.version == 0 {
            return Err(StoreError::NothingToUndo);
        }

        let previous = doc
            .history
            .as_ref()
            .and_then(|h| h.previous_version_file.clone());
        let mut restored = match previous {
            Some(name) => match read_snapshot(&root.join(&name))? {
                Some(previous_doc) => previous_doc,
                // The reference points at a pruned snapshot; the chain is
                // exhausted, not corrupt.
                None => return Err(StoreError::NothingToUndo),
            },
            // Version >= 1 with a null reference: the predecessor is the
            // pristine empty session state, which is never written to disk.
            None => Site::for_session(session.as_str()).to_storage(),
        };

        restored.version = doc.version - 1;
        write_snapshot(&current, &restored)?;
        let site = Site::from_storage(restored)?;
        tracing::info!(%session, version = site.version, "restored previous snapshot");
        Ok(site)
    }
}
