//! Session identifiers and the storage-root resolver boundary.

use std::fmt;
use std::path::PathBuf;

use crate::error::SessionError;

/// Validated session identifier.
///
/// The id names a directory under the sessions root, so it is restricted to
/// a filesystem-safe charset and may not be a dot path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Result<Self, SessionError> {
        let value = value.into();
        let safe = !value.is_empty()
            && value != "."
            && value != ".."
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !safe {
            return Err(SessionError::InvalidId(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves a session to its dedicated storage root, creating it on first
/// use. Session lifecycle beyond directory provisioning lives elsewhere;
/// the store treats the returned path as an opaque capability.
pub trait SessionResolver {
    fn resolve(&self, session: &SessionId) -> Result<PathBuf, SessionError>;
}

/// Production resolver: one directory per session under a local data dir.
#[derive(Debug, Clone)]
pub struct LocalSessions {
    data_dir: PathBuf,
}

impl LocalSessions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl SessionResolver for LocalSessions {
    fn resolve(&self, session: &SessionId) -> Result<PathBuf, SessionError> {
        let root = self.data_dir.join(session.as_str());
        std::fs::create_dir_all(&root).map_err(|source| SessionError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(root)
    }
}
