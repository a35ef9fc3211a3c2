//! Store file locations.
//!
//! A session's store lives at `<base>/.<namespace>/<session>.db`.

use crate::Error;
use std::path::{Path, PathBuf};

/// Namespace directory used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "feedgrab";

/// File extension of store files.
pub const STORE_EXTENSION: &str = "db";

/// Base directory used when none is given: the current user's home.
pub fn default_base_path() -> Result<PathBuf, Error> {
    dirs::home_dir().ok_or_else(|| Error::InvalidInput("cannot determine home directory".into()))
}

/// Check that a session name can be used as a single file name.
pub fn validate_session_name(name: &str) -> Result<(), Error> {
    if name.trim().is_empty() {
        return Err(Error::InvalidSessionName("session name must not be empty".into()));
    }
    if name == "." || name == ".." {
        return Err(Error::InvalidSessionName(format!("reserved name: {name}")));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidSessionName(format!("{name:?} contains a path separator")));
    }
    Ok(())
}

/// Derive the store path for `session` below `base`.
pub fn store_path(base: &Path, namespace: &str, session: &str) -> Result<PathBuf, Error> {
    validate_session_name(session)?;
    Ok(base
        .join(format!(".{namespace}"))
        .join(format!("{session}.{STORE_EXTENSION}")))
}
