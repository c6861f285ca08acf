//! In-memory folder grants.
//!
//! Maps opaque tokens to folders the user picked. A grant becomes stale when
//! its folder disappears or stops being a directory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use uuid::Uuid;

use super::{FileAccessGrantor, ResolvedGrant};
use crate::error::AccessError;

#[derive(Debug, Default)]
pub struct BookmarkGrantor {
    grants: RwLock<HashMap<String, PathBuf>>,
}

impl BookmarkGrantor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a folder and return its new token
    pub fn grant(&self, folder: impl Into<PathBuf>) -> String {
        let token = Uuid::new_v4().to_string();
        self.grant_with_token(token.clone(), folder);
        token
    }

    /// Register a folder under a caller-chosen token
    pub fn grant_with_token(&self, token: impl Into<String>, folder: impl Into<PathBuf>) {
        let mut grants = match self.grants.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        grants.insert(token.into(), folder.into());
    }

    pub fn revoke(&self, token: &str) {
        let mut grants = match self.grants.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        grants.remove(token);
    }

    /// All granted folders; used to scope a `LocalFileMover`
    pub fn roots(&self) -> Vec<PathBuf> {
        let grants = match self.grants.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        grants.values().cloned().collect()
    }
}

impl FileAccessGrantor for BookmarkGrantor {
    fn resolve(&self, token: &str) -> Result<ResolvedGrant, AccessError> {
        let grants = self.grants.read().map_err(|e| AccessError::Unresolvable {
            token: token.to_string(),
            reason: e.to_string(),
        })?;
        let location = grants
            .get(token)
            .cloned()
            .ok_or_else(|| AccessError::UnknownToken(token.to_string()))?;

        let is_stale = !location.is_dir();
        Ok(ResolvedGrant { location, is_stale })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_and_staleness() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("Finance");
        std::fs::create_dir(&folder).unwrap();

        let grantor = BookmarkGrantor::new();
        let token = grantor.grant(&folder);

        let resolved = grantor.resolve(&token).unwrap();
        assert_eq!(resolved.location, folder);
        assert!(!resolved.is_stale);

        std::fs::remove_dir(&folder).unwrap();
        assert!(grantor.resolve(&token).unwrap().is_stale);
    }

    #[test]
    fn test_unknown_and_revoked_tokens() {
        let grantor = BookmarkGrantor::new();
        assert_eq!(
            grantor.resolve("nope"),
            Err(AccessError::UnknownToken("nope".into()))
        );

        grantor.grant_with_token("t", "/tmp");
        assert!(grantor.resolve("t").is_ok());
        grantor.revoke("t");
        assert!(grantor.resolve("t").is_err());
    }
}
