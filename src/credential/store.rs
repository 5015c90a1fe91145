//! Credential resolution and persistence.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::AgentError;

/// Hash a plaintext secret into the persisted form (lowercase hex MD5).
pub fn hash_secret(plaintext: &str) -> String {
    format!("{:x}", md5::compute(plaintext.as_bytes()))
}

/// The resolved shared secret, always in hashed form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a hash presented by a caller.
    pub fn matches(&self, presented: &str) -> bool {
        self.0 == presented.trim().to_ascii_lowercase()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Where a resolved credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    External,
    Stored,
    Default,
}

/// File-backed credential store.
///
/// Resolution precedence: external plaintext, then the stored hash, then the
/// default plaintext. Whatever is returned has already been written to disk.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve the credential for this startup.
    pub fn resolve(
        &self,
        external: Option<&str>,
        default_plaintext: &str,
    ) -> Result<(Credential, CredentialSource), AgentError> {
        if let Some(plaintext) = external.filter(|p| !p.is_empty()) {
            let hash = hash_secret(plaintext);
            self.replace(&hash)?;
            tracing::info!(path = ?self.path, "Credential set from external password");
            return Ok((Credential(hash), CredentialSource::External));
        }

        if let Some(stored) = self.read_stored()? {
            tracing::debug!(path = ?self.path, "Credential loaded from file");
            return Ok((Credential(stored), CredentialSource::Stored));
        }

        let hash = hash_secret(default_plaintext);
        self.replace(&hash)?;
        tracing::warn!(path = ?self.path, "No credential configured, using the built-in default");
        Ok((Credential(hash), CredentialSource::Default))
    }

    /// Stored hash, trimmed and lower-cased; `None` when absent or empty.
    fn read_stored(&self) -> Result<Option<String>, AgentError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let value = content.trim().to_lowercase();
                Ok((!value.is_empty()).then_some(value))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(AgentError::CredentialRead {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Delete any existing file and write `hash` in its place.
    fn replace(&self, hash: &str) -> Result<(), AgentError> {
        let persist_err = |source| AgentError::CredentialPersist {
            path: self.path.clone(),
            source,
        };

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(persist_err(e)),
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(persist_err)?;
        }
        fs::write(&self.path, hash).map_err(persist_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join(".password"))
    }

    #[test]
    fn hash_is_lowercase_md5_hex() {
        assert_eq!(hash_secret("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn external_password_always_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "ffffffffffffffffffffffffffffffff").unwrap();

        let (credential, source) = store.resolve(Some("hunter2"), "default").unwrap();
        assert_eq!(source, CredentialSource::External);
        assert_eq!(credential.as_str(), hash_secret("hunter2"));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), hash_secret("hunter2"));
    }

    #[test]
    fn stored_hash_is_trimmed_and_lowercased() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "  ABCDEF0123\n").unwrap();

        for _ in 0..2 {
            let (credential, source) = store.resolve(None, "default").unwrap();
            assert_eq!(source, CredentialSource::Stored);
            assert_eq!(credential.as_str(), "abcdef0123");
        }
    }

    #[test]
    fn empty_external_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "abc123").unwrap();

        let (credential, _) = store.resolve(Some(""), "default").unwrap();
        assert_eq!(credential.as_str(), "abc123");
    }

    #[test]
    fn default_used_when_nothing_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let (credential, source) = store.resolve(None, "default").unwrap();
        assert_eq!(source, CredentialSource::Default);
        assert_eq!(credential.as_str(), hash_secret("default"));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), hash_secret("default"));
    }

    #[test]
    fn blank_file_is_replaced_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), " \n\t").unwrap();

        let (credential, source) = store.resolve(None, "default").unwrap();
        assert_eq!(source, CredentialSource::Default);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), credential.as_str());
    }

    #[test]
    fn creates_missing_home_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("nested/home/.password"));
        store.resolve(Some("pw"), "default").unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn unwritable_location_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let store = CredentialStore::new(blocker.join(".password"));

        let err = store.resolve(Some("pw"), "default").unwrap_err();
        assert!(matches!(err, AgentError::CredentialPersist { .. }));
    }

    #[test]
    fn matches_ignores_case_and_whitespace() {
        let credential = Credential(hash_secret("abc"));
        assert!(credential.matches(" 900150983CD24FB0D6963F7D28E17F72 "));
        assert!(!credential.matches("nope"));
        assert_eq!(format!("{:?}", credential), "Credential(***)");
    }
}
