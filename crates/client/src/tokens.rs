//! Credential pair storage.
//!
//! Tokens are opaque: nothing here looks inside them. When a path is
//! configured the pair is persisted as JSON so it survives restarts; several
//! storage namespaces (profiles) can share the same file without seeing each
//! other's credentials.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .finish()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenFile {
    #[serde(default)]
    sessions: HashMap<String, Credentials>,
}

#[derive(Clone)]
pub struct TokenStore {
    path: Option<PathBuf>,
    namespace: String,
    inner: Arc<RwLock<Option<Credentials>>>,
}

impl TokenStore {
    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            namespace: String::new(),
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// Loads the namespace's credentials from `path`, starting empty when the
    /// file is missing or unreadable.
    pub fn load_or_empty(path: impl Into<PathBuf>, namespace: &str) -> Self {
        let path = path.into();
        let credentials = read_token_file(&path).and_then(|mut file| file.sessions.remove(namespace));
        Self {
            path: Some(path),
            namespace: namespace.to_string(),
            inner: Arc::new(RwLock::new(credentials)),
        }
    }

    /// Replaces both tokens at once and persists them.
    pub fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let credentials = Credentials {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
        };
        self.persist(Some(&credentials))?;
        *guard = Some(credentials);
        Ok(())
    }

    /// Drops both tokens, in memory and on disk.
    pub fn clear_tokens(&self) -> Result<()> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
        self.persist(None)
    }

    /// `true` when an access token is present.
    pub fn has_tokens(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read()
            .map(|credentials| credentials.access_token)
            .filter(|token| !token.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read()
            .map(|credentials| credentials.refresh_token)
            .filter(|token| !token.is_empty())
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.read()
    }

    fn read(&self) -> Option<Credentials> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn persist(&self, credentials: Option<&Credentials>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut file = read_token_file(path).unwrap_or_default();
        match credentials {
            Some(credentials) => {
                file.sessions
                    .insert(self.namespace.clone(), credentials.clone());
            }
            None => {
                file.sessions.remove(&self.namespace);
            }
        }

        write_token_file(path, &file)
            .map_err(|err| ClientError::Storage(format!("{}: {err}", path.display())))
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("path", &self.path)
            .field("namespace", &self.namespace)
            .field("has_tokens", &self.has_tokens())
            .finish()
    }
}

fn read_token_file(path: &Path) -> Option<TokenFile> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

fn write_token_file(path: &Path, file: &TokenFile) -> std::result::Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(file)
        .map_err(|_| std::io::Error::other("serialize failed"))?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    match fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(&tmp, path)?;
            let _ = fs::remove_file(&tmp);
            Ok(())
        }
    }
}
