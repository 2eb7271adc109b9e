use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{AccessToken, Error, Result};

/// Durable home of the access token between runs.
pub trait TokenStore {
    /// The stored token, `None` when nothing has been saved.
    fn load(&self) -> Result<Option<AccessToken>>;

    /// Replaces the stored token.
    fn save(&self, token: &AccessToken) -> Result<()>;

    /// Forgets the stored token; a no-op when none is stored.
    fn clear(&self) -> Result<()>;
}

/// Keeps the token as JSON in a single file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileTokenStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<AccessToken>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(&self.path, e)),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn save(&self, token: &AccessToken) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        // write aside, then rename over the old file
        let staging = self.staging_path();
        fs::write(&staging, serde_json::to_vec_pretty(token)?)
            .map_err(|e| Error::io(&staging, e))?;
        fs::rename(&staging, &self.path).map_err(|e| Error::io(&self.path, e))?;
        debug!(path = %self.path.display(), "access token saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "access token removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }
}
