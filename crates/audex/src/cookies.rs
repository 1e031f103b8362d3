//! Runtime-replaceable cookie file for the downloader.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use base64::Engine as _;
use serde::Serialize;

use crate::error::CookieError;

/// File name used for cookies installed at runtime.
pub const COOKIES_FILE_NAME: &str = "cookies.txt";

/// Result of installing a cookie file.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InstalledCookies {
    pub path: PathBuf,
    pub size: usize,
}

/// Tracks which cookie file, if any, URL jobs pass to the downloader.
pub struct CookieJar {
    managed_path: PathBuf,
    active: RwLock<Option<PathBuf>>,
}

impl CookieJar {
    /// Creates a jar storing installed cookies under `dir`, starting with
    /// `initial` as the active file.
    pub fn new<P: AsRef<Path>>(dir: P, initial: Option<PathBuf>) -> Self {
        Self {
            managed_path: dir.as_ref().join(COOKIES_FILE_NAME),
            active: RwLock::new(initial),
        }
    }

    /// Currently active cookie file.
    pub fn current(&self) -> Option<PathBuf> {
        match self.active.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, value: Option<PathBuf>) {
        let mut guard = match self.active.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Cookie jar lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = value;
    }

    /// Decodes `encoded` and makes it the active cookie file.
    ///
    /// Invalid input leaves the current cookie file untouched.
    pub fn install_base64(&self, encoded: &str) -> Result<InstalledCookies, CookieError> {
        let raw = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;

        if let Some(parent) = self.managed_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CookieError::Write {
                path: self.managed_path.clone(),
                source: e,
            })?;
        }
        std::fs::write(&self.managed_path, &raw).map_err(|e| CookieError::Write {
            path: self.managed_path.clone(),
            source: e,
        })?;

        self.set(Some(self.managed_path.clone()));
        log::info!(
            "Installed cookie file {} ({} bytes)",
            self.managed_path.display(),
            raw.len()
        );

        Ok(InstalledCookies {
            path: self.managed_path.clone(),
            size: raw.len(),
        })
    }

    /// Removes the active cookie file and stops passing cookies.
    pub fn clear(&self) -> Result<(), CookieError> {
        if let Some(path) = self.current() {
            match std::fs::remove_file(&path) {
                Ok(()) => log::info!("Removed cookie file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CookieError::Remove { path, source: e }),
            }
        }
        self.set(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_install_and_clear() {
        let dir = TempDir::new().unwrap();
        let jar = CookieJar::new(dir.path(), None);
        assert!(jar.current().is_none());

        let encoded = base64::engine::general_purpose::STANDARD.encode(b"# Netscape HTTP Cookie File\n");
        let installed = jar.install_base64(&encoded).unwrap();

        assert_eq!(installed.path, dir.path().join(COOKIES_FILE_NAME));
        assert_eq!(installed.size, 28);
        assert_eq!(jar.current(), Some(installed.path.clone()));
        assert_eq!(
            std::fs::read(&installed.path).unwrap(),
            b"# Netscape HTTP Cookie File\n"
        );

        jar.clear().unwrap();
        assert!(jar.current().is_none());
        assert!(!installed.path.exists());
    }

    #[test]
    fn test_invalid_base64_keeps_current() {
        let dir = TempDir::new().unwrap();
        let initial = dir.path().join("mine.txt");
        let jar = CookieJar::new(dir.path(), Some(initial.clone()));

        let result = jar.install_base64("!!not base64!!");
        assert!(matches!(result, Err(CookieError::InvalidBase64(_))));
        assert_eq!(jar.current(), Some(initial));
    }

    #[test]
    fn test_clear_tolerates_missing_file() {
        let dir = TempDir::new().unwrap();
        let jar = CookieJar::new(dir.path(), Some(dir.path().join("gone.txt")));
        jar.clear().unwrap();
        assert!(jar.current().is_none());
    }
}
