//! Credential file persistence.
//!
//! Credentials live at `<dir>/<provider>.json` with 0600 permissions inside
//! a 0700 directory. Writes go to a sibling `.tmp` file that is synced and
//! renamed over the target, so a crash never leaves a half-written file.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::types::Credential;

#[derive(Debug, Clone)]
pub struct TokenStore {
    base_dir: PathBuf,
}

impl TokenStore {
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, provider: &str) -> PathBuf {
        self.base_dir.join(format!("{provider}.json"))
    }

    fn ensure_dir(&self) -> io::Result<()> {
        if !self.base_dir.exists() {
            fs::create_dir_all(&self.base_dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&self.base_dir, fs::Permissions::from_mode(0o700))?;
            }
        }
        Ok(())
    }

    /// Atomically replace the stored credential for `credential.provider`.
    pub fn store(&self, credential: &Credential) -> io::Result<()> {
        self.ensure_dir()?;

        let path = self.path_for(&credential.provider);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(credential)?;

        {
            let mut file = File::create(&tmp_path)?;
            set_owner_only(&tmp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }

        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        debug!(provider = %credential.provider, path = %path.display(), "stored credential");
        Ok(())
    }

    /// Load the stored credential, or `None` when no file exists.
    pub fn load(&self, provider: &str) -> io::Result<Option<Credential>> {
        let path = self.path_for(provider);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let credential: Credential = serde_json::from_str(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        debug!(provider = %provider, "loaded credential");
        Ok(Some(credential))
    }
}

fn set_owner_only(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
