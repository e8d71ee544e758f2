use std::path::{Path, PathBuf};

use crate::error::StoreError;

pub const STORE_FILE: &str = "store.yaml";
pub const CONFIG_FILE: &str = "config.yaml";
pub const SOURCE_DIR: &str = "source";

pub fn lexisync_root(home: &Path) -> PathBuf {
    home.join(".lexisync")
}

pub fn store_path(home: &Path) -> PathBuf {
    lexisync_root(home).join(STORE_FILE)
}

pub fn config_path(home: &Path) -> PathBuf {
    lexisync_root(home).join(CONFIG_FILE)
}

pub fn default_source_dir(home: &Path) -> PathBuf {
    lexisync_root(home).join(SOURCE_DIR)
}

pub fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

/// `<home>/.lexisync/`, created with mode `0700` if absent.
pub fn ensure_root(home: &Path) -> Result<PathBuf, StoreError> {
    let dir = lexisync_root(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
pub(crate) fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
pub(crate) fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}
