//! Stored bearer token between invocations.

use std::fs;
use std::path::Path;

use ispdesk_core::SessionToken;

use crate::error::CliError;

fn storage_err(path: &Path, e: &std::io::Error) -> CliError {
    CliError::Storage {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

pub fn save(path: &Path, token: &SessionToken) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| storage_err(path, &e))?;
    }
    let body = serde_json::to_vec_pretty(token)?;
    fs::write(path, body).map_err(|e| storage_err(path, &e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| storage_err(path, &e))?;
    }
    Ok(())
}

/// A missing file means nobody logged in.
pub fn load(path: &Path) -> Result<SessionToken, CliError> {
    let body = match fs::read(path) {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(CliError::NotLoggedIn),
        Err(e) => return Err(storage_err(path, &e)),
    };
    serde_json::from_slice(&body).map_err(|_| CliError::NotLoggedIn)
}

/// Returns whether a token was present.
pub fn clear(path: &Path) -> Result<bool, CliError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(storage_err(path, &e)),
    }
}
