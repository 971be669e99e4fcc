//! Token persistence: plain token.json at a caller-supplied path.
//!
//! The path comes from the `--token` CLI argument, so there is no well-known
//! location and no platform keychain — the file backend is canonical.

use std::path::Path;

use super::{GoogleApiError, GoogleToken};

/// Load the cached OAuth token.
pub fn load_token(path: &Path) -> Result<GoogleToken, GoogleApiError> {
    if !path.exists() {
        return Err(GoogleApiError::TokenNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let token: GoogleToken = serde_json::from_str(&content)?;
    Ok(token)
}

/// Persist an OAuth token.
pub fn save_token(path: &Path, token: &GoogleToken) -> Result<(), GoogleApiError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
        }
    }

    let content = serde_json::to_string_pretty(token)?;
    atomic_write_str(path, &content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Write via a sibling temp file + rename so a crash mid-write never leaves a
/// truncated token behind.
fn atomic_write_str(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google_api::GoogleToken;

    fn sample_token() -> GoogleToken {
        GoogleToken {
            token: "ya29.sample".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "client.apps.googleusercontent.com".to_string(),
            client_secret: Some("secret".to_string()),
            scopes: vec!["https://www.googleapis.com/auth/spreadsheets".to_string()],
            expiry: Some("2026-02-08T12:00:00Z".to_string()),
            account: None,
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");

        save_token(&path, &sample_token()).unwrap();
        let loaded = load_token(&path).unwrap();

        assert_eq!(loaded.token, "ya29.sample");
        assert_eq!(loaded.refresh_token.as_deref(), Some("1//refresh"));
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");

        save_token(&path, &sample_token()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_load_missing_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");

        let err = load_token(&path).unwrap_err();
        assert!(matches!(err, GoogleApiError::TokenNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        save_token(&path, &sample_token()).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
