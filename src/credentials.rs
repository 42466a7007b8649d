use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Verify that the credential file exists before anything else runs.
///
/// Contents are not inspected here; a malformed file surfaces later when the
/// service client is built.
pub fn check_credentials(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(anyhow!(
            "No se encontró el archivo de credenciales en: {}",
            path.display()
        ));
    }
    log::info!("using credential file {}", path.display());
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("keys").join("svc.json");
        let err = check_credentials(&path).unwrap_err();
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn existing_file_passes_without_parsing() -> Result<()> {
        let file = tempfile::NamedTempFile::new()?;
        std::fs::write(file.path(), b"not json at all")?;
        assert_eq!(check_credentials(file.path())?, file.path());
        Ok(())
    }
}
