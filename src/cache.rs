//! Output directory holding downloaded certificates and their keys
//!
//! Each certificate id owns up to three sibling files:
//! - `<id>.cer` - raw certificate bytes as delivered by the authority
//! - `<id>.p12` - private key as produced when the CSR was generated
//! - `<id>.certSigningRequest` - the PEM CSR that was submitted
//!
//! Writes are plain whole-file writes with no temp-file-then-rename step.

use crate::error::{CertError, Result};
use std::path::{Path, PathBuf};

pub const CERTIFICATE_EXTENSION: &str = "cer";
pub const PRIVATE_KEY_EXTENSION: &str = "p12";
pub const SIGNING_REQUEST_EXTENSION: &str = "certSigningRequest";

#[derive(Debug, Clone)]
pub struct CertificateCache {
    dir: PathBuf,
}

impl CertificateCache {
    /// Cache rooted at `dir`, made absolute against the current directory
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let dir = std::path::absolute(dir).map_err(|e| CertError::io(dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn certificate_path(&self, id: &str) -> PathBuf {
        self.file_path(id, CERTIFICATE_EXTENSION)
    }

    pub fn private_key_path(&self, id: &str) -> PathBuf {
        self.file_path(id, PRIVATE_KEY_EXTENSION)
    }

    pub fn signing_request_path(&self, id: &str) -> PathBuf {
        self.file_path(id, SIGNING_REQUEST_EXTENSION)
    }

    fn file_path(&self, id: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{id}.{extension}"))
    }

    /// Create the directory if missing
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CertError::io(&self.dir, e))
    }

    /// Whether a key file sits next to the certificate.
    ///
    /// Presence only; a truncated key file still counts.
    pub async fn has_private_key(&self, id: &str) -> Result<bool> {
        let path = self.private_key_path(id);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| CertError::io(path, e))
    }

    pub async fn write_certificate(&self, id: &str, der: &[u8]) -> Result<PathBuf> {
        let path = self.certificate_path(id);
        write_file(&path, der).await?;
        Ok(path)
    }

    pub async fn write_private_key(&self, id: &str, private_key_pem: &str) -> Result<PathBuf> {
        let path = self.private_key_path(id);
        write_file(&path, private_key_pem.as_bytes()).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| CertError::io(&path, e))?;
        }

        Ok(path)
    }

    pub async fn write_signing_request(&self, id: &str, csr_pem: &str) -> Result<PathBuf> {
        let path = self.signing_request_path(id);
        write_file(&path, csr_pem.as_bytes()).await?;
        Ok(path)
    }

    /// Delete a certificate file that has no key beside it.
    ///
    /// A file that is already gone is not an error.
    pub async fn remove_certificate(&self, id: &str) -> Result<()> {
        let path = self.certificate_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CertError::io(path, e)),
        }
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| CertError::io(path, e))
}
