//! Local credential store: the macOS keychain driven through `security`
//!
//! A certificate counts as installed when its SHA-1 fingerprint shows up as
//! a valid code signing identity, which also implies the private key is
//! present in the keychain.

use crate::error::{CertError, Result};
use std::path::Path;

/// Default keychain for certificate storage
pub const DEFAULT_KEYCHAIN: &str = "login.keychain-db";

/// Local trust store holding installed certificates and keys.
#[allow(async_fn_in_trait)]
pub trait CredentialStore {
    /// Whether the certificate in `certificate_path` is installed
    async fn is_installed(&self, certificate_path: &Path) -> Result<bool>;

    /// Import a certificate or private key file
    async fn import(&self, path: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct KeychainStore {
    keychain: String,
}

impl KeychainStore {
    pub fn new(keychain: impl Into<String>) -> Self {
        Self {
            keychain: keychain.into(),
        }
    }

    pub fn keychain(&self) -> &str {
        &self.keychain
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new(DEFAULT_KEYCHAIN)
    }
}

impl CredentialStore for KeychainStore {
    async fn is_installed(&self, certificate_path: &Path) -> Result<bool> {
        if !tokio::fs::try_exists(certificate_path)
            .await
            .map_err(|e| CertError::io(certificate_path, e))?
        {
            return Ok(false);
        }

        let fingerprint = certificate_fingerprint(certificate_path).await?;

        let output = tokio::process::Command::new("security")
            .args(["find-identity", "-v", "-p", "codesigning", &self.keychain])
            .output()
            .await
            .map_err(|e| {
                CertError::CommandExecution(format!("Failed to run security find-identity: {e}"))
            })?;

        let identities = parse_identity_fingerprints(&output)?;
        Ok(identities.iter().any(|id| id == &fingerprint))
    }

    async fn import(&self, path: &Path) -> Result<()> {
        let path_str = path
            .to_str()
            .ok_or_else(|| CertError::InvalidConfig(format!("Invalid path: {}", path.display())))?;

        let output = tokio::process::Command::new("security")
            .args([
                "import",
                path_str,
                "-k",
                &self.keychain,
                "-T",
                "/usr/bin/codesign",
            ])
            .output()
            .await
            .map_err(|e| {
                CertError::KeychainOperation(format!("Failed to execute security import: {e}"))
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_duplicate_item(&stderr) {
            return Ok(());
        }

        Err(CertError::KeychainOperation(format!(
            "Keychain import of {} failed: {}",
            path.display(),
            stderr.trim()
        )))
    }
}

/// `security import` refuses items that are already in the keychain
fn is_duplicate_item(stderr: &str) -> bool {
    stderr.contains("already exists")
}

/// SHA-1 fingerprint of a DER certificate, uppercase hex without colons
async fn certificate_fingerprint(cert_path: &Path) -> Result<String> {
    let output = tokio::process::Command::new("openssl")
        .args(["x509", "-inform", "der", "-fingerprint", "-sha1", "-noout", "-in"])
        .arg(cert_path)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CertError::MissingDependency(
                    "openssl command not found. Please install OpenSSL.".to_string(),
                )
            } else {
                CertError::CommandExecution(format!("Failed to run openssl x509: {e}"))
            }
        })?;

    if !output.status.success() {
        return Err(CertError::CommandExecution(format!(
            "openssl could not read certificate {}: {}",
            cert_path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_fingerprint(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        CertError::CommandExecution(format!(
            "Unexpected openssl fingerprint output for {}",
            cert_path.display()
        ))
    })
}

/// Parse `SHA1 Fingerprint=AB:CD:...` (OpenSSL) or `sha1 Fingerprint=...` (LibreSSL)
fn parse_fingerprint(output: &str) -> Option<String> {
    let (label, value) = output.trim().split_once('=')?;
    if !label.to_ascii_lowercase().starts_with("sha1") {
        return None;
    }
    let hash = value.trim().replace(':', "").to_ascii_uppercase();
    (hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit())).then_some(hash)
}

/// Extract identity hashes from `security find-identity -v` output
///
/// Format: `  1) 0123ABCD... "Apple Distribution: Acme Corp (TEAM123)"`
pub fn parse_identity_fingerprints(output: &std::process::Output) -> Result<Vec<String>> {
    if !output.status.success() {
        return Err(CertError::CommandExecution(format!(
            "security find-identity failed with status {}: {}",
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let output_str = std::str::from_utf8(&output.stdout).map_err(|e| {
        CertError::CommandExecution(format!("security command output is not valid UTF-8: {e}"))
    })?;

    Ok(output_str
        .lines()
        .filter_map(|line| {
            let (_, rest) = line.trim().split_once(')')?;
            let hash = rest.split_whitespace().next()?;
            (hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit()))
                .then(|| hash.to_ascii_uppercase())
        })
        .collect())
}

/// Check that `security` and `openssl` are available
pub async fn check_dependencies() -> Result<()> {
    if tokio::process::Command::new("security")
        .arg("help")
        .output()
        .await
        .is_err()
    {
        return Err(CertError::MissingDependency(
            "'security' command not available.\n\
             This tool requires macOS with the security framework."
                .to_string(),
        ));
    }

    tokio::process::Command::new("openssl")
        .arg("version")
        .output()
        .await
        .map_err(|_| {
            CertError::MissingDependency(
                "OpenSSL/LibreSSL not found in PATH.\n\
                 \n\
                 To install on macOS:\n\
                 • Homebrew: brew install openssl\n\
                 • Or use system LibreSSL: /usr/bin/openssl\n\
                 \n\
                 Required for: reading certificate fingerprints"
                    .to_string(),
            )
        })?;

    Ok(())
}
