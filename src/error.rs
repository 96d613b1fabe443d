//! Error types for certificate reconciliation.

use std::path::PathBuf;
use thiserror::Error;

use crate::certificate::CertificateClass;

pub type Result<T> = std::result::Result<T, CertError>;

/// Substring the authority puts in its rejection when the account already
/// holds the maximum number of certificates of a class.
pub const QUOTA_EXCEEDED_MARKER: &str = "You already have a current";

#[derive(Debug, Error)]
pub enum CertError {
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    #[error(
        "No usable {class} certificate found in {} and creation is disabled",
        output_path.display()
    )]
    NoUsableCertificate {
        class: CertificateClass,
        output_path: PathBuf,
    },

    #[error(
        "Could not create another {class} certificate, reached the maximum number of available certificates.\n\
         Revoke an existing {class} certificate in the developer portal and run again.\n\
         Authority response: {message}"
    )]
    QuotaExceeded {
        class: CertificateClass,
        message: String,
    },

    #[error("Creating a new {class} certificate failed: {message}")]
    CreationFailure {
        class: CertificateClass,
        message: String,
    },

    #[error("File I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Certificate {certificate_id} is not installed after reconciliation ({})",
        path.display()
    )]
    VerificationFailure {
        certificate_id: String,
        path: PathBuf,
    },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("App Store Connect API error: {0}")]
    AppStoreConnectApi(String),

    #[error("CSR generation failed: {0}")]
    CsrGeneration(String),

    #[error("Keychain operation failed: {0}")]
    KeychainOperation(String),

    #[error("Command execution failed: {0}")]
    CommandExecution(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("JWT creation failed: {0}")]
    JwtCreation(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl CertError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify an authority rejection raised while issuing a certificate.
    ///
    /// Only authority rejections are classified; auth, transport and JWT
    /// errors pass through unchanged. The authority has no structured code
    /// for the quota condition, so the message text is matched against
    /// [`QUOTA_EXCEEDED_MARKER`].
    pub fn from_creation_rejection(class: CertificateClass, err: CertError) -> Self {
        match err {
            Self::AppStoreConnectApi(message) if message.contains(QUOTA_EXCEEDED_MARKER) => {
                Self::QuotaExceeded { class, message }
            }
            Self::AppStoreConnectApi(message) => Self::CreationFailure { class, message },
            other => other,
        }
    }
}
