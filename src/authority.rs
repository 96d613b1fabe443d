//! Remote certificate authority interface

use crate::certificate::{Certificate, CertificateClass, Identity, TeamContext};
use crate::error::Result;

/// Service that issues and lists code signing certificates.
///
/// Implementations own transport concerns: timeouts, retries, auth tokens.
#[allow(async_fn_in_trait)]
pub trait RemoteAuthority {
    /// Log in and select the team to operate on.
    ///
    /// Must return [`CertError::AuthFailure`](crate::error::CertError::AuthFailure)
    /// when credentials are rejected or no team can be resolved.
    async fn authenticate(&self, identity: &Identity) -> Result<TeamContext>;

    /// All certificates of `class`, in the order the authority returns them
    async fn list_certificates(&self, class: CertificateClass) -> Result<Vec<Certificate>>;

    /// Raw certificate bytes
    async fn download(&self, certificate: &Certificate) -> Result<Vec<u8>>;

    /// Submit a PEM CSR and return the issued certificate
    async fn create_certificate(&self, class: CertificateClass, csr_pem: &str)
    -> Result<Certificate>;
}
