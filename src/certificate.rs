//! Certificate domain types and signing request generation

use crate::error::{CertError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The single certificate category a run operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateClass {
    Production,
    Development,
    InHouse,
}

impl CertificateClass {
    /// Resolve the active class.
    ///
    /// Production unless development is requested; an in-house account
    /// overrides both.
    #[must_use]
    pub fn resolve(development: bool, in_house_account: bool) -> Self {
        let mut class = Self::Production;
        if development {
            class = Self::Development;
        }
        if in_house_account {
            class = Self::InHouse;
        }
        class
    }

    /// App Store Connect `certificateType` value for this class
    ///
    /// In-house certificates are distribution certificates issued through the
    /// enterprise API host.
    #[must_use]
    pub fn to_apple_api_string(&self) -> &'static str {
        match self {
            Self::Production | Self::InHouse => "DISTRIBUTION",
            Self::Development => "DEVELOPMENT",
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
            Self::InHouse => "in-house",
        }
    }
}

impl fmt::Display for CertificateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A certificate as listed by the remote authority.
///
/// Raw bytes are not carried here; fetch them with
/// [`RemoteAuthority::download`](crate::authority::RemoteAuthority::download).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub id: String,
    pub name: String,
    pub class: CertificateClass,
    pub serial_number: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
}

impl Certificate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, class: CertificateClass) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            class,
            serial_number: None,
            expiration_date: None,
        }
    }
}

/// Who we log in as.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub username: Option<String>,
    pub team_id: Option<String>,
}

/// Team selected after authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamContext {
    pub team_id: String,
    pub in_house: bool,
}

/// Freshly generated CSR and the private key that signed it.
///
/// The key never leaves the process except through the cache's `.p12` file.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningRequest {
    csr_pem: String,
    private_key_pem: String,
}

impl SigningRequest {
    /// Generate an ECDSA P-256 key pair and a CSR for `common_name`
    pub fn generate(common_name: &str) -> Result<Self> {
        use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

        let key_pair =
            KeyPair::generate().map_err(|e| CertError::CsrGeneration(format!("key pair: {e}")))?;
        let private_key_pem = key_pair.serialize_pem();

        let mut params = CertificateParams::new(Vec::<String>::new())
            .map_err(|e| CertError::CsrGeneration(e.to_string()))?;
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        params.distinguished_name = dn;

        let csr_pem = params
            .serialize_request(&key_pair)
            .and_then(|csr| csr.pem())
            .map_err(|e| CertError::CsrGeneration(e.to_string()))?;

        Ok(Self {
            csr_pem,
            private_key_pem,
        })
    }

    pub fn csr_pem(&self) -> &str {
        &self.csr_pem
    }

    pub fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }
}
