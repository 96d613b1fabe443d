//! Acquire, cache, and install Apple code signing certificates
//!
//! A run reconciles three places a certificate can live: the App Store
//! Connect API, the local keychain, and an output directory of previously
//! downloaded `.cer`/`.p12` pairs. An existing certificate is reused when it
//! is installed or its key is cached; otherwise a new one is issued.

#[macro_use]
pub mod output;

pub mod apple_api;
pub mod authority;
pub mod cache;
pub mod certificate;
pub mod config;
pub mod error;
pub mod keychain;
pub mod reconciler;

// Re-export common types
pub use apple_api::AppStoreConnectClient;
pub use authority::RemoteAuthority;
pub use cache::CertificateCache;
pub use certificate::{Certificate, CertificateClass, Identity, SigningRequest, TeamContext};
pub use config::{ApiCredentials, CertConfig};
pub use error::{CertError, Result};
pub use keychain::{CredentialStore, KeychainStore};
pub use reconciler::{CertificateReconciler, Reconciled};
