//! Certificate reconciliation: reuse an installed or cached certificate, or
//! issue a new one
//!
//! Discovery walks the authority's certificates in the order they are
//! returned. The first one that is installed, or whose private key sits in the
//! cache, wins. Certificates with neither have their downloaded `.cer`
//! removed, since a certificate without its key cannot sign anything.

use crate::authority::RemoteAuthority;
use crate::cache::CertificateCache;
use crate::certificate::{Certificate, CertificateClass, Identity, SigningRequest};
use crate::config::CertConfig;
use crate::error::{CertError, Result};
use crate::keychain::CredentialStore;
use crate::output::verbose;
use crate::error as error_msg;
use std::path::PathBuf;

/// Certificate selected or created by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub certificate_id: String,
    /// Absolute path of the `.cer` file
    pub certificate_path: PathBuf,
}

pub struct CertificateReconciler<A, S> {
    authority: A,
    store: S,
}

impl<A: RemoteAuthority, S: CredentialStore> CertificateReconciler<A, S> {
    pub fn new(authority: A, store: S) -> Self {
        Self { authority, store }
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reconcile, then check the result is actually installed.
    ///
    /// An import that silently did not take effect fails with
    /// [`CertError::VerificationFailure`].
    pub async fn launch(&self, config: &CertConfig) -> Result<Reconciled> {
        let reconciled = self.reconcile(config).await?;
        self.verify_installed(&reconciled).await?;
        Ok(reconciled)
    }

    pub async fn verify_installed(&self, reconciled: &Reconciled) -> Result<()> {
        if self.store.is_installed(&reconciled.certificate_path).await? {
            Ok(())
        } else {
            Err(CertError::VerificationFailure {
                certificate_id: reconciled.certificate_id.clone(),
                path: reconciled.certificate_path.clone(),
            })
        }
    }

    pub async fn reconcile(&self, config: &CertConfig) -> Result<Reconciled> {
        let cache = CertificateCache::new(&config.output_path)?;
        cache.ensure_dir().await?;

        let identity = Identity {
            username: config.username.clone(),
            team_id: config.team_id.clone(),
        };
        info!(
            "Starting login with user '{}'",
            identity.username.as_deref().unwrap_or("API key")
        );
        let team = self.authority.authenticate(&identity).await?;
        if team.team_id.trim().is_empty() {
            return Err(CertError::AuthFailure(
                "No team could be selected for this account".to_string(),
            ));
        }
        success!("Successfully logged in (team {})", team.team_id);

        let class = CertificateClass::resolve(config.development, team.in_house);
        verbose(config.verbose, &format!("Active certificate class: {class}"));

        if !config.force {
            if let Some(found) = self.find_existing(&cache, class, config.verbose).await? {
                return Ok(found);
            }
        } else {
            verbose(config.verbose, "force is set, skipping discovery");
        }

        if config.skip_create {
            return Err(CertError::NoUsableCertificate {
                class,
                output_path: cache.dir().to_path_buf(),
            });
        }

        self.create(&cache, class, config).await
    }

    /// First usable certificate of `class`, pruning unusable `.cer` files
    async fn find_existing(
        &self,
        cache: &CertificateCache,
        class: CertificateClass,
        verbose_enabled: bool,
    ) -> Result<Option<Reconciled>> {
        let certificates = self.authority.list_certificates(class).await?;
        verbose(
            verbose_enabled,
            &format!("Authority lists {} {class} certificate(s)", certificates.len()),
        );

        for certificate in &certificates {
            // The installed check compares file content, so fetch it first
            let path = self.store_certificate(cache, certificate).await?;

            if self.store.is_installed(&path).await? {
                success!(
                    "Found the certificate {} ({}) which is installed on the local machine. Using this one.",
                    certificate.id,
                    certificate.name
                );
                return Ok(Some(reconciled(certificate, path)));
            }

            if cache.has_private_key(&certificate.id).await? {
                self.store
                    .import(&cache.private_key_path(&certificate.id))
                    .await?;
                self.store.import(&path).await?;
                success!(
                    "Found the cached certificate {} ({}). Using this one.",
                    certificate.id,
                    certificate.name
                );
                return Ok(Some(reconciled(certificate, path)));
            }

            info!(
                "Certificate {} ({}) can't be found on your local computer",
                certificate.id, certificate.name
            );
            cache.remove_certificate(&certificate.id).await?;
        }

        info!("Couldn't find an existing certificate... creating a new one");
        Ok(None)
    }

    async fn create(
        &self,
        cache: &CertificateCache,
        class: CertificateClass,
        config: &CertConfig,
    ) -> Result<Reconciled> {
        verbose(config.verbose, "Generating certificate signing request");
        let request = SigningRequest::generate(&config.common_name)?;

        info!("Requesting a new {class} certificate...");
        let certificate = self
            .authority
            .create_certificate(class, request.csr_pem())
            .await
            .map_err(|e| {
                let err = CertError::from_creation_rejection(class, e);
                if matches!(err, CertError::QuotaExceeded { .. }) {
                    error_msg!(
                        "Could not create another certificate, reached the maximum number of available certificates."
                    );
                }
                err
            })?;

        let csr_path = cache
            .write_signing_request(&certificate.id, request.csr_pem())
            .await?;
        let key_path = cache
            .write_private_key(&certificate.id, request.private_key_pem())
            .await?;
        drop(request);
        let cert_path = self.store_certificate(cache, &certificate).await?;
        verbose(
            config.verbose,
            &format!(
                "Wrote {}, {} and {}",
                csr_path.display(),
                key_path.display(),
                cert_path.display()
            ),
        );

        self.store.import(&key_path).await?;
        self.store.import(&cert_path).await?;

        success!(
            "Successfully generated {} which was imported to the local machine.",
            certificate.id
        );
        Ok(reconciled(&certificate, cert_path))
    }

    /// Download the certificate and write it to `<id>.cer`
    async fn store_certificate(
        &self,
        cache: &CertificateCache,
        certificate: &Certificate,
    ) -> Result<PathBuf> {
        let der = self.authority.download(certificate).await?;
        cache.write_certificate(&certificate.id, &der).await
    }
}

fn reconciled(certificate: &Certificate, path: PathBuf) -> Reconciled {
    Reconciled {
        certificate_id: certificate.id.clone(),
        certificate_path: path,
    }
}
