//! Configuration for certificate reconciliation.

use crate::error::{CertError, Result};
use crate::keychain::DEFAULT_KEYCHAIN;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Common name written into generated signing requests
pub const DEFAULT_COMMON_NAME: &str = "Kodegen Code Signing";

/// What one reconciliation run needs to know.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertConfig {
    /// Directory holding `<id>.cer`, `<id>.p12` and `<id>.certSigningRequest`
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Skip discovery and always issue a new certificate
    #[serde(default)]
    pub force: bool,

    /// Operate on development certificates instead of production
    #[serde(default)]
    pub development: bool,

    /// Fail instead of issuing a certificate when none can be reused
    #[serde(default)]
    pub skip_create: bool,

    /// Account shown in logs
    #[serde(default)]
    pub username: Option<String>,

    /// Team to select; falls back to `CERT_TEAM_ID`
    #[serde(default)]
    pub team_id: Option<String>,

    #[serde(default = "default_common_name")]
    pub common_name: String,

    #[serde(default = "default_keychain")]
    pub keychain: String,

    #[serde(default)]
    pub api: Option<ApiCredentials>,

    #[serde(default)]
    pub verbose: bool,
}

/// App Store Connect API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCredentials {
    pub issuer_id: String,
    pub key_id: String,
    pub private_key_path: PathBuf,
    /// Use the Apple Enterprise Program API (in-house account)
    #[serde(default)]
    pub enterprise: bool,
}

impl Default for CertConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            force: false,
            development: false,
            skip_create: false,
            username: None,
            team_id: None,
            common_name: default_common_name(),
            keychain: default_keychain(),
            api: None,
            verbose: false,
        }
    }
}

impl CertConfig {
    /// Parse a TOML config file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CertError::io(path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `~/.config/kodegen/cert.toml`, if a config dir exists
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("kodegen").join("cert.toml"))
    }

    /// Fill unset values from the environment.
    ///
    /// - `CERT_TEAM_ID` for the team
    /// - `APPLE_API_KEY`, `APPLE_API_ISSUER`, `APPLE_API_KEY_PATH` for the API key
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// [`apply_env`](Self::apply_env) with a caller supplied lookup
    pub fn apply_env_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.team_id.is_none() {
            self.team_id = var("CERT_TEAM_ID").filter(|t| !t.is_empty());
        }

        if self.api.is_none()
            && let (Some(key_id), Some(issuer_id), Some(key_path)) = (
                var("APPLE_API_KEY"),
                var("APPLE_API_ISSUER"),
                var("APPLE_API_KEY_PATH"),
            )
        {
            self.api = Some(ApiCredentials {
                issuer_id,
                key_id,
                private_key_path: key_path.into(),
                enterprise: false,
            });
        }
    }

    /// Reject contradictory settings and expand `~` in paths
    pub fn validate(&mut self) -> Result<()> {
        if self.force && self.skip_create {
            return Err(CertError::InvalidConfig(
                "`force` and `skip_create` cannot both be set".to_string(),
            ));
        }

        self.output_path = expand_tilde_path(&self.output_path.to_string_lossy())?.into();

        let api = self.api.as_mut().ok_or_else(|| {
            CertError::MissingConfig(
                "App Store Connect API key (issuer_id, key_id, private_key_path)".to_string(),
            )
        })?;
        api.private_key_path = expand_tilde_path(&api.private_key_path.to_string_lossy())?.into();

        Ok(())
    }

    /// Rows for the run summary; the output path is left out
    pub fn summary_rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("force", self.force.to_string()),
            ("development", self.development.to_string()),
            ("skip_create", self.skip_create.to_string()),
            (
                "username",
                self.username.clone().unwrap_or_else(|| "-".to_string()),
            ),
            (
                "team_id",
                self.team_id.clone().unwrap_or_else(|| "-".to_string()),
            ),
            ("keychain", self.keychain.clone()),
        ];
        if let Some(api) = &self.api {
            rows.push(("key_id", api.key_id.clone()));
            rows.push(("enterprise", api.enterprise.to_string()));
        }
        rows
    }
}

/// Expand tilde in path, returning error if HOME is not set
pub fn expand_tilde_path(path: &str) -> Result<String> {
    let expanded = shellexpand::tilde(path).to_string();

    // When HOME is unset, shellexpand leaves ~ unchanged
    if path.starts_with('~') && expanded.starts_with('~') {
        return Err(CertError::InvalidConfig(
            "Could not expand ~ in path (HOME environment variable not set).\n\
             Please use absolute path instead."
                .to_string(),
        ));
    }

    Ok(expanded)
}

fn default_output_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_common_name() -> String {
    DEFAULT_COMMON_NAME.to_string()
}

fn default_keychain() -> String {
    DEFAULT_KEYCHAIN.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = CertConfig::from_toml(
            r#"
            [api]
            issuer_id = "12345678-1234-1234-1234-123456789012"
            key_id = "AB12CD34EF"
            private_key_path = "/keys/AuthKey_AB12CD34EF.p8"
            "#,
        )
        .expect("parse");

        assert_eq!(config.output_path, PathBuf::from("."));
        assert!(!config.force);
        assert!(!config.development);
        assert_eq!(config.keychain, DEFAULT_KEYCHAIN);
        assert_eq!(config.common_name, DEFAULT_COMMON_NAME);
        assert!(!config.api.expect("api section").enterprise);
    }

    #[test]
    fn env_fills_only_missing_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CERT_TEAM_ID", "ENVTEAM"),
            ("APPLE_API_KEY", "AB12CD34EF"),
            ("APPLE_API_ISSUER", "12345678-1234-1234-1234-123456789012"),
            ("APPLE_API_KEY_PATH", "/keys/key.p8"),
        ]);
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());

        let mut config = CertConfig::default();
        config.apply_env_from(lookup);
        assert_eq!(config.team_id.as_deref(), Some("ENVTEAM"));
        assert_eq!(
            config.api.as_ref().map(|a| a.key_id.as_str()),
            Some("AB12CD34EF")
        );

        let mut config = CertConfig {
            team_id: Some("CLITEAM".to_string()),
            ..CertConfig::default()
        };
        config.apply_env_from(lookup);
        assert_eq!(config.team_id.as_deref(), Some("CLITEAM"));
    }

    #[test]
    fn force_and_skip_create_conflict() {
        let mut config = CertConfig {
            force: true,
            skip_create: true,
            ..CertConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CertError::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_api_key_is_reported() {
        let mut config = CertConfig::default();
        assert!(matches!(config.validate(), Err(CertError::MissingConfig(_))));
    }

    #[test]
    fn summary_hides_output_path() {
        let config = CertConfig {
            output_path: PathBuf::from("/secret/place"),
            ..CertConfig::default()
        };
        let rows = config.summary_rows();
        assert!(rows.iter().all(|(k, v)| *k != "output_path" && !v.contains("/secret")));
    }
}
