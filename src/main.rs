use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

use kodegen_bundler_cert::config::{ApiCredentials, CertConfig};
use kodegen_bundler_cert::{
    AppStoreConnectClient, CertError, CertificateReconciler, KeychainStore, keychain, output,
};

// Colored output errors are ignored with `let _ =`; file, process and API
// errors are propagated with `?`.

#[derive(Parser)]
#[command(name = "kodegen_cert")]
#[command(version, about = "Create or reuse a code signing certificate")]
struct Cli {
    /// Path to config file (TOML); defaults to ~/.config/kodegen/cert.toml
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Directory for .cer, .p12 and .certSigningRequest files
    #[arg(long, short = 'o')]
    output_path: Option<PathBuf>,

    /// Create a new certificate even if a usable one exists
    #[arg(long, conflicts_with = "skip_create")]
    force: bool,

    /// Use a development certificate instead of production
    #[arg(long)]
    development: bool,

    /// Fail instead of creating a certificate when none can be reused
    #[arg(long)]
    skip_create: bool,

    /// Account name shown in output
    #[arg(long, short = 'u')]
    username: Option<String>,

    /// Team ID (defaults to `CERT_TEAM_ID` env var)
    #[arg(long)]
    team_id: Option<String>,

    /// App Store Connect Issuer ID
    #[arg(long, requires_all = ["key_id", "private_key"])]
    issuer_id: Option<String>,

    /// App Store Connect Key ID
    #[arg(long, requires_all = ["issuer_id", "private_key"])]
    key_id: Option<String>,

    /// Path to .p8 private key file
    #[arg(long, requires_all = ["issuer_id", "key_id"])]
    private_key: Option<PathBuf>,

    /// Account is an Apple Enterprise (in-house) account
    #[arg(long)]
    enterprise: bool,

    /// Keychain to import into
    #[arg(long)]
    keychain: Option<String>,

    /// Verbose output
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli).await?;

    output::print_table(
        &format!("Summary for kodegen_cert {}", env!("CARGO_PKG_VERSION")),
        &config.summary_rows(),
    );

    if !cfg!(target_os = "macos") {
        return Err(CertError::UnsupportedPlatform(format!(
            "{} (the keychain is only available on macOS)",
            std::env::consts::OS
        ))
        .into());
    }

    keychain::check_dependencies().await?;

    let Some(api) = config.api.as_ref() else {
        return Err(CertError::MissingConfig("App Store Connect API key".to_string()).into());
    };
    let client = AppStoreConnectClient::new(
        &api.key_id,
        &api.issuer_id,
        &api.private_key_path,
        api.enterprise,
    )
    .await?;
    let store = KeychainStore::new(config.keychain.clone());

    let reconciler = CertificateReconciler::new(client, store);
    let reconciled = match reconciler.launch(&config).await {
        Ok(r) => r,
        Err(e) => {
            kodegen_bundler_cert::error!("{e}");
            std::process::exit(1);
        }
    };

    let bufwtr = BufferWriter::stdout(ColorChoice::Auto);
    let mut buffer = bufwtr.buffer();
    let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
    let _ = writeln!(&mut buffer, "\n✅ Certificate ready");
    let _ = buffer.reset();
    let _ = writeln!(&mut buffer, "CER_CERTIFICATE_ID={}", reconciled.certificate_id);
    let _ = writeln!(
        &mut buffer,
        "CER_FILE_PATH={}",
        reconciled.certificate_path.display()
    );
    let _ = bufwtr.print(&buffer);

    Ok(())
}

/// Config file first, then command line flags, then environment fallbacks
async fn load_config(cli: Cli) -> Result<CertConfig> {
    let config = match &cli.config {
        Some(path) => CertConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => match CertConfig::default_path() {
            Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
                CertConfig::load(&path).await?
            }
            _ => CertConfig::default(),
        },
    };

    let mut config = layer_config(config, cli, |name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

/// Apply flags over file values, fill gaps from `env`, then `--enterprise`.
///
/// `--enterprise` goes last so it also reaches credentials that only came
/// from the environment.
fn layer_config(
    mut config: CertConfig,
    cli: Cli,
    env: impl Fn(&str) -> Option<String>,
) -> CertConfig {
    if let Some(output_path) = cli.output_path {
        config.output_path = output_path;
    }
    config.force |= cli.force;
    config.development |= cli.development;
    config.skip_create |= cli.skip_create;
    config.verbose |= cli.verbose;
    if cli.username.is_some() {
        config.username = cli.username;
    }
    if cli.team_id.is_some() {
        config.team_id = cli.team_id;
    }
    if let Some(keychain) = cli.keychain {
        config.keychain = keychain;
    }
    if let (Some(issuer_id), Some(key_id), Some(private_key_path)) =
        (cli.issuer_id, cli.key_id, cli.private_key)
    {
        config.api = Some(ApiCredentials {
            issuer_id,
            key_id,
            private_key_path,
            enterprise: false,
        });
    }

    config.apply_env_from(env);

    if cli.enterprise
        && let Some(api) = config.api.as_mut()
    {
        api.enterprise = true;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const ISSUER: &str = "12345678-1234-1234-1234-123456789012";

    fn env_credentials() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("APPLE_API_KEY", "AB12CD34EF"),
            ("APPLE_API_ISSUER", ISSUER),
            ("APPLE_API_KEY_PATH", "/keys/AuthKey_AB12CD34EF.p8"),
        ])
    }

    fn enterprise_of(config: &CertConfig) -> Option<bool> {
        config.api.as_ref().map(|a| a.enterprise)
    }

    #[test]
    fn enterprise_flag_applies_to_env_credentials() {
        let env = env_credentials();
        let cli = Cli::parse_from(["kodegen_cert", "--enterprise"]);

        let config = layer_config(CertConfig::default(), cli, |n| {
            env.get(n).map(|v| v.to_string())
        });

        assert_eq!(enterprise_of(&config), Some(true));
        assert_eq!(
            config.api.as_ref().map(|a| a.key_id.as_str()),
            Some("AB12CD34EF")
        );
    }

    #[test]
    fn enterprise_flag_applies_to_cli_credentials() {
        let cli = Cli::parse_from([
            "kodegen_cert",
            "--issuer-id",
            ISSUER,
            "--key-id",
            "ZZ12CD34EF",
            "--private-key",
            "/keys/cli.p8",
            "--enterprise",
        ]);

        let config = layer_config(CertConfig::default(), cli, |_| None);

        assert_eq!(enterprise_of(&config), Some(true));
        assert_eq!(
            config.api.as_ref().map(|a| a.key_id.as_str()),
            Some("ZZ12CD34EF")
        );
    }

    #[test]
    fn file_credentials_win_over_env_and_keep_enterprise() {
        let file = CertConfig::from_toml(&format!(
            r#"
            output_path = "/certs"
            [api]
            issuer_id = "{ISSUER}"
            key_id = "FILE34CD56"
            private_key_path = "/keys/file.p8"
            enterprise = true
            "#
        ))
        .expect("parse");
        let env = env_credentials();
        let cli = Cli::parse_from(["kodegen_cert", "--development", "--team-id", "CLITEAM"]);

        let config = layer_config(file, cli, |n| env.get(n).map(|v| v.to_string()));

        assert_eq!(
            config.api.as_ref().map(|a| a.key_id.as_str()),
            Some("FILE34CD56")
        );
        assert_eq!(enterprise_of(&config), Some(true));
        assert!(config.development);
        assert_eq!(config.team_id.as_deref(), Some("CLITEAM"));
        assert_eq!(config.output_path, PathBuf::from("/certs"));
    }

    #[test]
    fn without_flag_env_credentials_stay_standard() {
        let env = env_credentials();
        let cli = Cli::parse_from(["kodegen_cert", "--output-path", "/out"]);

        let config = layer_config(CertConfig::default(), cli, |n| {
            env.get(n).map(|v| v.to_string())
        });

        assert_eq!(enterprise_of(&config), Some(false));
        assert_eq!(config.output_path, PathBuf::from("/out"));
    }
}
