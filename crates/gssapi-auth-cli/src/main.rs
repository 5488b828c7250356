//! GSSAPI Auth Backend CLI
//!
//! Produces login requests from the caller's Kerberos ticket cache and runs
//! the backend's login and renewal paths locally against a configuration
//! file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gssapi_auth_core::auth::SecurityContextProvider;
use gssapi_auth_core::backend::BACKEND_HELP;
use gssapi_auth_core::config::{AuthConfig, BackendConfig, ClientConfig, LoggingConfig};
use gssapi_auth_core::lease::{LeaseDefaults, RenewalHandler, SessionCredential, TokenIssuer};
use gssapi_auth_core::{login_path, ContextInitiator, ErrorResponse, GssapiBackend, LoginRequest};

/// GSSAPI auth backend tool.
#[derive(Parser)]
#[command(name = "gssapi-auth")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a login request from the local ticket cache (run `kinit` first).
    Token {
        /// Server address; the service name is derived from its host.
        #[arg(long)]
        address: String,

        /// Explicit service principal; overrides the derived name.
        #[arg(long = "service-name", alias = "servicename")]
        service_name: Option<String>,

        /// Mount point of the auth method.
        #[arg(long)]
        mount: Option<String>,
    },

    /// Validate a login token with the configured keytab and print the credential.
    Login {
        /// Base64 token as produced by `token`.
        #[arg(long)]
        token: String,
    },

    /// Renew a serialized session credential.
    Renew {
        /// File holding the credential JSON.
        #[arg(long)]
        credential: PathBuf,
    },

    /// Check the configuration file and print the derived settings.
    Validate,

    /// Print the auth method help text.
    Info,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    // Load configuration
    let config = args
        .config
        .as_deref()
        .map(|path| {
            AuthConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))
        })
        .transpose()?;

    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();

    // Override log level from verbosity flag
    let log_config = match args.verbose {
        0 => logging,
        1 => LoggingConfig {
            level: "debug".to_string(),
            ..logging
        },
        _ => LoggingConfig {
            level: "trace".to_string(),
            ..logging
        },
    };

    // Setup tracing
    setup_tracing(&log_config);

    info!(version = env!("CARGO_PKG_VERSION"), "gssapi-auth starting");

    // Providers are built before the runtime: selecting a keytab writes
    // process environment, which must not race with worker threads.
    match args.command {
        Command::Token {
            address,
            service_name,
            mount,
        } => {
            let client = config.map(|c| c.client).unwrap_or_default();
            let provider = provider(None)?;
            runtime()?.block_on(token(provider, client, &address, service_name, mount))
        }
        Command::Login { token } => {
            let config = require(config)?;
            let provider = provider(Some(&config.backend))?;
            runtime()?.block_on(login(provider, &config, &token))
        }
        Command::Renew { credential } => renew(&require(config)?, &credential),
        Command::Validate => validate(&require(config)?),
        Command::Info => {
            println!("{BACKEND_HELP}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn setup_tracing(config: &LoggingConfig) {
    let level = match config.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::registry().with(filter);

    // stdout carries command output
    if config.json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn require(config: Option<AuthConfig>) -> anyhow::Result<AuthConfig> {
    config.context("this command needs --config")
}

/// Kerberos provider; with `backend` set, its acceptor uses the configured keytab.
#[cfg(feature = "gssapi")]
fn provider(backend: Option<&BackendConfig>) -> anyhow::Result<Arc<dyn SecurityContextProvider>> {
    use gssapi_auth_core::Krb5Provider;

    Ok(Arc::new(
        backend.map_or_else(Krb5Provider::new, Krb5Provider::from_config),
    ))
}

#[cfg(not(feature = "gssapi"))]
fn provider(_backend: Option<&BackendConfig>) -> anyhow::Result<Arc<dyn SecurityContextProvider>> {
    anyhow::bail!("built without the `gssapi` feature; no Kerberos provider available")
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_error(err: &ErrorResponse) -> anyhow::Result<ExitCode> {
    print_json(err)?;
    Ok(ExitCode::FAILURE)
}

async fn token(
    provider: Arc<dyn SecurityContextProvider>,
    mut client: ClientConfig,
    address: &str,
    service_name: Option<String>,
    mount: Option<String>,
) -> anyhow::Result<ExitCode> {
    if service_name.is_some() {
        client.service_name = service_name;
    }
    if let Some(mount) = mount {
        client.mount = mount;
    }

    let initiator = ContextInitiator::from_config(provider, &client);
    match initiator
        .authenticate(client.service_name.as_deref(), address)
        .await
    {
        Ok(token) => {
            print_json(&json!({
                "path": login_path(Some(&client.mount)),
                "data": LoginRequest::new(token),
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => print_error(&ErrorResponse::from(e)),
    }
}

async fn login(
    provider: Arc<dyn SecurityContextProvider>,
    config: &AuthConfig,
    token: &str,
) -> anyhow::Result<ExitCode> {
    let backend = GssapiBackend::from_config(provider, &config.backend)?;

    match backend.handle_login(&LoginRequest::new(token)).await {
        Ok(response) => {
            print_json(&response)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => print_error(&e),
    }
}

fn renew(config: &AuthConfig, path: &Path) -> anyhow::Result<ExitCode> {
    config.backend.validate()?;

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let credential: SessionCredential =
        serde_json::from_str(&raw).context("invalid credential JSON")?;

    let increment = LeaseDefaults::from(&config.backend.lease).increment;
    let handler = RenewalHandler::new(Arc::new(TokenIssuer), increment);

    match handler.renew(&credential) {
        Ok(renewed) => {
            print_json(&renewed)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => print_error(&ErrorResponse::from(e)),
    }
}

fn validate(config: &AuthConfig) -> anyhow::Result<ExitCode> {
    config.validate()?;

    let lease = LeaseDefaults::from(&config.backend.lease);
    print_json(&json!({
        "service_principal": config.backend.service_principal(),
        "keytab_path": config.backend.keytab_path(),
        "default_policies": config.backend.default_policies,
        "lease": {
            "ttl_secs": lease.ttl.as_secs(),
            "max_ttl_secs": lease.max_ttl.as_secs(),
            "renew_increment_secs": lease.increment.as_secs(),
        },
        "login_path": login_path(Some(&config.client.mount)),
    }))?;
    Ok(ExitCode::SUCCESS)
}
