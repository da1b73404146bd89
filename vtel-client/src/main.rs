//! vtel - command-line access to the VTEL dashboard backend
//!
//! Issues API calls through the same dispatcher the dashboard views use.
//!
//! ```text
//! vtel endpoints
//! vtel call GET contacts
//! vtel call GET invoice --id 42
//! vtel call POST contacts --data '{"name": "Ada", "phone": "+15550100"}'
//! vtel --target production call GET /reports -H 'Accept-Language: fr'
//! vtel config
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};
use vtel_client::{ApiDispatcher, RequestOptions, ResponseType};
use vtel_common::api::{ApiError, HttpMethod};
use vtel_common::config::{ApiTarget, ClientConfig, ConfigOverrides, TomlConfig};
use vtel_common::endpoints;

#[derive(Parser, Debug)]
#[command(name = "vtel", version, about = "VTEL dashboard API client")]
struct Cli {
    /// Path to config.toml (default: platform config directory)
    #[arg(long, global = true, env = "VTEL_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL override
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Backend target: local, proxy or production
    #[arg(long, global = true)]
    target: Option<ApiTarget>,

    /// Static bearer token override
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List logical endpoints
    Endpoints,

    /// Call the API and print the response payload
    Call {
        /// GET, POST, PUT, PATCH or DELETE
        method: HttpMethod,

        /// Registry name (see `vtel endpoints`) or literal path
        endpoint: String,

        /// Record id for parameterized endpoints
        #[arg(long)]
        id: Option<String>,

        /// JSON request body (POST, PUT, PATCH)
        #[arg(long)]
        data: Option<String>,

        /// Extra header, `Name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Print the body as text instead of parsing JSON
        #[arg(long)]
        raw: bool,
    },

    /// Show the resolved configuration
    Config,
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Subscriber writing to `writer`, with a filter that can be swapped later
fn build_subscriber<W>(
    filter: EnvFilter,
    writer: W,
) -> (impl Subscriber + Send + Sync + 'static, FilterHandle)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer));
    (subscriber, handle)
}

/// Install the global subscriber before anything else logs
fn init_tracing() -> FilterHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (subscriber, handle) = build_subscriber(filter, std::io::stderr);
    subscriber.init();
    handle
}

fn configured_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|e| {
        warn!("Invalid logging level '{}': {}, keeping info", level, e);
        EnvFilter::new("info")
    })
}

/// Switch to the configured level unless `RUST_LOG` already chose one
fn apply_log_level(handle: &FilterHandle, level: &str) {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return;
    }
    if let Err(e) = handle.reload(configured_filter(level)) {
        warn!("Failed to apply logging level: {}", e);
    }
}

/// Resolve a registry name or literal path to a concrete path
fn resolve_endpoint(endpoint: &str, id: Option<&str>) -> Result<String> {
    match endpoints::find(endpoint) {
        Some(def) => def
            .resolve(id)
            .ok_or_else(|| anyhow!("Endpoint '{}' requires --id", def.name)),
        None if endpoint.starts_with('/') || endpoint.contains("://") => Ok(endpoint.to_string()),
        None => Err(anyhow!(
            "Unknown endpoint '{}' (use a registry name or a path starting with '/')",
            endpoint
        )),
    }
}

/// Parse `Name: value`
fn parse_header(line: &str) -> Result<(&str, &str)> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| anyhow!("Header must be 'Name: value', got '{}'", line))?;
    Ok((name.trim(), value.trim()))
}

fn print_endpoints() {
    for def in endpoints::ENDPOINTS {
        println!("{:<18} {:<28} {}", def.name, def.template(), def.description);
    }
}

fn print_config(config: &ClientConfig) {
    let token = match config.token.current() {
        Some(_) => "<set>",
        None => "<none>",
    };
    println!("target:         {}", config.target);
    println!("base_url:       {}", config.base_url);
    println!("timeout_ms:     {}", config.timeout.as_millis());
    println!("debounce_ms:    {}", config.debounce_delay.as_millis());
    println!("token:          {}", token);
    match config.token.session_file() {
        Some(path) => println!("session_file:   {}", path.display()),
        None => println!("session_file:   <none>"),
    }
    println!("log_level:      {}", config.log_level);
}

fn report_api_error(error: &ApiError) {
    match error {
        ApiError::Status { status, body } => {
            eprintln!("Request failed with status {}", status);
            let rendered = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
            eprintln!("{}", rendered);
        }
        other => eprintln!("Request failed: {}", other),
    }
}

async fn run_call(
    config: &ClientConfig,
    method: HttpMethod,
    endpoint: &str,
    id: Option<&str>,
    data: Option<&str>,
    headers: &[String],
    raw: bool,
) -> Result<ExitCode> {
    let path = resolve_endpoint(endpoint, id)?;

    let data: Option<Value> = data
        .map(serde_json::from_str)
        .transpose()
        .context("--data is not valid JSON")?;

    let mut options = RequestOptions::new();
    for line in headers {
        let (name, value) = parse_header(line)?;
        options = options.try_header(name, value)?;
    }
    if raw {
        options = options.response_type(ResponseType::Text);
    }

    let dispatcher = ApiDispatcher::from_config(config)?;
    debug!(method = %method, path = %path, "Dispatching");

    match dispatcher.call(&path, method, data, options).await {
        Ok(Value::String(text)) if raw => {
            println!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
        Ok(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report_api_error(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let log_filter = init_tracing();

    let cli = Cli::parse();
    info!("vtel v{}", env!("CARGO_PKG_VERSION"));

    let toml_config = TomlConfig::load_or_default(cli.config.as_deref())?;
    apply_log_level(&log_filter, &toml_config.logging.level);

    let overrides = ConfigOverrides {
        base_url: cli.base_url,
        target: cli.target,
        token: cli.token,
    };

    match cli.command {
        Command::Endpoints => {
            print_endpoints();
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            let config = ClientConfig::resolve(&toml_config, &overrides)?;
            print_config(&config);
            Ok(ExitCode::SUCCESS)
        }
        Command::Call {
            method,
            endpoint,
            id,
            data,
            headers,
            raw,
        } => {
            let config = ClientConfig::resolve(&toml_config, &overrides)?;
            run_call(
                &config,
                method,
                &endpoint,
                id.as_deref(),
                data.as_deref(),
                &headers,
                raw,
            )
            .await
        }
    }
}
