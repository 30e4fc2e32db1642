mod watch;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use http::Method;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use vgate_config::{load_config, FileConfig, LogFormat};
use vgate_core::{load_all, GrantStore, Snapshot};
use vgate_engine::{Dispatch, Engine, InboundRequest, Responder};
use vgate_tracing::{Format, SpanExport};

#[derive(Parser, Debug)]
#[command(version, about = "VGate: API version resolution and path rules")]
struct Args {
    /// Path to config file (yaml/json/toml)
    #[arg(short, long, global = true, default_value = "./vgate.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the configuration and report what would be served.
    Check,
    /// Evaluate a single request and print the decision.
    Resolve {
        #[arg(short, long, default_value = "GET")]
        method: String,
        /// Request path, optionally with a query string.
        #[arg(short, long)]
        path: String,
        /// `name:value`, repeatable.
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
    /// Rebuild the snapshot whenever the data files change, until Ctrl-C.
    Watch,
}

/// Read both data files and build a snapshot carrying its grants.
fn load_state(cfg: &FileConfig) -> Result<Snapshot> {
    let raw = load_all(&cfg.files.specifications, &cfg.files.grants)?;
    let snapshot = Snapshot::build(&raw.specifications.specifications)
        .with_context(|| format!("build snapshot from {}", cfg.files.specifications.display()))?;
    Ok(snapshot.with_grants(GrantStore::from_template(&raw.consumers)))
}

fn parse_header(raw: &str) -> Result<(&str, &str)> {
    raw.split_once(':')
        .map(|(k, v)| (k.trim(), v.trim()))
        .ok_or_else(|| anyhow!("header must be name:value, got {raw:?}"))
}

fn check(cfg: &FileConfig) -> Result<()> {
    let snapshot = load_state(cfg)?;
    let mut specs: Vec<_> = snapshot.specifications().collect();
    specs.sort_by(|a, b| a.listen_path.cmp(&b.listen_path));

    for s in specs {
        let mut versions: Vec<&str> = s.versions.keys().map(String::as_str).collect();
        versions.sort();
        println!(
            "{:<24} {:<20} versioned={:<5} versions=[{}]",
            s.listen_path,
            s.id,
            s.versioning_enabled,
            versions.join(", ")
        );
        if let Some(name) = s.override_conflict() {
            println!("  warning: version {name} overrides the target host on a versioned specification");
        }
    }
    println!("{} specifications, {} caller tokens", snapshot.len(), snapshot.grants().len());
    Ok(())
}

fn resolve(cfg: &FileConfig, method: &str, path: &str, headers: &[String]) -> Result<()> {
    let snapshot = load_state(cfg)?;
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method {method}"))?;

    let mut req = InboundRequest::new(method, path);
    for h in headers {
        let (k, v) = parse_header(h)?;
        req = req.header(k, v).with_context(|| format!("invalid header {h:?}"))?;
    }

    let start = Instant::now();
    let engine = Engine::new(cfg.gateway.auth_header.as_str());
    let decision = engine.evaluate(&snapshot, snapshot.grants(), &req);
    println!("{}", serde_json::to_string_pretty(&decision)?);

    match Responder::new().dispatch(decision, &req.id.to_string(), start) {
        Dispatch::Respond(resp) => println!("status: {}", resp.status()),
        Dispatch::Proxy(target) => println!(
            "proxy: {}{}",
            target.target_host.as_deref().unwrap_or("<upstream>"),
            target.path
        ),
    }
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let file = load_config(&args.config)?;

    let format = match file.gateway.log_format {
        LogFormat::Plain => Format::Plain,
        LogFormat::Pretty => Format::Pretty,
        LogFormat::Json => Format::Json,
    };
    let _guard = vgate_tracing::init(
        file.service_name(),
        SpanExport::from_endpoint(&file.tracing.otlp_endpoint),
        &file.gateway.logging_mode,
        format,
    )?;
    info!(config = %args.config.display(), command = ?args.command, "vgate starting");

    match args.command {
        Command::Check => check(&file),
        Command::Resolve {
            method,
            path,
            headers,
        } => resolve(&file, &method, &path, &headers),
        Command::Watch => watch::run(&file).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_arguments_split_on_first_colon() {
        assert_eq!(parse_header("version: v2").unwrap(), ("version", "v2"));
        assert_eq!(parse_header("x-url:http://a").unwrap(), ("x-url", "http://a"));
        assert!(parse_header("novalue").is_err());
    }

    #[test]
    fn cli_parses_resolve() {
        let args = Args::try_parse_from([
            "vgate", "resolve", "-c", "cfg.yaml", "-p", "/mock", "-H", "version:v2", "-H", "authorization:k",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("cfg.yaml"));
        match args.command {
            Command::Resolve { method, path, headers } => {
                assert_eq!(method, "GET");
                assert_eq!(path, "/mock");
                assert_eq!(headers.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
