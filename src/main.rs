//! WMS pipeline command-line client.
//!
//! Issues requests against the WMS backend through the resilient pipeline:
//! token injection, disguised-error detection, safe-read retries and the
//! long-transfer audit trail all apply exactly as they do for the console.
//!
//! ```text
//! wms-pipeline --config pipeline.toml --token $TOKEN get /api/v1/inventory/ -q page=2 --retry 3
//! wms-pipeline --config pipeline.toml download /api/v1/warehouse/2/backup/ --out backup.zip
//! wms-pipeline login --username admin --password secret
//! wms-pipeline --config pipeline.toml audit
//! ```

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use wms_pipeline::config::{load_config, ConfigWatcher, PipelineConfig};
use wms_pipeline::observability::{init_logging, init_metrics};
use wms_pipeline::{Payload, Pipeline, PipelineResult, RequestDescriptor, ResponseKind, TokenStore};

#[derive(Parser)]
#[command(name = "wms-pipeline")]
#[command(about = "Command-line client for the WMS request pipeline", long_about = None)]
struct Cli {
    /// Pipeline configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `transport.base_url`.
    #[arg(long)]
    base_url: Option<String>,

    /// Bearer token for the session.
    #[arg(long)]
    token: Option<String>,

    /// Reload the configuration file when it changes.
    #[arg(long)]
    watch: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a JSON resource and print it
    Get {
        path: String,
        /// Query parameter as key=value; repeatable, order is kept
        #[arg(short, long = "query", value_parser = parse_query)]
        query: Vec<(String, String)>,
        /// Retries after network failures
        #[arg(long)]
        retry: Option<u32>,
        #[arg(long, default_value_t = 1000)]
        retry_delay_ms: u64,
    },
    /// Download a binary artifact (backups, exports)
    Download {
        path: String,
        #[arg(short, long)]
        out: PathBuf,
        #[arg(short, long = "query", value_parser = parse_query)]
        query: Vec<(String, String)>,
        #[arg(long)]
        retry: Option<u32>,
        #[arg(long, default_value_t = 1000)]
        retry_delay_ms: u64,
    },
    /// Log in and print the session token
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
        #[arg(long, default_value = "/api/v1/user/login/")]
        path: String,
    },
    /// Print the persisted audit log
    Audit,
}

fn parse_query(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))?;
    if key.is_empty() {
        return Err(format!("empty key in `{}`", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

fn build_get(path: String, query: Vec<(String, String)>, retry: Option<u32>, delay_ms: u64) -> RequestDescriptor {
    let mut descriptor = query
        .into_iter()
        .fold(RequestDescriptor::get(path), |d, (k, v)| d.query(k, v));
    if let Some(max_attempts) = retry {
        descriptor = descriptor.retry(max_attempts, delay_ms);
    }
    descriptor
}

/// Dispatch, cancelling the request on Ctrl+C.
async fn dispatch_interruptible(pipeline: &Pipeline, descriptor: RequestDescriptor) -> PipelineResult<Payload> {
    let id = descriptor.id;
    let request = pipeline.dispatch(descriptor);
    tokio::pin!(request);

    tokio::select! {
        result = &mut request => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(request_id = %id, "Received SIGINT, cancelling request");
            pipeline.cancel(id);
            request.await
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.transport.base_url = base_url.clone();
    }

    init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.transport.base_url,
        "wms-pipeline starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let session = Arc::new(match &cli.token {
        Some(token) => TokenStore::with_token(token.clone()),
        None => TokenStore::new(),
    });
    let pipeline = Arc::new(Pipeline::from_config(config, session)?);

    let _watcher = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            pipeline.watch_config(updates);
            Some(handle)
        }
        (None, true) => {
            tracing::warn!("--watch needs --config; not watching");
            None
        }
        _ => None,
    };

    match cli.command {
        Commands::Get {
            path,
            query,
            retry,
            retry_delay_ms,
        } => {
            let descriptor = build_get(path, query, retry, retry_delay_ms);
            match dispatch_interruptible(&pipeline, descriptor).await? {
                Payload::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Payload::Binary(bytes) => std::io::stdout().write_all(&bytes)?,
            }
        }
        Commands::Download {
            path,
            out,
            query,
            retry,
            retry_delay_ms,
        } => {
            let descriptor = build_get(path, query, retry, retry_delay_ms).response_kind(ResponseKind::Binary);
            let bytes = dispatch_interruptible(&pipeline, descriptor).await?.into_bytes();
            tokio::fs::write(&out, &bytes).await?;
            println!("wrote {} bytes to {}", bytes.len(), out.display());
        }
        Commands::Login {
            username,
            password,
            path,
        } => {
            let descriptor = RequestDescriptor::post(path)
                .json(json!({ "username": username, "password": password }));
            let token = pipeline.login(descriptor).await?;
            println!("{}", token);
        }
        Commands::Audit => {
            if pipeline.audit().persist_path().is_none() {
                tracing::warn!("audit.persist_path is not set; only this process's entries are shown");
            }
            for entry in pipeline.audit().read_all() {
                println!("{}", serde_json::to_string(&entry)?);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        assert_eq!(parse_query("page=2"), Ok(("page".into(), "2".into())));
        assert_eq!(parse_query("q=a=b"), Ok(("q".into(), "a=b".into())));
        assert_eq!(parse_query("flag="), Ok(("flag".into(), "".into())));
        assert!(parse_query("novalue").is_err());
        assert!(parse_query("=x").is_err());
    }

    #[test]
    fn test_build_get_keeps_order_and_retry() {
        let d = build_get(
            "/api/v1/inventory/".into(),
            vec![("b".into(), "1".into()), ("a".into(), "2".into())],
            Some(3),
            250,
        );
        assert_eq!(d.query[0].0, "b");
        assert_eq!(d.query[1].0, "a");
        assert_eq!(d.retry.map(|r| (r.max_attempts, r.delay_ms)), Some((3, 250)));
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "wms-pipeline",
            "--token",
            "abc",
            "download",
            "/api/v1/backup/",
            "--out",
            "backup.zip",
        ])
        .unwrap();
        assert_eq!(cli.token.as_deref(), Some("abc"));
        assert!(matches!(cli.command, Commands::Download { .. }));
    }
}
