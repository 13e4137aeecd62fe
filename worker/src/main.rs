use anyhow::{anyhow, Result};
use clap::Parser;
use common::{apps, Endpoint};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use worker::{Worker, WorkerConfig};

#[derive(Parser)]
#[command(name = "worker")]
#[command(about = "Worker map/reduce: pide tareas al coordinator hasta que no haya más")]
struct Cli {
    /// Aplicación map/reduce incluida: wc | indexer
    #[arg(long, env = "MR_APP", default_value = "wc")]
    app: String,

    /// Socket UNIX o host:puerto del coordinator (por defecto, un socket por usuario)
    #[arg(long, env = "MR_ENDPOINT")]
    endpoint: Option<Endpoint>,

    /// Espera entre pedidos cuando no hay tareas libres
    #[arg(long, env = "MR_BACKOFF_MS", default_value_t = 500)]
    backoff_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("worker=info,common=info")),
        )
        .init();

    let cli = Cli::parse();
    let app = apps::lookup(&cli.app).ok_or_else(|| anyhow!("app desconocida: {}", cli.app))?;

    let config = WorkerConfig {
        endpoint: cli.endpoint.unwrap_or_default(),
        backoff: Duration::from_millis(cli.backoff_ms),
        worker_id: None,
    };

    let worker = Worker::new(app, config)?;
    // Done o coordinator caído: en los dos casos salimos con 0
    worker.run().await?;
    Ok(())
}
