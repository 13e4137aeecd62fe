use anyhow::{bail, Context, Result};
use clap::Parser;
use common::Endpoint;
use coordinator::{config, CoordinatorConfig};
use glob::glob;
use std::{path::PathBuf, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coordinator")]
#[command(about = "Coordinator map/reduce: reparte tareas y espera a que el job termine")]
struct Cli {
    /// Archivos de entrada (se aceptan patrones glob, ej: "pg-*.txt")
    #[arg(value_name = "FILES", required = true)]
    files: Vec<String>,

    /// Cantidad de tareas reduce
    #[arg(long, env = "MR_N_REDUCE", default_value_t = config::DEFAULT_N_REDUCE)]
    n_reduce: u32,

    /// Directorio compartido para intermedios y salidas
    #[arg(long, env = "MR_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Socket UNIX o host:puerto (por defecto, un socket por usuario)
    #[arg(long, env = "MR_ENDPOINT")]
    endpoint: Option<Endpoint>,

    #[arg(long, env = "MR_TASK_TIMEOUT_SECS", default_value_t = 10)]
    task_timeout_secs: u64,

    #[arg(long, env = "MR_SWEEP_INTERVAL_MS", default_value_t = 1000)]
    sweep_interval_ms: u64,

    #[arg(long, env = "MR_LINGER_SECS", default_value_t = 2)]
    linger_secs: u64,
}

/// Expande los patrones glob; un argumento sin comodines se usa tal cual.
fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let mut matched = false;
        for entry in glob(pattern).with_context(|| format!("patrón inválido: {pattern}"))? {
            let path = entry?;
            if path.is_file() {
                files.push(path);
                matched = true;
            }
        }
        if !matched {
            files.push(PathBuf::from(pattern));
        }
    }
    if files.is_empty() {
        bail!("no hay archivos de entrada");
    }
    Ok(files)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("coordinator=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let inputs = expand_inputs(&cli.files)?;

    let config = CoordinatorConfig {
        n_reduce: cli.n_reduce,
        work_dir: cli.work_dir,
        endpoint: cli.endpoint.unwrap_or_default(),
        task_timeout: Duration::from_secs(cli.task_timeout_secs),
        sweep_interval: Duration::from_millis(cli.sweep_interval_ms),
        linger: Duration::from_secs(cli.linger_secs),
        ..CoordinatorConfig::default()
    };

    info!(
        "{} archivos de entrada, n_reduce={}, endpoint={}",
        inputs.len(),
        config.n_reduce,
        config.endpoint
    );

    coordinator::run(inputs, config).await
}
