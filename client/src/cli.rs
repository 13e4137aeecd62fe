use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use common::{apps, sequential, CoordinatorClient, Endpoint, JobSnapshot, PhaseProgress};
use std::{path::PathBuf, time::Duration};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "mrctl")]
#[command(about = "CLI simple para mirar un coordinator map/reduce")]
struct Cli {
    /// Socket UNIX o host:puerto del coordinator
    #[arg(long, env = "MR_ENDPOINT", global = true)]
    endpoint: Option<Endpoint>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fase del job y progreso por tipo de tarea
    Status {
        /// Imprime el snapshot como JSON
        #[arg(long)]
        json: bool,
    },
    /// Workers vistos por el coordinator
    Workers,
    /// Espera hasta que el job termine
    Wait {
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Corre el job en este proceso, sin coordinator (salida de referencia)
    Sequential {
        #[arg(long, default_value = "wc")]
        app: String,

        #[arg(long, default_value = "mr-correct-out.txt")]
        output: PathBuf,

        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
    },
}

fn print_progress(label: &str, p: &PhaseProgress) {
    let total = p.total();
    if total > 0 {
        let pct = (p.completed as f64) * 100.0 / (total as f64);
        println!(
            "  {label:<7}: {}/{} ({:.1}%)  idle={} en_curso={}",
            p.completed, total, pct, p.idle, p.in_progress
        );
    } else {
        println!("  {label:<7}: (sin tareas)");
    }
}

fn print_snapshot(snap: &JobSnapshot) {
    println!("Job:");
    println!("  fase   : {:?}", snap.phase);
    print_progress("map", &snap.map);
    print_progress("reduce", &snap.reduce);
    println!("  reclamos          : {}", snap.reclaimed);
    println!("  reportes ignorados: {}", snap.stale_reports);
    println!("  iniciado  : {}", snap.started_at);
    if let Some(done) = snap.finished_at {
        println!("  finalizado: {}", done);
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let endpoint = cli.endpoint.unwrap_or_default();

    match cli.command {
        Commands::Status { json } => {
            let client = CoordinatorClient::new(&endpoint)?;
            let snap = client
                .status()
                .await
                .with_context(|| format!("no se pudo consultar {endpoint}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snap)?);
            } else {
                print_snapshot(&snap);
            }
        }

        Commands::Workers => {
            let client = CoordinatorClient::new(&endpoint)?;
            let workers = client
                .workers()
                .await
                .with_context(|| format!("no se pudo consultar {endpoint}"))?;
            if workers.is_empty() {
                println!("No hay workers registrados.");
            } else {
                for w in workers {
                    println!("Worker {}", w.worker_id);
                    println!("  visto hace      : {}s", w.last_seen_secs_ago);
                    println!("  tareas asignadas: {}", w.tasks_assigned);
                    println!("  tareas completas: {}", w.tasks_completed);
                    println!("  reportes viejos : {}", w.stale_reports);
                    println!();
                }
            }
        }

        Commands::Wait { interval_ms } => {
            let client = CoordinatorClient::new(&endpoint)?;
            let interval = Duration::from_millis(interval_ms);
            loop {
                let done = client
                    .done()
                    .await
                    .with_context(|| format!("coordinator en {endpoint} no responde"))?;
                if done {
                    break;
                }
                debug!("job sin terminar, reintento en {:?}", interval);
                tokio::time::sleep(interval).await;
            }
            println!("Job terminado.");
        }

        Commands::Sequential { app, output, files } => {
            let Some(mr_app) = apps::lookup(&app) else {
                bail!("app desconocida: {app}");
            };
            info!("corriendo {} secuencial sobre {} archivos", mr_app.name, files.len());
            sequential::run_sequential(&mr_app, &files, &output)
                .with_context(|| format!("falló la corrida secuencial de {app}"))?;
            println!("Salida en {}", output.display());
        }
    }

    Ok(())
}
