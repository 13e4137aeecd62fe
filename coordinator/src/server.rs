use anyhow::{anyhow, ensure, Context, Result};
use axum::Router;
use common::Endpoint;
use std::{
    fs,
    future::Future,
    io,
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{
    net::{TcpListener, UnixListener},
    sync::oneshot,
    task::JoinHandle,
};
use tracing::{error, info, warn};

use crate::{config::CoordinatorConfig, failover, handlers, job::Job, state::AppState};

pub enum BoundListener {
    Unix { listener: UnixListener, path: PathBuf },
    Tcp(TcpListener),
}

/// Abre el endpoint. Un socket UNIX viejo de una corrida anterior se borra.
pub async fn bind(endpoint: &Endpoint) -> Result<BoundListener> {
    match endpoint {
        Endpoint::Unix(path) => {
            match fs::remove_file(path) {
                Ok(()) => warn!("borrado socket viejo en {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("no se pudo borrar {}", path.display()))
                }
            }
            let listener = UnixListener::bind(path)
                .with_context(|| format!("no se pudo escuchar en {}", path.display()))?;
            Ok(BoundListener::Unix {
                listener,
                path: path.clone(),
            })
        }
        Endpoint::Tcp(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("no se pudo escuchar en {}", addr))?;
            Ok(BoundListener::Tcp(listener))
        }
    }
}

fn remove_socket(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("no se pudo borrar el socket {}: {}", path.display(), e);
        }
    }
}

/// Sirve el router hasta que `shutdown` se resuelva.
pub async fn serve<F>(listener: BoundListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    match listener {
        BoundListener::Unix { listener, path } => {
            info!("coordinator escuchando en unix://{}", path.display());
            let res = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await;
            remove_socket(&path);
            res?;
        }
        BoundListener::Tcp(listener) => {
            info!("coordinator escuchando en tcp://{}", listener.local_addr()?);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await?;
        }
    }
    Ok(())
}

/// Coordinator en marcha: servidor RPC + barrido de fallos.
pub struct RunningCoordinator {
    state: AppState,
    endpoint: Endpoint,
    config: CoordinatorConfig,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: JoinHandle<Result<()>>,
    sweeper: JoinHandle<()>,
}

impl RunningCoordinator {
    /// Crea el job, abre el endpoint y arranca a servir. Cuando devuelve, los
    /// workers ya se pueden conectar.
    pub async fn start(inputs: Vec<PathBuf>, config: CoordinatorConfig) -> Result<Self> {
        ensure!(!inputs.is_empty(), "no hay archivos de entrada");
        ensure!(config.n_reduce >= 1, "n_reduce debe ser >= 1");

        fs::create_dir_all(&config.work_dir).with_context(|| {
            format!("no se pudo crear work_dir {}", config.work_dir.display())
        })?;

        let job = Job::new(
            inputs,
            config.n_reduce,
            config.work_dir.clone(),
            config.task_timeout,
        );
        let state = AppState::new(job);

        let listener = bind(&config.endpoint).await?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = handlers::build_router(state.clone());
        let server = tokio::spawn(serve(listener, app, async move {
            let _ = shutdown_rx.await;
        }));

        // detector de fallos en segundo plano
        let sweeper = tokio::spawn(failover::run_failover_loop(
            state.clone(),
            config.sweep_interval,
        ));

        Ok(Self {
            state,
            endpoint: config.endpoint.clone(),
            config,
            shutdown_tx: Some(shutdown_tx),
            server,
            sweeper,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Done(): true una vez que todas las tareas reduce se completaron.
    /// Con el lock envenenado el job ya no puede avanzar: es un error.
    pub fn done(&self) -> Result<bool> {
        let st = self.state.lock().map_err(|e| anyhow!(e))?;
        Ok(st.job.is_done())
    }

    pub async fn wait_done(&self) -> Result<()> {
        while !self.done()? {
            tokio::time::sleep(self.config.done_poll).await;
        }
        Ok(())
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.sweeper.abort();
        self.server.await.context("el servidor terminó con pánico")?
    }
}

/// Lo que hace el binario: arranca, espera a Done, deja un rato para que los
/// workers se enteren y apaga.
pub async fn run(inputs: Vec<PathBuf>, config: CoordinatorConfig) -> Result<()> {
    let linger: Duration = config.linger;
    let coordinator = RunningCoordinator::start(inputs, config).await?;

    if let Err(e) = coordinator.wait_done().await {
        error!("el coordinator no puede seguir: {:#}", e);
        coordinator.shutdown().await?;
        return Err(e);
    }
    if let Ok(st) = coordinator.state().lock() {
        let snap = st.snapshot();
        info!(
            "job terminado: {} map + {} reduce, {} reclamos, {} reportes ignorados",
            snap.n_map, snap.n_reduce, snap.reclaimed, snap.stale_reports
        );
    }

    tokio::time::sleep(linger).await;
    coordinator.shutdown().await
}
