use anyhow::{Context, Result};
use common::{
    AssignTaskRequest, AssignTaskResponse, CoordinatorClient, Endpoint, MapReduceApp,
    ReportCompletionRequest, TaskDescriptor, WorkerId,
};
use std::{path::PathBuf, time::Duration};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::execute;

pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub endpoint: Endpoint,
    /// Espera fija cuando el coordinator contesta "retry".
    pub backoff: Duration,
    /// Si no viene, `<hostname>-<uuid>`.
    pub worker_id: Option<WorkerId>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default_for_user(),
            backoff: DEFAULT_BACKOFF,
            worker_id: None,
        }
    }
}

/// Por qué terminó el loop. Para el worker las dos son lo mismo: salir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    JobDone,
    CoordinatorUnreachable,
}

/// Estados del loop del worker.
#[derive(Debug)]
enum Step {
    RequestTask,
    Backoff,
    Execute(TaskDescriptor),
    Report(ReportCompletionRequest),
    Exit(WorkerExit),
}

pub fn default_worker_id() -> WorkerId {
    let hostname = hostname::get()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    format!("{}-{}", hostname, Uuid::new_v4())
}

pub struct Worker {
    id: WorkerId,
    client: CoordinatorClient,
    app: MapReduceApp,
    backoff: Duration,
}

impl Worker {
    pub fn new(app: MapReduceApp, config: WorkerConfig) -> Result<Self> {
        let client = CoordinatorClient::new(&config.endpoint)?;
        Ok(Self {
            id: config.worker_id.unwrap_or_else(default_worker_id),
            client,
            app,
            backoff: config.backoff,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Loop principal: pide, ejecuta, reporta, hasta que no haya más trabajo
    /// o el coordinator no conteste.
    ///
    /// Un error de ejecución (entrada ilegible, disco) se devuelve: el proceso
    /// tiene que morir y el coordinator recupera la tarea por timeout.
    pub async fn run(&self) -> Result<WorkerExit> {
        info!("worker {} arrancando (app={})", self.id, self.app.name);
        let mut step = Step::RequestTask;

        loop {
            step = match step {
                Step::RequestTask => self.request_task().await,
                Step::Backoff => {
                    sleep(self.backoff).await;
                    Step::RequestTask
                }
                Step::Execute(task) => {
                    let outputs = self.execute(task.clone()).await?;
                    Step::Report(ReportCompletionRequest {
                        worker_id: self.id.clone(),
                        task: task.task,
                        generation: task.generation,
                        outputs,
                    })
                }
                Step::Report(req) => self.report(req).await,
                Step::Exit(reason) => {
                    match reason {
                        WorkerExit::JobDone => info!("worker {}: no hay más trabajo", self.id),
                        WorkerExit::CoordinatorUnreachable => {
                            warn!("worker {}: coordinator inalcanzable, salgo", self.id)
                        }
                    }
                    return Ok(reason);
                }
            };
        }
    }

    async fn request_task(&self) -> Step {
        let req = AssignTaskRequest {
            worker_id: self.id.clone(),
        };
        match self.client.assign_task(&req).await {
            Ok(AssignTaskResponse::Task(task)) => {
                info!(
                    "tengo tarea {} (gen={}, {} entradas)",
                    task.task,
                    task.generation,
                    task.inputs.len()
                );
                Step::Execute(task)
            }
            Ok(AssignTaskResponse::Retry) => {
                debug!("no hay tareas, esperando {:?}...", self.backoff);
                Step::Backoff
            }
            Ok(AssignTaskResponse::Done) => Step::Exit(WorkerExit::JobDone),
            Err(e) => {
                debug!("error pidiendo tarea: {:#}", e);
                Step::Exit(WorkerExit::CoordinatorUnreachable)
            }
        }
    }

    async fn execute(&self, task: TaskDescriptor) -> Result<Vec<PathBuf>> {
        let app = self.app;
        let name = task.task;
        tokio::task::spawn_blocking(move || execute::execute(&task, &app))
            .await
            .with_context(|| format!("la ejecución de {name} entró en pánico"))?
    }

    async fn report(&self, req: ReportCompletionRequest) -> Step {
        match self.client.report_completion(&req).await {
            Ok(ack) => {
                if !ack.accepted {
                    info!("reporte de {} ignorado (tarea reasignada)", req.task);
                }
                Step::RequestTask
            }
            Err(e) => {
                debug!("error reportando {}: {:#}", req.task, e);
                Step::Exit(WorkerExit::CoordinatorUnreachable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::apps;

    #[test]
    fn id_por_defecto_es_unico() {
        let a = default_worker_id();
        let b = default_worker_id();
        assert_ne!(a, b);
    }

    #[test]
    fn id_explicito_se_respeta() {
        let config = WorkerConfig {
            endpoint: Endpoint::Unix(PathBuf::from("/tmp/no-hay-nadie.sock")),
            worker_id: Some("w-fijo".to_string()),
            ..WorkerConfig::default()
        };
        let worker = Worker::new(apps::wordcount(), config).unwrap();
        assert_eq!(worker.id(), "w-fijo");
    }

    #[tokio::test]
    async fn sin_coordinator_el_worker_sale_limpio() {
        let tmp = tempfile::tempdir().unwrap();
        let config = WorkerConfig {
            endpoint: Endpoint::Unix(tmp.path().join("mr.sock")),
            ..WorkerConfig::default()
        };
        let worker = Worker::new(apps::wordcount(), config).unwrap();

        let exit = worker.run().await.unwrap();
        assert_eq!(exit, WorkerExit::CoordinatorUnreachable);
    }
}
