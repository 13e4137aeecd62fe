use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use common::{
    AssignTaskRequest, AssignTaskResponse, DoneResponse, JobSnapshot, ReportCompletionRequest,
    ReportCompletionResponse, WorkerMetrics,
};
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::state::{AppState, CoordinatorState};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/tasks/next", post(assign_task))
        .route("/api/v1/tasks/complete", post(complete_task))
        .route("/api/v1/done", get(done))
        .route("/api/v1/status", get(status))
        .route("/api/v1/workers", get(list_workers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn locked(state: &AppState) -> Result<std::sync::MutexGuard<'_, CoordinatorState>, StatusCode> {
    state.lock().map_err(|e| {
        error!("{}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// AssignTask: Done, Retry o una tarea
async fn assign_task(
    State(state): State<AppState>,
    Json(req): Json<AssignTaskRequest>,
) -> Result<Json<AssignTaskResponse>, StatusCode> {
    let resp = locked(&state)?.assign_task(&req.worker_id, Instant::now());

    if resp == AssignTaskResponse::Retry {
        debug!("worker {} pidió tarea pero no hay ninguna Idle", req.worker_id);
    }
    Ok(Json(resp))
}

// ReportCompletion: siempre ok, aunque el reporte sea viejo
async fn complete_task(
    State(state): State<AppState>,
    Json(req): Json<ReportCompletionRequest>,
) -> Result<Json<ReportCompletionResponse>, StatusCode> {
    let accepted = locked(&state)?.report_completion(req);
    Ok(Json(ReportCompletionResponse { ok: true, accepted }))
}

async fn done(State(state): State<AppState>) -> Result<Json<DoneResponse>, StatusCode> {
    let done = locked(&state)?.job.is_done();
    Ok(Json(DoneResponse { done }))
}

async fn status(State(state): State<AppState>) -> Result<Json<JobSnapshot>, StatusCode> {
    Ok(Json(locked(&state)?.snapshot()))
}

async fn list_workers(State(state): State<AppState>) -> Result<Json<Vec<WorkerMetrics>>, StatusCode> {
    Ok(Json(locked(&state)?.worker_metrics()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use common::{Phase, TaskRef};
    use serde::{de::DeserializeOwned, Serialize};
    use std::{path::PathBuf, time::Duration};
    use tower::ServiceExt;

    fn router() -> Router {
        let job = Job::new(
            vec![PathBuf::from("in-0.txt")],
            1,
            "/tmp/mr-handlers",
            Duration::from_secs(10),
        );
        build_router(AppState::new(job))
    }

    async fn call<R: DeserializeOwned>(app: &Router, req: Request<Body>) -> R {
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json<B: Serialize>(uri: &str, body: &B) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn assign_req() -> AssignTaskRequest {
        AssignTaskRequest {
            worker_id: "w1".to_string(),
        }
    }

    #[tokio::test]
    async fn health_responde_ok() {
        let resp = router().oneshot(get("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ciclo_completo_por_http() {
        let app = router();

        let done: DoneResponse = call(&app, get("/api/v1/done")).await;
        assert!(!done.done);

        let resp: AssignTaskResponse = call(&app, post_json("/api/v1/tasks/next", &assign_req())).await;
        let AssignTaskResponse::Task(map) = resp else {
            panic!("esperaba tarea map, llegó {resp:?}");
        };
        assert_eq!(map.task, TaskRef::map(0));

        let retry: AssignTaskResponse = call(&app, post_json("/api/v1/tasks/next", &assign_req())).await;
        assert_eq!(retry, AssignTaskResponse::Retry);

        let report = ReportCompletionRequest {
            worker_id: "w1".to_string(),
            task: map.task,
            generation: map.generation,
            outputs: vec![PathBuf::from("/tmp/mr-handlers/mr-0-0")],
        };
        let ack: ReportCompletionResponse = call(&app, post_json("/api/v1/tasks/complete", &report)).await;
        assert!(ack.ok && ack.accepted);

        // duplicado: ok pero no aceptado
        let ack: ReportCompletionResponse = call(&app, post_json("/api/v1/tasks/complete", &report)).await;
        assert!(ack.ok);
        assert!(!ack.accepted);

        let resp: AssignTaskResponse = call(&app, post_json("/api/v1/tasks/next", &assign_req())).await;
        let AssignTaskResponse::Task(reduce) = resp else {
            panic!("esperaba tarea reduce, llegó {resp:?}");
        };
        assert_eq!(reduce.task, TaskRef::reduce(0));

        let report = ReportCompletionRequest {
            worker_id: "w1".to_string(),
            task: reduce.task,
            generation: reduce.generation,
            outputs: vec![],
        };
        let _: ReportCompletionResponse = call(&app, post_json("/api/v1/tasks/complete", &report)).await;

        let done: DoneResponse = call(&app, get("/api/v1/done")).await;
        assert!(done.done);
        let resp: AssignTaskResponse = call(&app, post_json("/api/v1/tasks/next", &assign_req())).await;
        assert_eq!(resp, AssignTaskResponse::Done);

        let snap: JobSnapshot = call(&app, get("/api/v1/status")).await;
        assert_eq!(snap.phase, Phase::Done);
        assert_eq!(snap.stale_reports, 1);

        let workers: Vec<WorkerMetrics> = call(&app, get("/api/v1/workers")).await;
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].tasks_completed, 2);
    }

    #[tokio::test]
    async fn body_invalido_es_error_del_cliente() {
        let req = Request::post("/api/v1/tasks/next")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"nope\": 1}"))
            .unwrap();
        let resp = router().oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }
}
