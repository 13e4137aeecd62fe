use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::rpc::{
    AssignTaskRequest, AssignTaskResponse, DoneResponse, JobSnapshot, ReportCompletionRequest,
    ReportCompletionResponse, WorkerMetrics,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Cliente HTTP/JSON del coordinator, sobre socket UNIX o TCP.
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    http: Client,
    base_url: String,
}

impl CoordinatorClient {
    pub fn new(endpoint: &Endpoint) -> Result<Self> {
        let builder = Client::builder().timeout(REQUEST_TIMEOUT);
        let builder = match endpoint {
            Endpoint::Unix(path) => builder.unix_socket(path.clone()),
            Endpoint::Tcp(_) => builder,
        };
        let http = builder
            .build()
            .context("no se pudo construir el cliente HTTP")?;

        Ok(Self {
            http,
            base_url: endpoint.base_url(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?
            .error_for_status()
            .with_context(|| format!("POST {url}"))?;
        Ok(resp.json().await?)
    }

    async fn get<R>(&self, path: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = self.url(path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        Ok(resp.json().await?)
    }

    pub async fn assign_task(&self, req: &AssignTaskRequest) -> Result<AssignTaskResponse> {
        self.post("/api/v1/tasks/next", req).await
    }

    pub async fn report_completion(
        &self,
        req: &ReportCompletionRequest,
    ) -> Result<ReportCompletionResponse> {
        self.post("/api/v1/tasks/complete", req).await
    }

    pub async fn done(&self) -> Result<bool> {
        let resp: DoneResponse = self.get("/api/v1/done").await?;
        Ok(resp.done)
    }

    pub async fn status(&self) -> Result<JobSnapshot> {
        self.get("/api/v1/status").await
    }

    pub async fn workers(&self) -> Result<Vec<WorkerMetrics>> {
        self.get("/api/v1/workers").await
    }
}
