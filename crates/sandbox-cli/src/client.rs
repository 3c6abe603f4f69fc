//! Thin HTTP client over the gateway's REST API. Every operator command
//! except `serve` goes through this; `reqwest` directly, the same style
//! `commands/upgrade.rs` uses for its version/download calls, rather than a
//! generated client.

use anyhow::{bail, Context, Result};
use sandbox_core::{PipelineRun, Sandbox, Skill};
use sandbox_gateway::types::ApiError;
use uuid::Uuid;

pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url.trim_end_matches('/'))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        bail!("gateway returned {status}: {message}");
    }

    pub async fn upload_skill(&self, raw_content: &str) -> Result<Skill> {
        let response = self
            .http
            .post(self.url("/skills"))
            .header("content-type", "text/markdown")
            .body(raw_content.to_string())
            .send()
            .await
            .context("failed to reach the gateway")?;
        let response = Self::check(response).await?;
        response.json().await.context("malformed skill response")
    }

    pub async fn start_pipeline(&self, skill_id: Uuid) -> Result<Uuid> {
        #[derive(serde::Serialize)]
        struct Body {
            skill_id: Uuid,
        }
        #[derive(serde::Deserialize)]
        struct Resp {
            run_id: Uuid,
        }
        let response = self
            .http
            .post(self.url("/pipelines"))
            .json(&Body { skill_id })
            .send()
            .await
            .context("failed to reach the gateway")?;
        let response = Self::check(response).await?;
        let body: Resp = response.json().await.context("malformed pipeline response")?;
        Ok(body.run_id)
    }

    pub async fn get_pipeline_status(&self, run_id: Uuid) -> Result<PipelineRun> {
        let response = self
            .http
            .get(self.url(&format!("/pipelines/{run_id}")))
            .send()
            .await
            .context("failed to reach the gateway")?;
        let response = Self::check(response).await?;
        response.json().await.context("malformed pipeline run response")
    }

    pub async fn approve(&self, run_id: Uuid) -> Result<()> {
        self.post_action(&format!("/pipelines/{run_id}/approve")).await
    }

    pub async fn re_analyze(&self, run_id: Uuid) -> Result<()> {
        self.post_action(&format!("/pipelines/{run_id}/re-analyze")).await
    }

    pub async fn retry(&self, run_id: Uuid) -> Result<()> {
        self.post_action(&format!("/pipelines/{run_id}/retry")).await
    }

    pub async fn get_sandbox(&self, sandbox_id: Uuid) -> Result<Sandbox> {
        let response = self
            .http
            .get(self.url(&format!("/sandboxes/{sandbox_id}")))
            .send()
            .await
            .context("failed to reach the gateway")?;
        let response = Self::check(response).await?;
        response.json().await.context("malformed sandbox response")
    }

    pub async fn get_sandbox_logs(&self, sandbox_id: Uuid) -> Result<Vec<String>> {
        #[derive(serde::Deserialize)]
        struct Resp {
            lines: Vec<String>,
        }
        let response = self
            .http
            .get(self.url(&format!("/sandboxes/{sandbox_id}/logs")))
            .send()
            .await
            .context("failed to reach the gateway")?;
        let response = Self::check(response).await?;
        let body: Resp = response.json().await.context("malformed logs response")?;
        Ok(body.lines)
    }

    /// Opens the sandbox's SSE stream for `--follow`. Returns the raw byte
    /// stream; the caller parses `event:`/`data:` lines itself rather than
    /// pulling in a dedicated SSE client crate for one call site.
    pub async fn stream_sandbox_events(
        &self,
        sandbox_id: Uuid,
    ) -> Result<impl futures::Stream<Item = reqwest::Result<bytes::Bytes>>> {
        let response = self
            .http
            .get(self.url(&format!("/sandboxes/{sandbox_id}/events")))
            .send()
            .await
            .context("failed to reach the gateway")?;
        let response = Self::check(response).await?;
        Ok(response.bytes_stream())
    }

    pub async fn stop_sandbox(&self, sandbox_id: Uuid) -> Result<()> {
        self.post_action(&format!("/sandboxes/{sandbox_id}/stop")).await
    }

    pub async fn restart_sandbox(&self, sandbox_id: Uuid) -> Result<()> {
        self.post_action(&format!("/sandboxes/{sandbox_id}/restart")).await
    }

    pub async fn destroy_sandbox(&self, sandbox_id: Uuid) -> Result<()> {
        self.post_action(&format!("/sandboxes/{sandbox_id}/destroy")).await
    }

    async fn post_action(&self, path: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url(path))
            .send()
            .await
            .context("failed to reach the gateway")?;
        Self::check(response).await?;
        Ok(())
    }
}
