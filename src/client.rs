//! HTTP client for the blog server's PDF export API
//!
//! Three endpoints make up the workflow:
//! - `POST /download/{resource}/pdf/start` — begin server-side generation
//! - `GET /download/{resource}/pdf/check/{task}` — query task status
//! - `GET /download/{resource}/pdf/download/{task}` — the binary itself
//!
//! The client issues the first two and constructs the URL for the third;
//! fetching the PDF is navigation, not an API call.

use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::error::{Error, Result};
use crate::types::{CheckResponse, CsrfToken, ResourceId, StartResponse, TaskId, TaskStatus};

/// Header carrying the CSRF token on start requests
const CSRF_HEADER: &str = "X-CSRFToken";

/// Client for the export API of a single blog server
#[derive(Clone)]
pub struct ExportClient {
    http: reqwest::Client,
    base_url: Url,
    csrf_token: Option<CsrfToken>,
}

impl ExportClient {
    /// Create a client for the server at `base_url`
    ///
    /// The CSRF token is required for [`start`](Self::start) but not for
    /// status checks; pass `None` when only checking existing tasks.
    pub fn new(base_url: &str, csrf_token: Option<CsrfToken>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(base_url)?,
            csrf_token,
        })
    }

    /// Begin server-side PDF generation for a resource
    ///
    /// Returns the task identifier on acceptance. A response whose status is
    /// anything but `"success"` is a typed rejection, not a silent no-op.
    /// No explicit request timeout is set; the transport's own limits apply.
    pub async fn start(&self, resource: &ResourceId) -> Result<TaskId> {
        let token = self.csrf_token.as_ref().ok_or(Error::MissingCsrfToken)?;
        let url = self.endpoint(resource, "start")?;

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(CSRF_HEADER, token.as_str())
            .send()
            .await?;

        let body = response.text().await?;
        let parsed: StartResponse = serde_json::from_str(&body)?;

        if parsed.status != "success" {
            tracing::warn!(
                resource = %resource,
                status = %parsed.status,
                "export start rejected by server"
            );
            return Err(Error::StartRejected {
                status: parsed.status,
            });
        }

        match parsed.task_id {
            Some(task_id) => {
                tracing::debug!(resource = %resource, task_id = %task_id, "export task started");
                Ok(task_id)
            }
            None => Err(Error::Other(
                "start response reported success without a task id".to_string(),
            )),
        }
    }

    /// Query the status of a previously started task
    ///
    /// Any status other than `"ready"` means the task is still processing;
    /// a body that fails to parse is a transport-class failure.
    pub async fn check(&self, resource: &ResourceId, task_id: &TaskId) -> Result<TaskStatus> {
        let url = self.endpoint(resource, &format!("check/{task_id}"))?;

        let response = self.http.get(url).send().await?;
        let body = response.text().await?;
        let parsed: CheckResponse = serde_json::from_str(&body)?;

        Ok(TaskStatus::from_wire(&parsed.status))
    }

    /// URL serving the generated PDF for a completed task
    ///
    /// This is the navigation target handed to the embedding application once
    /// the poller reports readiness.
    pub fn download_url(&self, resource: &ResourceId, task_id: &TaskId) -> Result<Url> {
        self.endpoint(resource, &format!("download/{task_id}"))
    }

    fn endpoint(&self, resource: &ResourceId, suffix: &str) -> Result<Url> {
        let path = format!("/download/{}/pdf/{}", resource.as_str(), suffix);
        Ok(self.base_url.join(&path)?)
    }
}

impl std::fmt::Debug for ExportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The token is deliberately omitted from debug output
        f.debug_struct("ExportClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_csrf_token", &self.csrf_token.is_some())
            .finish()
    }
}
