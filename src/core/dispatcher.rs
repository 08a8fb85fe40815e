//! Turns a queued action into the matching API call.

use crate::config::Config;
use crate::errors::{AppError, AppResult, DispatchError};
use crate::models::action::{ActionRequest, PendingAction};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

/// Executes one queued action against the server.
///
/// `Ok(())` means the server accepted the action and it can leave the
/// queue. Rows whose type or payload no longer decode must come back as a
/// programming error (see [`DispatchError::is_programming_error`]).
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn dispatch(&self, action: &PendingAction) -> Result<(), DispatchError>;
}

/// Resolved HTTP call for one action.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub segments: Vec<String>,
    pub body: Value,
}

impl Endpoint {
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

fn body_json<T: serde::Serialize>(
    request: &ActionRequest,
    body: &T,
) -> Result<Value, DispatchError> {
    serde_json::to_value(body).map_err(|e| DispatchError::InvalidPayload {
        action_type: request.kind().to_db_str().to_string(),
        reason: e.to_string(),
    })
}

/// Dispatch table: one arm per action type.
pub fn endpoint_for(request: &ActionRequest) -> Result<Endpoint, DispatchError> {
    let (segments, body) = match request {
        ActionRequest::MedicationLog(p) => (
            vec!["medications".to_string(), p.medication_id.clone(), "logs".to_string()],
            body_json(request, &p.body)?,
        ),
        ActionRequest::TimelineEntry(p) => (
            vec![
                "care-recipients".to_string(),
                p.care_recipient_id.clone(),
                "timeline".to_string(),
            ],
            body_json(request, &p.body)?,
        ),
        ActionRequest::ShiftCheckin(p) => (
            vec!["shifts".to_string(), p.shift_id.clone(), "check-in".to_string()],
            body_json(request, &p.body)?,
        ),
        ActionRequest::ShiftCheckout(p) => (
            vec!["shifts".to_string(), p.shift_id.clone(), "check-out".to_string()],
            body_json(request, &p.body)?,
        ),
    };
    Ok(Endpoint { segments, body })
}

/// Authenticated JSON client for the caregiving API.
pub struct HttpDispatcher {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpDispatcher {
    pub fn new(cfg: &Config) -> AppResult<Self> {
        let base_url = Url::parse(&cfg.api_base_url)
            .map_err(|e| AppError::Config(format!("invalid api_base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "api_base_url '{}' cannot carry a path",
                cfg.api_base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .user_agent(concat!("caresync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            token: cfg.api_token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn url_for(&self, endpoint: &Endpoint) -> Result<Url, DispatchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DispatchError::Transport("base url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(endpoint.segments.iter());
        Ok(url)
    }
}

#[async_trait]
impl ActionDispatcher for HttpDispatcher {
    async fn dispatch(&self, action: &PendingAction) -> Result<(), DispatchError> {
        let request = action.decode()?;
        let endpoint = endpoint_for(&request)?;
        let url = self.url_for(&endpoint)?;

        debug!(action_id = action.id, %url, "dispatching");

        let mut req = self
            .http
            .post(url)
            .header(
                "Idempotency-Key",
                format!("caresync-{}-{}", action.created_at.timestamp_millis(), action.id),
            )
            .json(&endpoint.body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(action_id = action.id, status = status.as_u16(), "server rejected action");
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
