use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use broadside_core::error::ArenaError;

use crate::pool::ClientPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A prepared call to a player, relative to its base URL.
#[derive(Debug, Clone)]
pub struct PlayerRequest {
    pub method: Method,
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<serde_json::Value>,
}

impl PlayerRequest {
    pub fn get(path: &'static str) -> Self {
        Self {
            method: Method::Get,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post_json<T: Serialize + ?Sized>(
        path: &'static str,
        body: &T,
    ) -> Result<Self, ArenaError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ArenaError::Encoding(format!("{path} body: {e}")))?;
        Ok(Self {
            method: Method::Post,
            path,
            query: Vec::new(),
            body: Some(body),
        })
    }

    pub fn with_query(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.query.push((name, value.into()));
        self
    }
}

/// Executes single HTTP calls against players. No retries: every failure is
/// classified and returned to the caller.
#[derive(Clone)]
pub struct PlayerTransport {
    pool: Arc<ClientPool>,
}

impl PlayerTransport {
    pub fn new(pool: Arc<ClientPool>) -> Self {
        Self { pool }
    }

    /// Run `request` against `base_url`, returning the body of a 200 response.
    /// The deadline covers sending the request and reading the whole body.
    pub async fn execute(
        &self,
        base_url: &str,
        request: PlayerRequest,
        timeout: Duration,
    ) -> Result<String, ArenaError> {
        let url = endpoint_url(base_url, request.path);
        let client = self.pool.client_for(base_url)?;

        let mut builder = match request.method {
            Method::Get => client.get(&url),
            Method::Post => client.post(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let call = async {
            let response = builder
                .send()
                .await
                .map_err(|e| classify(&url, timeout, e))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| classify(&url, timeout, e))?;
            Ok::<_, ArenaError>((status, body))
        };

        let (status, body) = match tokio::time::timeout(timeout, call).await {
            Ok(result) => result?,
            Err(_) => return Err(ArenaError::Timeout { url, timeout }),
        };

        if status != reqwest::StatusCode::OK {
            tracing::debug!(url = %url, status = status.as_u16(), "Player answered with unexpected status");
            return Err(ArenaError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Join base URL and operation path. The result never contains the query
/// string, so it is safe to log (API keys travel in the query).
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim().trim_end_matches('/'), path)
}

fn classify(url: &str, timeout: Duration, error: reqwest::Error) -> ArenaError {
    if error.is_timeout() {
        ArenaError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        ArenaError::CommunicationFailure {
            url: url.to_string(),
            // reqwest includes the full URL (query too) in its message.
            message: error.without_url().to_string(),
        }
    }
}
