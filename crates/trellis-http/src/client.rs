//! Fetcher talking to a backend over HTTP.

use std::time::Duration;

use serde_json::Value;
use smol_str::SmolStr;
use tracing::debug;
use trellis::{CodecError, Document, FetchError, Fetcher, Parameters};
use ureq::Agent;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends every fetch as `POST <base><endpoint>` with a JSON body of
/// `[[key, value], ...]` pairs.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
    agent: Agent,
}

impl HttpFetcher {
    /// Client for the server at `base_url`, e.g. `http://127.0.0.1:8080`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Like [`HttpFetcher::new`] with an overall per-request timeout.
    #[must_use]
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, agent }
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, endpoint: &str, parameters: &Parameters) -> Result<Document, FetchError> {
        let url = format!("{}{endpoint}", self.base_url);
        let pairs = parameters.iter().collect::<Vec<_>>();
        let body = serde_json::to_string(&pairs).map_err(|err| transport(&err))?;
        debug!(%url, parameters = parameters.len(), "posting fetch");

        let mut response = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .send(body.as_bytes())
            .map_err(|err| transport(&err))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|err| transport(&err))?;

        match status {
            200..=299 => serde_json::from_str(&text)
                .map_err(|err| FetchError::Decode(CodecError::from(err))),
            404 => Err(FetchError::NotFound(endpoint.into())),
            _ => Err(FetchError::Endpoint {
                endpoint: endpoint.into(),
                message: error_message(&text).unwrap_or_else(|| format!("HTTP {status}").into()),
            }),
        }
    }
}

fn transport(err: &dyn std::fmt::Display) -> FetchError {
    FetchError::Transport(err.to_string().into())
}

/// The `error` field of a JSON error body.
fn error_message(text: &str) -> Option<SmolStr> {
    let value: Value = serde_json::from_str(text).ok()?;
    value.get("error")?.as_str().map(SmolStr::new)
}
