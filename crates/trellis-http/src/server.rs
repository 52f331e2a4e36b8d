//! Backend HTTP server exposing a service registry.
//!
//! Every path is an endpoint. Parameters come from the query string and from
//! a JSON body holding either `[[key, value], ...]` pairs or a flat object;
//! body values win over query values.

#![allow(missing_docs)]

use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use serde_json::{json, Value};
use tiny_http::{Header, Response, Server};
use tracing::{debug, info, warn};
use trellis::{Document, FetchError, Parameters, ServiceRegistry};

use crate::config::ServerConfig;
use crate::error::HttpError;

/// Running server. Dropping the handle leaves the workers running;
/// call [`WebServer::shutdown`] to stop them.
pub struct WebServer {
    server: Arc<Server>,
    workers: Vec<thread::JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl WebServer {
    /// Address actually bound, with the port resolved when `:0` was asked.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Blocks until every worker has exited.
    pub fn join(self) {
        for worker in self.workers {
            if worker.join().is_err() {
                warn!(local_addr = %self.local_addr, "server worker panicked");
            }
        }
    }

    /// Stops accepting requests and waits for every worker.
    pub fn shutdown(self) {
        let Self {
            server,
            workers,
            local_addr,
        } = self;
        for _ in &workers {
            server.unblock();
        }
        for worker in workers {
            if worker.join().is_err() {
                warn!(%local_addr, "server worker panicked");
            }
        }
        info!(%local_addr, "server stopped");
    }
}

pub fn start_server(
    config: &ServerConfig,
    registry: Arc<ServiceRegistry>,
) -> Result<WebServer, HttpError> {
    let bind_error = |message: String| HttpError::Bind {
        listen: config.listen.clone(),
        message: message.into(),
    };
    let server = Server::http(config.listen.as_str()).map_err(|err| bind_error(err.to_string()))?;
    let local_addr = server
        .server_addr()
        .to_ip()
        .ok_or_else(|| bind_error("not an ip listener".to_owned()))?;
    let server = Arc::new(server);

    let mut workers = Vec::with_capacity(config.workers);
    for index in 0..config.workers {
        let server = Arc::clone(&server);
        let registry = Arc::clone(&registry);
        let worker = thread::Builder::new()
            .name(format!("trellis-http-{index}"))
            .spawn(move || {
                for request in server.incoming_requests() {
                    handle(&registry, request);
                }
            })?;
        workers.push(worker);
    }
    info!(%local_addr, workers = config.workers, "server listening");
    Ok(WebServer {
        server,
        workers,
        local_addr,
    })
}

fn handle(registry: &ServiceRegistry, mut request: tiny_http::Request) {
    let url = request.url().to_owned();
    let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
    let mut body = String::new();
    let (status, payload) = match request.as_reader().read_to_string(&mut body) {
        Err(err) => (400, error_body(&format!("unreadable body: {err}"))),
        Ok(_) => match request_parameters(query, &body) {
            Err(message) => (400, error_body(&message)),
            Ok(parameters) => call(registry, path, &parameters),
        },
    };
    debug!(method = %request.method(), path, status, "answered request");
    if let Err(err) = request.respond(json_response(status, &payload)) {
        warn!(path, "failed to send response: {err}");
    }
}

fn call(registry: &ServiceRegistry, path: &str, parameters: &Parameters) -> (u16, Document) {
    match registry.call(path, parameters) {
        Ok(document) => (200, document),
        Err(err @ FetchError::NotFound(_)) => (404, error_body(&err.to_string())),
        Err(FetchError::Endpoint { message, .. }) => (500, error_body(&message)),
        Err(err) => (500, error_body(&err.to_string())),
    }
}

fn error_body(message: &str) -> Document {
    json!({ "error": message })
}

fn json_response(status: u16, payload: &Document) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut response = Response::from_string(payload.to_string()).with_status_code(status);
    if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
        response.add_header(header);
    }
    response
}

/// Query parameters overlaid with body parameters.
pub fn request_parameters(query: &str, body: &str) -> Result<Parameters, String> {
    let mut parameters = Parameters::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        parameters.insert(decode_component(key)?, decode_component(value)?);
    }
    if body.trim().is_empty() {
        return Ok(parameters);
    }
    let value: Value = serde_json::from_str(body).map_err(|err| format!("invalid json body: {err}"))?;
    match value {
        Value::Array(pairs) => {
            for pair in pairs {
                match pair.as_array().map(Vec::as_slice) {
                    Some([Value::String(key), value]) => {
                        parameters.insert(key.clone(), scalar(key, value)?);
                    }
                    _ => return Err(format!("expected a [key, value] pair, got {pair}")),
                }
            }
        }
        Value::Object(map) => {
            for (key, value) in &map {
                parameters.insert(key.clone(), scalar(key, value)?);
            }
        }
        other => return Err(format!("expected pairs or an object, got {other}")),
    }
    Ok(parameters)
}

fn decode_component(text: &str) -> Result<String, String> {
    urlencoding::decode(&text.replace('+', " "))
        .map(|decoded| decoded.into_owned())
        .map_err(|err| format!("bad query encoding in '{text}': {err}"))
}

fn scalar(key: &str, value: &Value) -> Result<String, String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Null => Ok(String::new()),
        Value::Bool(_) | Value::Number(_) => Ok(value.to_string()),
        Value::Array(_) | Value::Object(_) => {
            Err(format!("parameter '{key}' must be a scalar, got {value}"))
        }
    }
}
