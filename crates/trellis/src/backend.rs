//! Backend boundary: the fetch trait, request reading and the in-process
//! service registry.

#![allow(missing_docs)]

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::codec::{self, Document};
use crate::component::{Component, Ui};
use crate::error::{FetchError, ServiceError};
use crate::form::SubmissionResponse;
use crate::refresh::Parameters;

/// Anything able to answer a fetch for an endpoint with a document.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, endpoint: &str, parameters: &Parameters) -> Result<Document, FetchError>;
}

impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    fn fetch(&self, endpoint: &str, parameters: &Parameters) -> Result<Document, FetchError> {
        (**self).fetch(endpoint, parameters)
    }
}

impl<T: Fetcher + ?Sized> Fetcher for &T {
    fn fetch(&self, endpoint: &str, parameters: &Parameters) -> Result<Document, FetchError> {
        (**self).fetch(endpoint, parameters)
    }
}

/// Typed read access to the parameters of one request.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    endpoint: &'a str,
    parameters: &'a Parameters,
}

impl<'a> Request<'a> {
    #[must_use]
    pub fn new(endpoint: &'a str, parameters: &'a Parameters) -> Self {
        Self {
            endpoint,
            parameters,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &'a str {
        self.endpoint
    }

    #[must_use]
    pub fn parameters(&self) -> &'a Parameters {
        self.parameters
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn string(&self, name: &str) -> Result<&'a str, ServiceError> {
        self.parameters
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ServiceError::MissingParameter(name.into()))
    }

    #[must_use]
    pub fn string_or(&self, name: &str, default: &'a str) -> &'a str {
        self.string(name).unwrap_or(default)
    }

    pub fn int(&self, name: &str) -> Result<i64, ServiceError> {
        let text = self.string(name)?;
        text.trim()
            .parse()
            .map_err(|_| ServiceError::InvalidParameter {
                name: name.into(),
                value: text.into(),
            })
    }

    /// Like [`Request::int`] but a missing parameter yields `default`. A
    /// present but malformed value is still an error.
    pub fn int_or(&self, name: &str, default: i64) -> Result<i64, ServiceError> {
        if self.has(name) {
            self.int(name)
        } else {
            Ok(default)
        }
    }

    /// HTML checkbox semantics: `on` is checked, `off` is not.
    pub fn checkbox(&self, name: &str) -> Result<bool, ServiceError> {
        match self.string(name)? {
            "on" => Ok(true),
            "off" => Ok(false),
            other => Err(ServiceError::InvalidParameter {
                name: name.into(),
                value: other.into(),
            }),
        }
    }

    pub fn checkbox_or(&self, name: &str, default: bool) -> Result<bool, ServiceError> {
        if self.has(name) {
            self.checkbox(name)
        } else {
            Ok(default)
        }
    }
}

/// A backend web service answering one endpoint.
pub trait Service: Send + Sync {
    fn call(&self, ui: &Ui, request: &Request<'_>) -> Result<Document, ServiceError>;
}

impl<F> Service for F
where
    F: Fn(&Ui, &Request<'_>) -> Result<Document, ServiceError> + Send + Sync,
{
    fn call(&self, ui: &Ui, request: &Request<'_>) -> Result<Document, ServiceError> {
        self(ui, request)
    }
}

/// Endpoint path to service. Components are built per request from one
/// shared [`Ui`], so TUIDs stay unique across everything the registry serves.
#[derive(Default)]
pub struct ServiceRegistry {
    ui: Ui,
    services: RwLock<IndexMap<String, Arc<dyn Service>>>,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("ui", &self.ui)
            .field("endpoints", &self.endpoints())
            .finish()
    }
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ui(ui: Ui) -> Self {
        Self {
            ui,
            services: RwLock::default(),
        }
    }

    #[must_use]
    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    /// Registers `service` under `endpoint`, replacing any previous one.
    pub fn register(&self, endpoint: impl Into<String>, service: impl Service + 'static) {
        self.services
            .write()
            .insert(endpoint.into(), Arc::new(service));
    }

    /// Registers a service answering with a freshly built component tree.
    pub fn register_component<F>(&self, endpoint: impl Into<String>, build: F)
    where
        F: Fn(&Ui, &Request<'_>) -> Result<Component, ServiceError> + Send + Sync + 'static,
    {
        self.register(endpoint, move |ui: &Ui, request: &Request<'_>| {
            build(ui, request).map(|component| codec::serialize(&component))
        });
    }

    /// Registers a form target answering with a submission response.
    pub fn register_form_target<F>(&self, endpoint: impl Into<String>, handle: F)
    where
        F: Fn(&Request<'_>) -> Result<SubmissionResponse, ServiceError> + Send + Sync + 'static,
    {
        self.register(endpoint, move |_: &Ui, request: &Request<'_>| {
            handle(request).map(|response| response.to_document())
        });
    }

    #[must_use]
    pub fn endpoints(&self) -> Vec<String> {
        self.services.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn contains(&self, endpoint: &str) -> bool {
        self.services.read().contains_key(endpoint)
    }

    /// Runs the service registered for `endpoint`.
    pub fn call(&self, endpoint: &str, parameters: &Parameters) -> Result<Document, FetchError> {
        // The lock is released before the service runs so services may
        // register further endpoints.
        let service = self
            .services
            .read()
            .get(endpoint)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(endpoint.into()))?;
        debug!(endpoint, parameters = parameters.len(), "calling service");
        service
            .call(&self.ui, &Request::new(endpoint, parameters))
            .map_err(|err| {
                warn!(endpoint, "service failed: {err}");
                FetchError::Endpoint {
                    endpoint: SmolStr::new(endpoint),
                    message: err.to_string().into(),
                }
            })
    }
}

impl Fetcher for ServiceRegistry {
    fn fetch(&self, endpoint: &str, parameters: &Parameters) -> Result<Document, FetchError> {
        self.call(endpoint, parameters)
    }
}
