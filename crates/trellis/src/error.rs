//! Errors raised while building, encoding, fetching and mirroring component trees.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

use crate::tuid::Tuid;

/// Wiring mistakes made by the page author. These are programming errors and
/// are reported before any backend traffic happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A refreshable component was wired as a listener without a data source.
    #[error("component {listener} is connected as a listener but has no source")]
    ListenerWithoutSource { listener: Tuid },

    /// The listener kind cannot refresh itself.
    #[error("component {listener} ({kind}) is not refreshable")]
    NotRefreshable { listener: Tuid, kind: SmolStr },

    /// The component kind cannot notify listeners.
    #[error("component {trigger} ({kind}) is not a trigger")]
    NotTrigger { trigger: Tuid, kind: SmolStr },

    /// A trigger names a listener that is absent from the tree.
    #[error("trigger {trigger} names listener {listener} which is not in the tree")]
    MissingListener { trigger: Tuid, listener: Tuid },

    /// A component of the expected kind is absent.
    #[error("no {kind} component found{}", describe_title(.title))]
    ComponentNotFound { kind: SmolStr, title: Option<SmolStr> },

    /// Title lookups must be unambiguous.
    #[error("{count} {kind} components match{}", describe_title(.title))]
    AmbiguousComponent {
        kind: SmolStr,
        title: Option<SmolStr>,
        count: usize,
    },

    /// Table column names must be unique.
    #[error("duplicate table column '{0}'")]
    DuplicateColumn(SmolStr),

    /// A row does not match the declared column count.
    #[error("row has {got} cells but the table has {expected} columns")]
    RowWidth { expected: usize, got: usize },

    /// Form input names must be unique within their form.
    #[error("duplicate form input '{0}'")]
    DuplicateField(SmolStr),

    /// A form has no input with this name.
    #[error("form {form} has no input named '{name}'")]
    UnknownInput { form: Tuid, name: SmolStr },

    /// A ModalForm was interacted with while closed.
    #[error("modal form {0} is not open")]
    ModalNotOpen(Tuid),

    /// A ModalForm was opened twice.
    #[error("modal form {0} is already open")]
    ModalAlreadyOpen(Tuid),

    /// Keys owned by the wire codec cannot be set as attributes.
    #[error("reserved attribute key '{0}'")]
    ReservedAttribute(SmolStr),

    /// The component does not support the action.
    #[error("component {tuid} ({kind}) does not support {action}")]
    UnsupportedAction {
        tuid: Tuid,
        kind: SmolStr,
        action: &'static str,
    },
}

fn describe_title(title: &Option<SmolStr>) -> String {
    title
        .as_ref()
        .map(|title| format!(" with title '{title}'"))
        .unwrap_or_default()
}

/// Malformed or unknown data on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A `type` tag outside the supported set.
    #[error("unsupported component type '{0}'")]
    UnsupportedComponentType(SmolStr),

    /// A required key is absent.
    #[error("missing field '{0}'")]
    MissingField(SmolStr),

    /// A key holds a value of the wrong JSON shape.
    #[error("field '{field}' should be {expected}")]
    InvalidField { field: SmolStr, expected: &'static str },

    /// A TUID that does not parse as an unsigned integer.
    #[error("invalid tuid '{0}'")]
    InvalidTuid(SmolStr),

    /// Table body rows must match the header width.
    #[error("table row {row} has {got} cells but thead has {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        got: usize,
    },

    /// Table column names must be unique.
    #[error("duplicate table column '{0}'")]
    DuplicateColumn(SmolStr),

    /// Unknown form field kind.
    #[error("unsupported input type '{0}'")]
    UnsupportedInputType(SmolStr),

    /// A page was expected at the document root.
    #[error("expected a page document, got '{0}'")]
    NotAPage(SmolStr),

    /// A refresh response of a kind that cannot stand in for a listener.
    #[error("a '{0}' response cannot replace a listener")]
    UnrefreshableResponse(SmolStr),

    /// Raw text could not be parsed as JSON.
    #[error("invalid json: {0}")]
    Json(SmolStr),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string().into())
    }
}

/// Failures reaching a backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No service is registered under the endpoint.
    #[error("no service registered for '{0}'")]
    NotFound(SmolStr),

    /// The service ran but reported a failure.
    #[error("endpoint '{endpoint}' failed: {message}")]
    Endpoint { endpoint: SmolStr, message: SmolStr },

    /// The request never completed.
    #[error("transport error: {0}")]
    Transport(SmolStr),

    /// The response arrived but could not be decoded.
    #[error("invalid response: {0}")]
    Decode(#[from] CodecError),
}

/// Failure reported by a backend service implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// A request parameter is absent.
    #[error("missing parameter '{0}'")]
    MissingParameter(SmolStr),

    /// A request parameter holds a value of the wrong form.
    #[error("invalid parameter '{name}': {value}")]
    InvalidParameter { name: SmolStr, value: SmolStr },

    /// Any other service-side failure.
    #[error("{0}")]
    Failed(SmolStr),
}

impl ServiceError {
    pub fn failed(message: impl Into<SmolStr>) -> Self {
        Self::Failed(message.into())
    }
}

/// A service that wires its components wrongly fails its request.
impl From<ConfigError> for ServiceError {
    fn from(err: ConfigError) -> Self {
        Self::Failed(err.to_string().into())
    }
}

/// Errors raised by the mirror test harness.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    /// Page wiring is wrong.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fetching a page or fragment failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A response could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// No page has been opened yet.
    #[error("no page is loaded")]
    NoPage,

    /// No component carries the TUID.
    #[error("no component with tuid {0}")]
    UnknownComponent(Tuid),

    /// A table row index past the visible rows.
    #[error("table {tuid} has no row {row}")]
    RowOutOfRange { tuid: Tuid, row: usize },
}

impl MirrorError {
    /// True when the error is a wiring mistake rather than a runtime failure.
    #[must_use]
    pub fn is_configuration_fault(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
