//! `trellis` - backend-described UI component trees with partial refresh.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Backend boundary: fetch trait, request reader and service registry.
pub mod backend;
/// Wire-format codec.
pub mod codec;
/// Component tree model and builders.
pub mod component;
/// Error types.
pub mod error;
/// Form submission documents.
pub mod form;
/// Mirror tree test harness.
pub mod mirror;
/// Trigger to listener refresh protocol.
pub mod refresh;
/// Table data and pagination.
pub mod table;
/// Component identities.
pub mod tuid;

pub use backend::{Fetcher, Request, Service, ServiceRegistry};
pub use codec::Document;
pub use component::{Component, FieldKind, FormField, Kind, Ui};
pub use error::{CodecError, ConfigError, FetchError, MirrorError, ServiceError};
pub use form::SubmissionResponse;
pub use mirror::{MirrorClient, SubmitOutcome};
pub use refresh::{FanOutReport, Parameters};
pub use table::{Pagination, TableData};
pub use tuid::{Tuid, TuidAllocator};
