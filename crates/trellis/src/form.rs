//! Form submission response documents.

#![allow(missing_docs)]

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::codec::{read_string_map, Document};
use crate::error::CodecError;
use crate::refresh::Parameters;

pub const SUBMISSION_RESPONSE_TYPE: &str = "formSubmissionResponse";

/// Field name to error message.
pub type FieldErrors = IndexMap<String, String>;

/// What a form target answers after a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionResponse {
    #[serde(rename = "type")]
    kind: &'static str,
    pub success: bool,
    pub message: Option<String>,
    /// Returned to the client; forwarded when the form opens a page.
    pub parameters: Option<Parameters>,
    pub errors: Option<FieldErrors>,
}

impl SubmissionResponse {
    #[must_use]
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            kind: SUBMISSION_RESPONSE_TYPE,
            success: true,
            message: Some(message.into()),
            parameters: None,
            errors: None,
        }
    }

    #[must_use]
    pub fn accepted_with_parameters(parameters: Parameters) -> Self {
        Self {
            parameters: Some(parameters),
            ..Self::accepted("form submitted")
        }
    }

    #[must_use]
    pub fn rejected(message: impl Into<String>, errors: FieldErrors) -> Self {
        Self {
            kind: SUBMISSION_RESPONSE_TYPE,
            success: false,
            message: Some(message.into()),
            parameters: None,
            errors: Some(errors),
        }
    }

    /// Adds one field error and marks the response as failed.
    #[must_use]
    pub fn with_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.success = false;
        self.errors
            .get_or_insert_with(FieldErrors::new)
            .insert(field.into(), message.into());
        self
    }

    #[must_use]
    pub fn to_document(&self) -> Document {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Reads a response. Besides the boolean `success` key, the older
    /// `"status": "ok" | "nok"` form is accepted.
    pub fn from_document(document: &Document) -> Result<Self, CodecError> {
        let map = document.as_object().ok_or_else(|| CodecError::InvalidField {
            field: "document".into(),
            expected: "an object",
        })?;
        let success = match (map.get("success"), map.get("status")) {
            (Some(Value::Bool(flag)), _) => *flag,
            (Some(_), _) => {
                return Err(CodecError::InvalidField {
                    field: "success".into(),
                    expected: "a boolean",
                })
            }
            (None, Some(Value::String(status))) => status == "ok",
            (None, _) => return Err(CodecError::MissingField("success".into())),
        };
        let optional_map = |key: &str| -> Result<Option<Parameters>, CodecError> {
            match map.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(value) => read_string_map(value, key).map(Some),
            }
        };
        Ok(Self {
            kind: SUBMISSION_RESPONSE_TYPE,
            success,
            message: map.get("message").and_then(Value::as_str).map(str::to_owned),
            parameters: optional_map("parameters")?,
            errors: optional_map("errors")?,
        })
    }

    #[must_use]
    pub fn errors(&self) -> FieldErrors {
        self.errors.clone().unwrap_or_default()
    }
}
