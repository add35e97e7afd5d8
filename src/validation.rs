//! Field-level validation issues
//!
//! Collected by the validation routines and served to the client as the
//! `details` array of a `400 Bad Request` response.

use serde::Serialize;

/// A single field-level problem with a submitted payload
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// The field the issue applies to
    pub field: String,

    /// What is wrong with it
    pub message: String,
}

impl ValidationIssue {
    /// Create an issue for a field
    pub fn new<F, M>(field: F, message: M) -> Self
    where
        F: ToString,
        M: ToString,
    {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}
