//! # Domain Identity Newtypes
//!
//! Newtype wrappers for all record identifiers in the stack. These
//! prevent accidental identifier confusion — you cannot pass a
//! `SubmissionId` where a `StageId` is expected, which matters in a
//! system where evaluations reference both.
//!
//! `UserId` and `ProgramCode` wrap validated strings rather than UUIDs:
//! users come from the external identity provider under its own subject
//! identifiers, and program codes are the registrar's short codes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TdgError;

/// Unique identifier for a degree project (trabajo de grado).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub Uuid);

/// Unique identifier for one stage of a project's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageId(pub Uuid);

/// Unique identifier for a document submission within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub Uuid);

/// Unique identifier for a director endorsement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndorsementId(pub Uuid);

/// Unique identifier for a jury evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationId(pub Uuid);

/// Unique identifier for a remediation deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeadlineId(pub Uuid);

/// Unique identifier for a defense session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefenseSessionId(pub Uuid);

/// Unique identifier for an audit trail event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEventId(pub Uuid);

macro_rules! impl_uuid_id {
    ($ty:ident, $prefix:literal) => {
        impl $ty {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

impl_uuid_id!(ProjectId, "project");
impl_uuid_id!(StageId, "stage");
impl_uuid_id!(SubmissionId, "submission");
impl_uuid_id!(EndorsementId, "endorsement");
impl_uuid_id!(EvaluationId, "evaluation");
impl_uuid_id!(DeadlineId, "deadline");
impl_uuid_id!(DefenseSessionId, "defense");
impl_uuid_id!(AuditEventId, "audit");

/// Subject identifier of a user in the external identity provider.
///
/// The core never resolves these to names or roles — role checks happen
/// before the core is invoked. Must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a user identifier from the identity provider's subject.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the subject is empty or blank.
    pub fn new(subject: impl Into<String>) -> Result<Self, TdgError> {
        let subject = subject.into();
        if subject.trim().is_empty() {
            return Err(TdgError::Validation(
                "user identifier must not be empty".to_string(),
            ));
        }
        Ok(Self(subject))
    }

    /// Access the inner subject string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registrar short code of an academic program (e.g., `"ISIS"`).
///
/// Uppercased at construction; must be non-empty ASCII alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramCode(String);

impl ProgramCode {
    /// Create a program code, normalizing to uppercase.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the code is empty or contains
    /// non-alphanumeric characters.
    pub fn new(code: impl Into<String>) -> Result<Self, TdgError> {
        let code = code.into().trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(TdgError::Validation(
                "program code must not be empty".to_string(),
            ));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TdgError::Validation(format!(
                "program code must be ASCII alphanumeric, got: {code:?}"
            )));
        }
        Ok(Self(code))
    }

    /// Access the inner code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProgramCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
