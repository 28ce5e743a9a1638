//! # tdg-core — Foundational Types for the Trabajo de Grado Stack
//!
//! This crate is the bedrock of the thesis-tracking stack. It defines the
//! type-system primitives shared by every other crate in the workspace;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `ProjectId`, `StageId`,
//!    `EvaluationId`, `UserId`, `ProgramCode` — all newtypes with validated
//!    constructors. No bare strings or bare UUIDs for identifiers.
//!
//! 2. **Single definition per domain enum.** `StageName`, `SystemState`,
//!    `OfficialState`, `OfficialResult`, `GlobalStatus` are each defined
//!    once, with exhaustive `match` everywhere. The wire labels are the
//!    uppercase Spanish strings the academic office records officially
//!    (`"ANTEPROYECTO"`, `"APROBADA_CON_MODIFICACIONES"`, …).
//!
//! 3. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision, so deadline arithmetic and audit
//!    ordering are deterministic.
//!
//! 4. **`CanonicalBytes` → `ContentDigest`.** All digest computation flows
//!    through `CanonicalBytes::new()`. Decision digests (the idempotency
//!    key for applying a consolidation) and audit metadata digests cannot
//!    be produced from non-canonical bytes.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tdg-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod canonical;
pub mod digest;
pub mod domain;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use domain::{
    DefenseLabel, GlobalStatus, Modality, OfficialResult, OfficialState, StageName, SystemState,
};
pub use error::TdgError;
pub use identity::{
    AuditEventId, DeadlineId, DefenseSessionId, EndorsementId, EvaluationId, ProgramCode,
    ProjectId, StageId, SubmissionId, UserId,
};
pub use temporal::Timestamp;
