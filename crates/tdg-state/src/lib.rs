//! # tdg-state — Lifecycle State Machines and Ledger Records
//!
//! Implements the stateful records of the thesis pipeline. Each state
//! machine uses enum states with validated transitions — transitions
//! are methods returning `Result`, and every accepted transition is
//! appended to the record's transition log.
//!
//! ## State Machines
//!
//! - **ProjectStage** (`stage.rs`): the per-stage workflow
//!   `BORRADOR → RADICADA → EN_REVISION → {CON_OBSERVACIONES, CERRADA}`,
//!   carrying the official outcome alongside the workflow position and
//!   enforcing the invariant that an official outcome only exists on a
//!   consolidated stage.
//!
//! - **Project** (`project.rs`): the global status
//!   `VIGENTE → {FINALIZADO, VENCIDO, CANCELADO}` — one regular exit
//!   (final delivery) and two administrative overrides.
//!
//! ## Records
//!
//! `records.rs` defines the remaining ledger rows: `Submission`,
//! `Endorsement`, `Evaluation`, `Deadline`, `DefenseSession`, and the
//! append-only `AuditEvent` with its `AuditKind` catalog.
//!
//! ## Design
//!
//! Enum states with runtime-validated transitions were chosen over
//! typestate types: stage rows round-trip through an external store, so
//! the state must be data, and the invariants (one workflow position,
//! officially decided only when consolidated) are straightforward to
//! validate at the transition boundary.

pub mod project;
pub mod records;
pub mod stage;

// ─── Stage re-exports ───────────────────────────────────────────────

pub use stage::{ProjectStage, StageError, StageTransitionEvidence, StageTransitionRecord};

// ─── Project re-exports ─────────────────────────────────────────────

pub use project::{Project, ProjectError, ProjectTransitionRecord};

// ─── Record re-exports ──────────────────────────────────────────────

pub use records::{
    AuditEvent, AuditKind, Deadline, DefenseSession, Endorsement, Evaluation, Submission,
};
