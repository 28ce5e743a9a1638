//! # tdg-engine — Consolidation Core
//!
//! The decision core of the thesis pipeline: the rules that take a set
//! of jury verdicts (or a single defense grade) and produce one
//! official stage outcome, the follow-on effects that outcome demands
//! (successor stage, remediation deadline), and the orchestrator that
//! applies those effects against the stage ledger as one logical unit.
//!
//! ## Architecture
//!
//! The decision phase is pure and the effect phase is separate:
//!
//! - [`orchestrator::consolidate`] reads the current evaluations or
//!   grade through the [`ledger::StageLedger`] interface and returns a
//!   [`consolidation::Consolidation`] — either a decision or a pending
//!   report — without mutating anything.
//! - [`orchestrator::apply_decision`] executes the decision's effects
//!   (stage update, deadline, successor stage, audit event) against the
//!   ledger, guarded against concurrent consolidation and idempotent
//!   per decision digest.
//!
//! This split keeps the decision table deterministic and unit-testable
//! without a live store.
//!
//! ## Modules
//!
//! - `classifier` — pure verdict/grade classification and carry-over.
//! - `consolidation` — the per-stage decision table.
//! - `schedule` — calendar-day and business-day due dates.
//! - `ledger` — the narrow interface onto the external store.
//! - `memory` — in-memory ledger for tests and development.
//! - `orchestrator` — the effectful operations, one audit event each.

pub mod classifier;
pub mod consolidation;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod orchestrator;
pub mod schedule;

// ─── Classifier re-exports ──────────────────────────────────────────

pub use classifier::{
    carry_over_approvals, classify_defense_grade, classify_jury_consensus, ConsensusPolicy,
    DefenseOutcome, MIN_JURY_VERDICTS,
};

// ─── Consolidation re-exports ───────────────────────────────────────

pub use consolidation::{
    decide, Consolidation, ConsolidationDecision, DeadlinePlan, DeadlineRule, DecisionInputs,
    EvaluationInput, PendingReason, StageInputs,
};

// ─── Ledger re-exports ──────────────────────────────────────────────

pub use ledger::{LedgerError, StageLedger};
pub use memory::InMemoryLedger;

// ─── Orchestrator re-exports ────────────────────────────────────────

pub use error::EngineError;
pub use orchestrator::{
    apply_decision, assign_jury, cancel_project, consolidate, expire_project, finalize_project,
    open_successor_stage, record_defense_grade, record_endorsement, record_evaluation,
    register_project, schedule_defense, submit_version, Applied, ApplyContext,
};
