//! # Engine Errors
//!
//! The error taxonomy of the consolidation core. "Not enough
//! evaluations yet" is deliberately absent — that is a normal pending
//! state reported through `Consolidation::Pending`, never an error.
//! Errors here are rejections (constraint violations, the concurrency
//! guard) or ledger failures surfaced verbatim.

use thiserror::Error;

use tdg_core::TdgError;
use tdg_state::{ProjectError, StageError};

use crate::ledger::LedgerError;

/// Errors surfaced by the consolidation engine and orchestrator.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Grade outside [0, 100]. Rejected before any mutation.
    #[error("invalid grade {grade}: must be an integer between 0 and 100")]
    InvalidGrade {
        /// The rejected grade.
        grade: i64,
    },

    /// Evaluation or consolidation attempted without a prior approved
    /// director endorsement.
    #[error("stage {stage_id} has no approved endorsement for submission version {version}")]
    EndorsementMissing {
        /// The stage identifier.
        stage_id: String,
        /// The submission version lacking an endorsement.
        version: u32,
    },

    /// The concurrent-write guard tripped: someone else already
    /// consolidated this stage, or the decision was already fully
    /// applied. The caller must refresh.
    #[error("stage {stage_id} was already consolidated")]
    AlreadyConsolidated {
        /// The stage identifier.
        stage_id: String,
    },

    /// The decision requires a coordinator-chosen due date and none was
    /// supplied. There is no default.
    #[error("a coordinator-chosen due date is required for this decision and none was supplied")]
    MissingDueDate,

    /// The evaluator already issued a verdict for this submission.
    #[error("evaluator {evaluator_id} already evaluated submission version {version}")]
    DuplicateEvaluation {
        /// The evaluator.
        evaluator_id: String,
        /// The submission version.
        version: u32,
    },

    /// Verdicts can only be recorded while the stage is under review.
    #[error("stage {stage_id} is not under review (current state: {state})")]
    NotUnderReview {
        /// The stage identifier.
        stage_id: String,
        /// The current workflow state.
        state: String,
    },

    /// The operation only applies to the defense stage.
    #[error("stage {stage_id} is {stage_name}, not a defense stage")]
    NotDefenseStage {
        /// The stage identifier.
        stage_id: String,
        /// The actual stage name.
        stage_name: String,
    },

    /// A successor stage can only be opened once its predecessor is
    /// approved.
    #[error("cannot open {stage_name}: {reason}")]
    PredecessorNotApproved {
        /// The stage that was to be opened.
        stage_name: String,
        /// Why the opening was rejected.
        reason: String,
    },

    /// Final delivery requires an approved, closed defense stage.
    #[error("final delivery not allowed: {reason}")]
    FinalDeliveryNotAllowed {
        /// Why the delivery was rejected.
        reason: String,
    },

    /// The decision does not belong to the stage it was applied to.
    #[error("decision targets stage {decision_stage}, not {stage_id}")]
    DecisionStageMismatch {
        /// The stage the decision was computed for.
        decision_stage: String,
        /// The stage the apply was invoked on.
        stage_id: String,
    },

    /// The stage workflow machine rejected a transition.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// The project status machine rejected a transition.
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// An underlying ledger operation failed. Surfaced verbatim; the
    /// whole call may be retried safely.
    #[error("ledger operation failed: {0}")]
    Ledger(#[from] LedgerError),

    /// A foundational validation or canonicalization failure.
    #[error(transparent)]
    Core(#[from] TdgError),
}
