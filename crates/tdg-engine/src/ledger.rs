//! # Stage Ledger Interface
//!
//! The narrow seam between the consolidation core and the external
//! relational store. The surrounding application owns the store and its
//! row-level access control; the core only needs these operations.
//!
//! Every record crossing this boundary is a typed struct from
//! `tdg-state` — the boundary is where the store's generic rows become
//! validated domain values.
//!
//! ## Failure semantics
//!
//! Implementations surface store failures verbatim through
//! [`LedgerError`]; the core never retries a write on its own. The
//! conditional [`StageLedger::update_stage`] is the concurrency guard:
//! it must compare the stored row's official state against `expected`
//! and fail with [`LedgerError::Conflict`] atomically, so a losing
//! concurrent consolidation cannot silently overwrite a winner.

use thiserror::Error;

use tdg_core::{OfficialState, ProjectId, StageId, StageName, SubmissionId};
use tdg_state::{
    AuditEvent, Deadline, DefenseSession, Endorsement, Evaluation, Project, ProjectStage,
    Submission,
};

/// Errors from the underlying store.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The requested record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Record kind.
        entity: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// A conditional update found the row in a different state.
    #[error("conditional update failed: {reason}")]
    Conflict {
        /// What the condition saw.
        reason: String,
    },

    /// An insert collided with an existing record.
    #[error("duplicate {entity}: {detail}")]
    Duplicate {
        /// Record kind.
        entity: &'static str,
        /// What collided.
        detail: String,
    },

    /// The store itself failed (connectivity, timeout, constraint).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// The operations the consolidation core needs from the external store.
///
/// Reads return owned copies; the core never holds references into the
/// store. Writes are single-row; the orchestrator sequences them and
/// owns idempotency across retries.
pub trait StageLedger {
    // ── Reads ────────────────────────────────────────────────────────

    /// Fetch a project by id.
    fn get_project(&self, id: &ProjectId) -> Result<Project, LedgerError>;

    /// Fetch a stage by id.
    fn get_stage(&self, id: &StageId) -> Result<ProjectStage, LedgerError>;

    /// Find the stage of a project by stage name, if it exists.
    fn find_stage(
        &self,
        project_id: &ProjectId,
        stage_name: StageName,
    ) -> Result<Option<ProjectStage>, LedgerError>;

    /// The highest-version submission of a stage, if any.
    fn latest_submission(&self, stage_id: &StageId) -> Result<Option<Submission>, LedgerError>;

    /// All endorsements recorded for a submission.
    fn endorsements(&self, submission_id: &SubmissionId) -> Result<Vec<Endorsement>, LedgerError>;

    /// All evaluations recorded for a stage (every submission version),
    /// in recording order.
    fn evaluations(&self, stage_id: &StageId) -> Result<Vec<Evaluation>, LedgerError>;

    /// The most recent defense session of a stage, if any.
    fn latest_defense_session(
        &self,
        stage_id: &StageId,
    ) -> Result<Option<DefenseSession>, LedgerError>;

    /// The most recently recorded defense grade of a stage, if any.
    fn latest_grade(&self, stage_id: &StageId) -> Result<Option<u8>, LedgerError> {
        Ok(self.latest_defense_session(stage_id)?.and_then(|s| s.grade))
    }

    /// Whether a deadline spawned by the given decision already exists
    /// for the stage.
    fn deadline_exists(
        &self,
        stage_id: &StageId,
        decision_digest: &str,
    ) -> Result<bool, LedgerError>;

    /// Whether an audit event for the given decision was already
    /// appended.
    fn has_audit_event(&self, decision_digest: &str) -> Result<bool, LedgerError>;

    /// All audit events of a project, in append order.
    fn audit_events(&self, project_id: &ProjectId) -> Result<Vec<AuditEvent>, LedgerError>;

    // ── Writes ───────────────────────────────────────────────────────

    /// Insert a new project.
    fn insert_project(&self, project: &Project) -> Result<(), LedgerError>;

    /// Replace a project row.
    fn update_project(&self, project: &Project) -> Result<(), LedgerError>;

    /// Insert a new stage. Fails with [`LedgerError::Duplicate`] when a
    /// stage already exists for the same `(project, stage_name)`.
    fn insert_stage(&self, stage: &ProjectStage) -> Result<(), LedgerError>;

    /// Conditionally replace a stage row.
    ///
    /// Succeeds only while the stored row's official state equals
    /// `expected`; otherwise fails with [`LedgerError::Conflict`]. The
    /// comparison and the write must be atomic.
    fn update_stage(
        &self,
        stage: &ProjectStage,
        expected: OfficialState,
    ) -> Result<(), LedgerError>;

    /// Insert a submission. Fails with [`LedgerError::Duplicate`] when
    /// the `(stage, version)` pair already exists.
    fn insert_submission(&self, submission: &Submission) -> Result<(), LedgerError>;

    /// Insert an endorsement.
    fn insert_endorsement(&self, endorsement: &Endorsement) -> Result<(), LedgerError>;

    /// Insert an evaluation. Fails with [`LedgerError::Duplicate`] when
    /// the `(submission, evaluator)` pair already exists.
    fn insert_evaluation(&self, evaluation: &Evaluation) -> Result<(), LedgerError>;

    /// Insert a deadline.
    fn insert_deadline(&self, deadline: &Deadline) -> Result<(), LedgerError>;

    /// Insert a defense session.
    fn insert_defense_session(&self, session: &DefenseSession) -> Result<(), LedgerError>;

    /// Replace a defense session row.
    fn update_defense_session(&self, session: &DefenseSession) -> Result<(), LedgerError>;

    /// Append an audit event. Append-only: there is no update or delete.
    fn append_audit_event(&self, event: &AuditEvent) -> Result<(), LedgerError>;
}
