//! # Stage Workflow State Machine
//!
//! Models one stage of the approval pipeline from draft to closure.
//!
//! ## States
//!
//! ```text
//! Borrador ──submit()──▶ Radicada ──begin_review()──▶ EnRevision
//!                            ▲                            │
//!                            │                     consolidate()
//!                            │                       │        │
//!                            │                       ▼        ▼
//!                            └──submit()──── ConObservaciones  Cerrada (terminal)
//! ```
//!
//! Consolidation records the official outcome and moves the workflow to
//! `Cerrada`, or to `ConObservaciones` when remediation is expected.
//! A stage in `ConObservaciones` re-opens through `submit()` (a new
//! submission version), which resets the official outcome to
//! `Pendiente` so endorsement and evaluation can repeat. `Cerrada` is
//! terminal.
//!
//! ## Invariant
//!
//! `official_state ≠ PENDIENTE` implies
//! `system_state ∈ {CERRADA, CON_OBSERVACIONES}` — an official outcome
//! exists only on a consolidated stage. Both writes happen in
//! [`ProjectStage::consolidate`], the only method that sets an outcome.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tdg_core::{OfficialState, ProjectId, StageId, StageName, SystemState, Timestamp, UserId};

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during stage workflow transitions.
#[derive(Error, Debug)]
pub enum StageError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid stage transition: {from} -> {to}")]
    InvalidTransition {
        /// Current workflow state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// Stage is closed and cannot transition.
    #[error("stage {stage_id} is closed and cannot transition")]
    Closed {
        /// The stage identifier.
        stage_id: String,
    },

    /// Consolidation arguments violate the stage invariant.
    #[error("invalid consolidation: {0}")]
    InvalidConsolidation(String),
}

// ─── Transition Evidence ─────────────────────────────────────────────

/// Evidence for a stage workflow transition.
#[derive(Debug, Clone)]
pub struct StageTransitionEvidence {
    /// Reason for the transition.
    pub reason: String,
    /// Actor who initiated the transition.
    pub actor: Option<UserId>,
}

/// Record of a stage workflow transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTransitionRecord {
    /// Workflow state before the transition.
    pub from_state: SystemState,
    /// Workflow state after the transition.
    pub to_state: SystemState,
    /// Official outcome after the transition.
    pub official_state: OfficialState,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Reason for the transition.
    pub reason: String,
}

// ─── Project Stage ───────────────────────────────────────────────────

/// One stage of a project's pipeline, with workflow state, official
/// outcome, and transition history.
///
/// Enforces valid workflow transitions. Invalid transitions are
/// rejected with structured errors naming the current state and the
/// attempted target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStage {
    /// Unique stage identifier.
    pub id: StageId,
    /// The project this stage belongs to.
    pub project_id: ProjectId,
    /// Which pipeline stage this is.
    pub stage_name: StageName,
    /// Current workflow position.
    pub system_state: SystemState,
    /// Formally recorded outcome.
    pub official_state: OfficialState,
    /// Final grade, recorded only for the defense stage.
    pub final_grade: Option<u8>,
    /// Consolidated observations (one evaluator line per row).
    pub observations: String,
    /// Hex digest of the consolidation decision applied to this stage.
    ///
    /// Set exactly once per consolidation; used to recognize a retried
    /// apply of the same decision.
    pub decision_digest: Option<String>,
    /// When the stage was created.
    pub created_at: Timestamp,
    /// Ordered log of all workflow transitions.
    pub transitions: Vec<StageTransitionRecord>,
}

impl ProjectStage {
    /// Create a new stage in `Borrador` with no official outcome.
    pub fn new(project_id: ProjectId, stage_name: StageName) -> Self {
        Self {
            id: StageId::new(),
            project_id,
            stage_name,
            system_state: SystemState::Borrador,
            official_state: OfficialState::Pendiente,
            final_grade: None,
            observations: String::new(),
            decision_digest: None,
            created_at: Timestamp::now(),
            transitions: Vec::new(),
        }
    }

    /// File a submission (BORRADOR → RADICADA, or CON_OBSERVACIONES →
    /// RADICADA for a resubmission).
    ///
    /// A resubmission resets the official outcome to `Pendiente` and
    /// clears the decision digest: the corrected version goes through
    /// endorsement and evaluation again.
    pub fn submit(&mut self, evidence: StageTransitionEvidence) -> Result<(), StageError> {
        match self.system_state {
            SystemState::Borrador => {
                self.do_transition(SystemState::Radicada, &evidence.reason);
                Ok(())
            }
            SystemState::ConObservaciones => {
                self.official_state = OfficialState::Pendiente;
                self.decision_digest = None;
                self.do_transition(SystemState::Radicada, &evidence.reason);
                Ok(())
            }
            SystemState::Cerrada => Err(StageError::Closed {
                stage_id: self.id.to_string(),
            }),
            other => Err(StageError::InvalidTransition {
                from: other.to_string(),
                to: SystemState::Radicada.to_string(),
            }),
        }
    }

    /// Begin committee/jury review (RADICADA → EN_REVISION).
    ///
    /// Invoked on jury assignment; the endorsement gate is checked by
    /// the orchestrator before this point.
    pub fn begin_review(&mut self, evidence: StageTransitionEvidence) -> Result<(), StageError> {
        self.require_state(SystemState::Radicada, SystemState::EnRevision)?;
        self.do_transition(SystemState::EnRevision, &evidence.reason);
        Ok(())
    }

    /// Record the consolidated outcome (EN_REVISION → CERRADA or
    /// CON_OBSERVACIONES).
    ///
    /// The only method that sets an official outcome; it writes outcome
    /// and workflow state together so the stage invariant holds by
    /// construction.
    ///
    /// # Errors
    ///
    /// Rejects a `Pendiente` outcome, a target state that is neither
    /// `Cerrada` nor `ConObservaciones`, and any call from a workflow
    /// state other than `EnRevision`.
    pub fn consolidate(
        &mut self,
        outcome: OfficialState,
        next_state: SystemState,
        final_grade: Option<u8>,
        observations: String,
        decision_digest: String,
        evidence: StageTransitionEvidence,
    ) -> Result<(), StageError> {
        if !outcome.is_decided() {
            return Err(StageError::InvalidConsolidation(
                "consolidation requires a decided outcome, got PENDIENTE".to_string(),
            ));
        }
        if !matches!(
            next_state,
            SystemState::Cerrada | SystemState::ConObservaciones
        ) {
            return Err(StageError::InvalidConsolidation(format!(
                "consolidation must land in CERRADA or CON_OBSERVACIONES, got {next_state}"
            )));
        }
        self.require_state(SystemState::EnRevision, next_state)?;

        self.official_state = outcome;
        self.final_grade = final_grade;
        self.observations = observations;
        self.decision_digest = Some(decision_digest);
        self.do_transition(next_state, &evidence.reason);
        Ok(())
    }

    /// Whether an official outcome has been recorded.
    pub fn is_consolidated(&self) -> bool {
        self.official_state.is_decided()
    }

    /// Whether the stage is closed (terminal).
    pub fn is_closed(&self) -> bool {
        self.system_state.is_terminal()
    }

    /// Validate that the stage is in the expected workflow state.
    fn require_state(
        &self,
        expected: SystemState,
        target: SystemState,
    ) -> Result<(), StageError> {
        if self.system_state.is_terminal() {
            return Err(StageError::Closed {
                stage_id: self.id.to_string(),
            });
        }
        if self.system_state != expected {
            return Err(StageError::InvalidTransition {
                from: self.system_state.to_string(),
                to: target.to_string(),
            });
        }
        Ok(())
    }

    /// Record a workflow transition.
    fn do_transition(&mut self, to: SystemState, reason: &str) {
        self.transitions.push(StageTransitionRecord {
            from_state: self.system_state,
            to_state: to,
            official_state: self.official_state,
            timestamp: Timestamp::now(),
            reason: reason.to_string(),
        });
        self.system_state = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(reason: &str) -> StageTransitionEvidence {
        StageTransitionEvidence {
            reason: reason.to_string(),
            actor: UserId::new("coordinador-01").ok(),
        }
    }

    fn make_stage() -> ProjectStage {
        ProjectStage::new(ProjectId::new(), StageName::Anteproyecto)
    }

    fn make_stage_in_review() -> ProjectStage {
        let mut stage = make_stage();
        stage.submit(evidence("Documento radicado")).unwrap();
        stage.begin_review(evidence("Jurados asignados")).unwrap();
        stage
    }

    // ── Basic workflow tests ─────────────────────────────────────────

    #[test]
    fn test_new_stage_is_draft_and_pending() {
        let stage = make_stage();
        assert_eq!(stage.system_state, SystemState::Borrador);
        assert_eq!(stage.official_state, OfficialState::Pendiente);
        assert!(!stage.is_consolidated());
        assert!(!stage.is_closed());
    }

    #[test]
    fn test_submit_moves_to_radicada() {
        let mut stage = make_stage();
        stage.submit(evidence("Primera entrega")).unwrap();
        assert_eq!(stage.system_state, SystemState::Radicada);
        assert_eq!(stage.transitions.len(), 1);
    }

    #[test]
    fn test_begin_review_requires_radicada() {
        let mut stage = make_stage();
        assert!(stage.begin_review(evidence("test")).is_err());
        stage.submit(evidence("entrega")).unwrap();
        stage.begin_review(evidence("jurados")).unwrap();
        assert_eq!(stage.system_state, SystemState::EnRevision);
    }

    #[test]
    fn test_cannot_submit_twice_without_review() {
        let mut stage = make_stage();
        stage.submit(evidence("entrega")).unwrap();
        assert!(stage.submit(evidence("otra vez")).is_err());
    }

    // ── Consolidation tests ──────────────────────────────────────────

    #[test]
    fn test_consolidate_to_cerrada() {
        let mut stage = make_stage_in_review();
        stage
            .consolidate(
                OfficialState::Aprobada,
                SystemState::Cerrada,
                None,
                "jurado-1: APROBADO".to_string(),
                "abc123".to_string(),
                evidence("Consolidación"),
            )
            .unwrap();
        assert_eq!(stage.official_state, OfficialState::Aprobada);
        assert_eq!(stage.system_state, SystemState::Cerrada);
        assert_eq!(stage.decision_digest.as_deref(), Some("abc123"));
        assert!(stage.is_consolidated());
        assert!(stage.is_closed());
    }

    #[test]
    fn test_consolidate_to_con_observaciones() {
        let mut stage = make_stage_in_review();
        stage
            .consolidate(
                OfficialState::AprobadaConModificaciones,
                SystemState::ConObservaciones,
                None,
                String::new(),
                "d1".to_string(),
                evidence("Modificaciones requeridas"),
            )
            .unwrap();
        assert_eq!(stage.system_state, SystemState::ConObservaciones);
        assert!(stage.is_consolidated());
        assert!(!stage.is_closed());
    }

    #[test]
    fn test_consolidate_rejects_pendiente_outcome() {
        let mut stage = make_stage_in_review();
        let result = stage.consolidate(
            OfficialState::Pendiente,
            SystemState::Cerrada,
            None,
            String::new(),
            "d1".to_string(),
            evidence("test"),
        );
        assert!(matches!(result, Err(StageError::InvalidConsolidation(_))));
    }

    #[test]
    fn test_consolidate_rejects_open_target_state() {
        let mut stage = make_stage_in_review();
        let result = stage.consolidate(
            OfficialState::Aprobada,
            SystemState::Radicada,
            None,
            String::new(),
            "d1".to_string(),
            evidence("test"),
        );
        assert!(matches!(result, Err(StageError::InvalidConsolidation(_))));
    }

    #[test]
    fn test_consolidate_requires_en_revision() {
        let mut stage = make_stage();
        stage.submit(evidence("entrega")).unwrap();
        let result = stage.consolidate(
            OfficialState::Aprobada,
            SystemState::Cerrada,
            None,
            String::new(),
            "d1".to_string(),
            evidence("test"),
        );
        assert!(result.is_err());
    }

    // ── Resubmission tests ───────────────────────────────────────────

    #[test]
    fn test_resubmission_resets_official_state() {
        let mut stage = make_stage_in_review();
        stage
            .consolidate(
                OfficialState::AprobadaConModificaciones,
                SystemState::ConObservaciones,
                None,
                "jurado-1: APLAZADO_POR_MODIFICACIONES".to_string(),
                "d1".to_string(),
                evidence("Modificaciones"),
            )
            .unwrap();

        stage.submit(evidence("Versión corregida")).unwrap();
        assert_eq!(stage.system_state, SystemState::Radicada);
        assert_eq!(stage.official_state, OfficialState::Pendiente);
        assert_eq!(stage.decision_digest, None);
        assert!(!stage.is_consolidated());
    }

    #[test]
    fn test_cerrada_is_terminal() {
        let mut stage = make_stage_in_review();
        stage
            .consolidate(
                OfficialState::NoAprobada,
                SystemState::Cerrada,
                None,
                String::new(),
                "d1".to_string(),
                evidence("No aprobado"),
            )
            .unwrap();

        let result = stage.submit(evidence("should fail"));
        assert!(matches!(result, Err(StageError::Closed { .. })));
    }

    // ── Transition log tests ─────────────────────────────────────────

    #[test]
    fn test_transition_log_records_full_path() {
        let mut stage = make_stage_in_review();
        stage
            .consolidate(
                OfficialState::Aprobada,
                SystemState::Cerrada,
                None,
                String::new(),
                "d1".to_string(),
                evidence("cierre"),
            )
            .unwrap();

        assert_eq!(stage.transitions.len(), 3);
        assert_eq!(stage.transitions[0].from_state, SystemState::Borrador);
        assert_eq!(stage.transitions[0].to_state, SystemState::Radicada);
        assert_eq!(stage.transitions[1].to_state, SystemState::EnRevision);
        assert_eq!(stage.transitions[2].to_state, SystemState::Cerrada);
        assert_eq!(
            stage.transitions[2].official_state,
            OfficialState::Aprobada
        );
    }

    // ── Serialization tests ──────────────────────────────────────────

    #[test]
    fn test_stage_serialization_roundtrip() {
        let stage = make_stage_in_review();
        let json = serde_json::to_string(&stage).unwrap();
        let parsed: ProjectStage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, stage.id);
        assert_eq!(parsed.system_state, stage.system_state);
        assert_eq!(parsed.official_state, stage.official_state);
    }
}
