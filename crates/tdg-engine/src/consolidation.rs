//! # Consolidation Decision Table
//!
//! Converts classified outcomes into a [`ConsolidationDecision`]: the
//! official state a stage lands in, the workflow state it closes into,
//! and the follow-on effects (successor stage, remediation deadline)
//! the outcome demands.
//!
//! The decision phase is pure: [`decide`] takes the stage row and its
//! inputs and returns either a decision or a pending report, touching
//! nothing. The orchestrator applies decisions separately.
//!
//! ## Decision table
//!
//! | Stage | Outcome | Closes into | Successor | Deadline |
//! |---|---|---|---|---|
//! | PROPUESTA | APROBADA_CON_MODIFICACIONES | CERRADA | — | +5 business days |
//! | PROPUESTA | other | CERRADA | — | — |
//! | ANTEPROYECTO | APROBADA | CERRADA | INFORME_FINAL | — |
//! | ANTEPROYECTO | APROBADA_CON_MODIFICACIONES | CERRADA | — | +10 calendar days |
//! | ANTEPROYECTO | NO_APROBADA | CERRADA | — | — |
//! | INFORME_FINAL | APROBADA | CERRADA | SUSTENTACION | — |
//! | INFORME_FINAL | APROBADA_CON_MODIFICACIONES | CON_OBSERVACIONES | — | coordinator-chosen |
//! | INFORME_FINAL | NO_APROBADA | CERRADA | — | — |
//! | SUSTENTACION | grade ≥ 70 | CERRADA | — | +8 calendar days (final delivery) |
//! | SUSTENTACION | grade < 70 | CERRADA | — | — |
//!
//! An approved PROPUESTA spawns no successor here: the pre-project
//! stage is opened by the separate, guarded
//! [`crate::orchestrator::open_successor_stage`] operation.

use serde::{Deserialize, Serialize};

use tdg_core::{
    sha256_hex, CanonicalBytes, DefenseLabel, OfficialResult, OfficialState, ProjectId, StageId,
    StageName, SystemState, TdgError, UserId,
};
use tdg_state::{Evaluation, ProjectStage};

use crate::classifier::{
    classify_defense_grade, classify_jury_consensus, ConsensusPolicy, MIN_JURY_VERDICTS,
};
use crate::error::EngineError;

/// Calendar days granted for pre-project corrections.
pub const ANTEPROYECTO_CORRECTION_DAYS: u32 = 10;

/// Business days granted for proposal adjustments.
pub const PROPUESTA_CORRECTION_BUSINESS_DAYS: u32 = 5;

/// Calendar days granted for the final delivery after a passed defense.
pub const FINAL_DELIVERY_DAYS: u32 = 8;

// ─── Pending ─────────────────────────────────────────────────────────

/// Why a stage cannot consolidate yet. A normal state, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingReason {
    /// No submission has been filed for the stage.
    AwaitingSubmission,
    /// Fewer jury verdicts than required.
    InsufficientEvaluations {
        /// Verdicts present.
        have: usize,
        /// Verdicts required.
        need: usize,
    },
    /// The defense has not been graded.
    AwaitingGrade,
}

impl std::fmt::Display for PendingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingSubmission => f.write_str("waiting for a submission"),
            Self::InsufficientEvaluations { have, need } => write!(
                f,
                "insufficient evaluations: {have} of {need} required"
            ),
            Self::AwaitingGrade => f.write_str("waiting for the defense grade"),
        }
    }
}

// ─── Decision ────────────────────────────────────────────────────────

/// How a remediation deadline's due date is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadlineRule {
    /// Due a fixed number of calendar days after the decision is applied.
    CalendarDays(u32),
    /// Due a fixed number of business days (Mon–Fri) after the decision
    /// is applied.
    BusinessDays(u32),
    /// Due on a date the coordinator supplies when applying. No default.
    CoordinatorSet,
}

/// A deadline the decision demands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlinePlan {
    /// What is due.
    pub description: String,
    /// How the due date is determined.
    pub rule: DeadlineRule,
}

/// Snapshot of one evaluation as it entered the decision.
///
/// Carries no row identifiers or timestamps so that recomputing the
/// decision from the same ledger state produces identical canonical
/// bytes — the decision digest is the idempotency key for applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationInput {
    /// The evaluator.
    pub evaluator_id: UserId,
    /// The verdict.
    pub official_result: OfficialResult,
    /// Whether the verdict was carried over from a prior version.
    pub carried_over: bool,
    /// Evaluator observations.
    pub observations: String,
}

impl From<&Evaluation> for EvaluationInput {
    fn from(eval: &Evaluation) -> Self {
        Self {
            evaluator_id: eval.evaluator_id.clone(),
            official_result: eval.official_result,
            carried_over: eval.carried_over,
            observations: eval.observations.clone(),
        }
    }
}

/// The raw inputs a decision was computed from, kept for the audit
/// trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionInputs {
    /// Jury verdicts (carry-over already applied).
    Jury {
        /// The verdict snapshots, in evaluator order.
        evaluations: Vec<EvaluationInput>,
    },
    /// A single defense grade.
    Defense {
        /// The validated grade.
        grade: u8,
    },
}

/// What consolidating a stage means: the official outcome plus every
/// follow-on effect, computed once and applied atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationDecision {
    /// The stage being consolidated.
    pub stage_id: StageId,
    /// The project the stage belongs to.
    pub project_id: ProjectId,
    /// Which pipeline stage this is.
    pub stage_name: StageName,
    /// The submission version under evaluation (verdict stages).
    pub submission_version: Option<u32>,
    /// Official outcome.
    pub official_state: OfficialState,
    /// Workflow state the stage lands in.
    pub next_system_state: SystemState,
    /// Final grade (defense only).
    pub final_grade: Option<u8>,
    /// Distinction label (defense only).
    pub grade_label: Option<DefenseLabel>,
    /// Successor stage to spawn, if any.
    pub successor: Option<StageName>,
    /// Remediation or delivery deadline, if any.
    pub deadline: Option<DeadlinePlan>,
    /// Consolidated observations, one evaluator line per row.
    pub observations: String,
    /// Human-readable summary for the audit trail.
    pub audit_description: String,
    /// The raw inputs the decision was computed from.
    pub inputs: DecisionInputs,
}

impl ConsolidationDecision {
    /// The decision's content digest (hex), its identity for idempotent
    /// application.
    pub fn digest_hex(&self) -> Result<String, TdgError> {
        let canonical = CanonicalBytes::new(self).map_err(TdgError::from)?;
        Ok(sha256_hex(&canonical))
    }
}

/// Outcome of the decision phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Consolidation {
    /// The stage cannot consolidate yet.
    Pending(PendingReason),
    /// The stage consolidates with this decision.
    Decided(ConsolidationDecision),
}

// ─── Inputs ──────────────────────────────────────────────────────────

/// Raw inputs handed to the decision phase.
#[derive(Debug, Clone)]
pub enum StageInputs<'a> {
    /// Jury verdicts for the submission under evaluation, carry-over
    /// already applied, with the submission's version.
    Jury {
        /// The evaluations, in evaluator order.
        evaluations: &'a [Evaluation],
        /// The submission version under evaluation.
        version: u32,
    },
    /// The latest recorded defense grade, if any.
    Grade(Option<u8>),
}

// ─── The Table ───────────────────────────────────────────────────────

/// Decide the consolidation of `stage` from its inputs.
///
/// Pure: reads nothing, writes nothing. Fewer inputs than required
/// yields [`Consolidation::Pending`], never an error.
///
/// # Errors
///
/// Rejects a verdict/grade input shape that does not match the stage
/// kind, and out-of-range grades.
pub fn decide(stage: &ProjectStage, inputs: StageInputs<'_>) -> Result<Consolidation, EngineError> {
    match (stage.stage_name.is_graded(), inputs) {
        (false, StageInputs::Jury {
            evaluations,
            version,
        }) => decide_from_verdicts(stage, evaluations, version),
        (true, StageInputs::Grade(grade)) => decide_from_grade(stage, grade),
        (false, StageInputs::Grade(_)) => Err(EngineError::Core(TdgError::Validation(format!(
            "stage {} consolidates from jury verdicts, not a grade",
            stage.stage_name
        )))),
        (true, StageInputs::Jury { .. }) => Err(EngineError::NotDefenseStage {
            stage_id: stage.id.to_string(),
            stage_name: stage.stage_name.to_string(),
        }),
    }
}

fn decide_from_verdicts(
    stage: &ProjectStage,
    evaluations: &[Evaluation],
    version: u32,
) -> Result<Consolidation, EngineError> {
    // Stage routing guarantees a policy exists for verdict stages.
    let Some(policy) = ConsensusPolicy::for_stage(stage.stage_name) else {
        return Err(EngineError::NotDefenseStage {
            stage_id: stage.id.to_string(),
            stage_name: stage.stage_name.to_string(),
        });
    };

    let results: Vec<_> = evaluations.iter().map(|e| e.official_result).collect();
    let Some(outcome) = classify_jury_consensus(policy, &results) else {
        return Ok(Consolidation::Pending(PendingReason::InsufficientEvaluations {
            have: results.len(),
            need: MIN_JURY_VERDICTS,
        }));
    };

    let (next_system_state, successor, deadline) = stage_effects(stage.stage_name, outcome);
    let observations = verdict_observations(evaluations);
    let audit_description = format!(
        "Etapa {} consolidada: {} ({} conceptos)",
        stage.stage_name,
        outcome,
        evaluations.len()
    );

    Ok(Consolidation::Decided(ConsolidationDecision {
        stage_id: stage.id,
        project_id: stage.project_id,
        stage_name: stage.stage_name,
        submission_version: Some(version),
        official_state: outcome,
        next_system_state,
        final_grade: None,
        grade_label: None,
        successor,
        deadline,
        observations,
        audit_description,
        inputs: DecisionInputs::Jury {
            evaluations: evaluations.iter().map(EvaluationInput::from).collect(),
        },
    }))
}

fn decide_from_grade(
    stage: &ProjectStage,
    grade: Option<u8>,
) -> Result<Consolidation, EngineError> {
    let Some(grade) = grade else {
        return Ok(Consolidation::Pending(PendingReason::AwaitingGrade));
    };
    let outcome = classify_defense_grade(i64::from(grade))?;

    let deadline = (outcome.official_state == OfficialState::Aprobada).then(|| DeadlinePlan {
        description: "Entrega final del documento".to_string(),
        rule: DeadlineRule::CalendarDays(FINAL_DELIVERY_DAYS),
    });

    let observations = format!(
        "Nota de sustentación: {}/100 ({})",
        outcome.grade,
        outcome.label
    );
    let audit_description = format!(
        "Etapa {} consolidada: {} con nota {} ({})",
        stage.stage_name, outcome.official_state, outcome.grade, outcome.label
    );

    Ok(Consolidation::Decided(ConsolidationDecision {
        stage_id: stage.id,
        project_id: stage.project_id,
        stage_name: stage.stage_name,
        submission_version: None,
        official_state: outcome.official_state,
        next_system_state: SystemState::Cerrada,
        final_grade: Some(outcome.grade),
        grade_label: Some(outcome.label),
        successor: None,
        deadline,
        observations,
        audit_description,
        inputs: DecisionInputs::Defense {
            grade: outcome.grade,
        },
    }))
}

/// The follow-on effects column of the decision table for verdict
/// stages: workflow landing state, successor, deadline.
fn stage_effects(
    stage_name: StageName,
    outcome: OfficialState,
) -> (SystemState, Option<StageName>, Option<DeadlinePlan>) {
    use tdg_core::OfficialState::{Aprobada, AprobadaConModificaciones};
    use tdg_core::StageName::{Anteproyecto, InformeFinal, Propuesta, Sustentacion};

    match (stage_name, outcome) {
        (Anteproyecto, Aprobada) => (SystemState::Cerrada, Some(InformeFinal), None),
        (Anteproyecto, AprobadaConModificaciones) => (
            SystemState::Cerrada,
            None,
            Some(DeadlinePlan {
                description: "Correcciones al anteproyecto".to_string(),
                rule: DeadlineRule::CalendarDays(ANTEPROYECTO_CORRECTION_DAYS),
            }),
        ),
        (InformeFinal, Aprobada) => (SystemState::Cerrada, Some(Sustentacion), None),
        (InformeFinal, AprobadaConModificaciones) => (
            // The only consolidation that keeps the stage open for a
            // corrected version under the same stage row.
            SystemState::ConObservaciones,
            None,
            Some(DeadlinePlan {
                description: "Correcciones al informe final".to_string(),
                rule: DeadlineRule::CoordinatorSet,
            }),
        ),
        (Propuesta, AprobadaConModificaciones) => (
            SystemState::Cerrada,
            None,
            Some(DeadlinePlan {
                description: "Ajustes a la propuesta".to_string(),
                rule: DeadlineRule::BusinessDays(PROPUESTA_CORRECTION_BUSINESS_DAYS),
            }),
        ),
        // Every remaining verdict outcome closes the stage with no
        // follow-on effects. An approved PROPUESTA spawns its successor
        // through open_successor_stage, not here.
        (Propuesta | Anteproyecto | InformeFinal | Sustentacion, _) => {
            (SystemState::Cerrada, None, None)
        }
    }
}

/// One line per evaluator, in evaluator order: `who: verdict. comments`.
fn verdict_observations(evaluations: &[Evaluation]) -> String {
    evaluations
        .iter()
        .map(|e| {
            if e.observations.is_empty() {
                format!("{}: {}", e.evaluator_id, e.official_result)
            } else {
                format!("{}: {}. {}", e.evaluator_id, e.official_result, e.observations)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ─── Tests ───────────────────────────────────────────────────────────
