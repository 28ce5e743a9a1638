//! # Verdict and Grade Classification
//!
//! Pure, stateless functions mapping raw evaluation inputs to official
//! outcomes. Nothing here touches the ledger.
//!
//! Two aggregation policies exist side by side: the pre-project
//! committee applies an any-veto rule while the final report requires
//! unanimity. See [`ConsensusPolicy`] for the details.

use serde::{Deserialize, Serialize};

use tdg_core::{DefenseLabel, OfficialResult, OfficialState, StageName, SubmissionId};
use tdg_state::Evaluation;

use crate::error::EngineError;

/// Minimum number of jury verdicts required before a verdict-based
/// stage can consolidate.
pub const MIN_JURY_VERDICTS: usize = 2;

/// Lowest passing defense grade.
pub const PASSING_GRADE: u8 = 70;

/// Lowest grade earning the MERITORIA distinction.
pub const MERITORIA_FLOOR: u8 = 95;

/// The single grade earning the LAUREADA distinction.
pub const LAUREADA_GRADE: u8 = 100;

// ─── Consensus Policies ──────────────────────────────────────────────

/// How a set of jury verdicts aggregates into one official outcome.
///
/// The two policies are genuinely different and are kept distinct on
/// purpose. The proposal and pre-project committees apply **any-veto**:
/// a single NO_APROBADO sinks the stage. The final report applies
/// **unanimity**: the stage is approved only if every juror approves,
/// rejected only if every juror rejects, and lands in
/// APROBADA_CON_MODIFICACIONES on any disagreement.
///
/// Whether this asymmetry is intentional academic policy or an
/// inherited inconsistency is unconfirmed; it is reproduced as-is
/// pending a ruling from the coordination office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusPolicy {
    /// Any NO_APROBADO rejects; any APLAZADO_POR_MODIFICACIONES defers;
    /// otherwise approved.
    AnyVeto,
    /// All APROBADO approves; all NO_APROBADO rejects; any mix defers.
    Unanimity,
}

impl ConsensusPolicy {
    /// The aggregation policy for a verdict-based stage, or `None` for
    /// the grade-based defense stage.
    pub fn for_stage(stage_name: StageName) -> Option<Self> {
        match stage_name {
            StageName::Propuesta | StageName::Anteproyecto => Some(Self::AnyVeto),
            StageName::InformeFinal => Some(Self::Unanimity),
            StageName::Sustentacion => None,
        }
    }
}

/// Aggregate jury verdicts into one official outcome under the given
/// policy.
///
/// Returns `None` when fewer than [`MIN_JURY_VERDICTS`] verdicts are
/// present — that is a pending state, not an error, and the caller
/// reports it as such.
pub fn classify_jury_consensus(
    policy: ConsensusPolicy,
    results: &[OfficialResult],
) -> Option<OfficialState> {
    if results.len() < MIN_JURY_VERDICTS {
        return None;
    }

    let outcome = match policy {
        ConsensusPolicy::AnyVeto => {
            if results.contains(&OfficialResult::NoAprobado) {
                OfficialState::NoAprobada
            } else if results.contains(&OfficialResult::AplazadoPorModificaciones) {
                OfficialState::AprobadaConModificaciones
            } else {
                OfficialState::Aprobada
            }
        }
        ConsensusPolicy::Unanimity => {
            if results.iter().all(|r| *r == OfficialResult::Aprobado) {
                OfficialState::Aprobada
            } else if results.iter().all(|r| *r == OfficialResult::NoAprobado) {
                OfficialState::NoAprobada
            } else {
                OfficialState::AprobadaConModificaciones
            }
        }
    };
    Some(outcome)
}

// ─── Defense Grade ───────────────────────────────────────────────────

/// Classification of a defense grade: distinction label plus the
/// official state it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseOutcome {
    /// The validated grade.
    pub grade: u8,
    /// Distinction label.
    pub label: DefenseLabel,
    /// Official outcome of the defense stage.
    pub official_state: OfficialState,
}

/// Classify a defense grade into its label and official state.
///
/// Total on integers in [0, 100]:
/// `< 70` REPROBADA, `70..=94` APROBADA, `95..=99` MERITORIA,
/// `100` LAUREADA.
///
/// # Errors
///
/// Returns [`EngineError::InvalidGrade`] for grades outside [0, 100].
pub fn classify_defense_grade(grade: i64) -> Result<DefenseOutcome, EngineError> {
    if !(0..=i64::from(LAUREADA_GRADE)).contains(&grade) {
        return Err(EngineError::InvalidGrade { grade });
    }
    let grade = grade as u8;

    let (label, official_state) = if grade < PASSING_GRADE {
        (DefenseLabel::Reprobada, OfficialState::NoAprobada)
    } else if grade < MERITORIA_FLOOR {
        (DefenseLabel::Aprobada, OfficialState::Aprobada)
    } else if grade < LAUREADA_GRADE {
        (DefenseLabel::Meritoria, OfficialState::Aprobada)
    } else {
        (DefenseLabel::Laureada, OfficialState::Aprobada)
    };

    Ok(DefenseOutcome {
        grade,
        label,
        official_state,
    })
}

// ─── Carry-Over ──────────────────────────────────────────────────────

/// Merge prior approving verdicts into the current evaluation set for a
/// resubmission.
///
/// Any evaluator present in `previous` whose most recent verdict was
/// APROBADO and who has not re-evaluated the new version is merged in,
/// tagged `carried_over`. Evaluators who did re-evaluate always keep
/// their new verdict, never the old one. Non-approving prior verdicts
/// never carry.
///
/// `submission_id` is the current version the carried verdicts are
/// re-issued against.
pub fn carry_over_approvals(
    current: Vec<Evaluation>,
    previous: &[Evaluation],
    submission_id: SubmissionId,
) -> Vec<Evaluation> {
    // Most recent prior verdict per evaluator, in first-seen order.
    let mut latest_prior: Vec<&Evaluation> = Vec::new();
    for eval in previous {
        match latest_prior
            .iter_mut()
            .find(|e| e.evaluator_id == eval.evaluator_id)
        {
            Some(slot) => *slot = eval,
            None => latest_prior.push(eval),
        }
    }

    let mut merged = current;
    for prior in latest_prior {
        let re_evaluated = merged
            .iter()
            .any(|e| e.evaluator_id == prior.evaluator_id);
        if !re_evaluated && prior.official_result == OfficialResult::Aprobado {
            merged.push(prior.carried_into(submission_id));
        }
    }
    merged
}

// ─── Tests ───────────────────────────────────────────────────────────
