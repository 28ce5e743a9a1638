//! # Transition Orchestrator
//!
//! The effectful operations of the pipeline. Each operation is invoked
//! by the surrounding application after role and permission checks have
//! passed; the orchestrator sequences ledger writes and appends exactly
//! one audit event per state change.
//!
//! ## Consolidation
//!
//! [`consolidate`] is the pure decision phase: it reads the stage's
//! current evaluations (or grade) through the ledger and returns a
//! decision or a pending report without mutating anything.
//! [`apply_decision`] executes a decision as one logical unit:
//!
//! 1. Conditional stage update — succeeds only while the stage is still
//!    unconsolidated; a losing concurrent writer gets
//!    `AlreadyConsolidated`.
//! 2. Remediation deadline insert, when the decision demands one.
//! 3. Successor stage insert, only if absent.
//! 4. The project's global status is never touched here — only the
//!    separate final delivery changes it.
//! 5. One audit event carrying the decision digest and raw inputs.
//!
//! If step 1 fails nothing else runs. If a later step fails after step 1
//! committed, the call reports the failure and the caller retries the
//! whole call: steps 2–5 are idempotent per decision digest, so a retry
//! completes the missing effects without duplicating the present ones.
//! Once every effect exists, a repeat call reports
//! `AlreadyConsolidated`.

use serde_json::json;

use tdg_core::{
    OfficialResult, OfficialState, ProjectId, StageId, StageName, SystemState, Timestamp, UserId,
};
use tdg_state::{
    AuditEvent, AuditKind, Deadline, DefenseSession, Endorsement, Evaluation, Project,
    ProjectError, ProjectStage, StageTransitionEvidence, Submission,
};

use crate::classifier::{carry_over_approvals, classify_defense_grade};
use crate::consolidation::{
    decide, Consolidation, ConsolidationDecision, DeadlineRule, PendingReason, StageInputs,
};
use crate::error::EngineError;
use crate::ledger::{LedgerError, StageLedger};
use crate::schedule::{business_days_from, calendar_days_from};

// ─── Apply Context ───────────────────────────────────────────────────

/// Per-call context for applying a decision.
#[derive(Debug, Clone)]
pub struct ApplyContext {
    /// The user on whose behalf the decision is applied.
    pub actor: UserId,
    /// Coordinator-chosen due date, required when the decision's
    /// deadline rule is [`DeadlineRule::CoordinatorSet`]. No default.
    pub coordinator_due: Option<Timestamp>,
}

/// What applying a decision actually wrote.
#[derive(Debug, Clone)]
pub struct Applied {
    /// The consolidated stage row.
    pub stage: ProjectStage,
    /// The deadline created by this call, if any.
    pub deadline: Option<Deadline>,
    /// The successor stage created by this call, if any.
    pub successor: Option<ProjectStage>,
}

// ─── Decision Phase ──────────────────────────────────────────────────

/// Compute the consolidation of a stage from its current ledger state.
///
/// Pure decision phase: reads evaluations (with carry-over applied for
/// resubmissions) or the latest defense grade, and decides. Nothing is
/// mutated.
///
/// # Errors
///
/// - [`EngineError::AlreadyConsolidated`] when the stage already has an
///   official outcome.
/// - [`EngineError::EndorsementMissing`] when a document stage has no
///   approved endorsement for the submission under evaluation.
pub fn consolidate(
    ledger: &impl StageLedger,
    stage_id: &StageId,
) -> Result<Consolidation, EngineError> {
    let stage = ledger.get_stage(stage_id)?;
    if stage.official_state.is_decided() {
        return Err(EngineError::AlreadyConsolidated {
            stage_id: stage_id.to_string(),
        });
    }

    if stage.stage_name.is_graded() {
        let grade = ledger.latest_grade(stage_id)?;
        return decide(&stage, StageInputs::Grade(grade));
    }

    let Some(submission) = ledger.latest_submission(stage_id)? else {
        return Ok(Consolidation::Pending(PendingReason::AwaitingSubmission));
    };
    require_endorsement(ledger, &stage, &submission)?;

    let (current, previous): (Vec<Evaluation>, Vec<Evaluation>) = ledger
        .evaluations(stage_id)?
        .into_iter()
        .partition(|e| e.submission_id == submission.id);
    let merged = if submission.version > 1 {
        carry_over_approvals(current, &previous, submission.id)
    } else {
        current
    };

    decide(
        &stage,
        StageInputs::Jury {
            evaluations: &merged,
            version: submission.version,
        },
    )
}

// ─── Effect Phase ────────────────────────────────────────────────────

/// Apply a consolidation decision against the ledger as one logical
/// unit. See the module docs for the step sequence and retry semantics.
pub fn apply_decision(
    ledger: &impl StageLedger,
    stage_id: &StageId,
    decision: &ConsolidationDecision,
    ctx: &ApplyContext,
) -> Result<Applied, EngineError> {
    if decision.stage_id != *stage_id {
        return Err(EngineError::DecisionStageMismatch {
            decision_stage: decision.stage_id.to_string(),
            stage_id: stage_id.to_string(),
        });
    }

    // Resolve the due date up front: a missing coordinator date must
    // reject before any write.
    let due_date = match &decision.deadline {
        Some(plan) => Some(match plan.rule {
            DeadlineRule::CalendarDays(days) => calendar_days_from(Timestamp::now(), days),
            DeadlineRule::BusinessDays(days) => business_days_from(Timestamp::now(), days),
            DeadlineRule::CoordinatorSet => {
                ctx.coordinator_due.ok_or(EngineError::MissingDueDate)?
            }
        }),
        None => None,
    };

    let digest = decision.digest_hex()?;
    let mut stage = ledger.get_stage(stage_id)?;

    // Step 1 — conditional stage update.
    let mut progressed = if !stage.official_state.is_decided() {
        let expected = stage.official_state;
        stage.consolidate(
            decision.official_state,
            decision.next_system_state,
            decision.final_grade,
            decision.observations.clone(),
            digest.clone(),
            StageTransitionEvidence {
                reason: decision.audit_description.clone(),
                actor: Some(ctx.actor.clone()),
            },
        )?;
        match ledger.update_stage(&stage, expected) {
            Ok(()) => {
                tracing::info!(
                    stage = %stage_id,
                    outcome = %decision.official_state,
                    state = %decision.next_system_state,
                    "stage consolidated"
                );
                true
            }
            Err(LedgerError::Conflict { reason }) => {
                tracing::warn!(stage = %stage_id, %reason, "lost concurrent consolidation");
                return Err(EngineError::AlreadyConsolidated {
                    stage_id: stage_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }
    } else if stage.decision_digest.as_deref() == Some(digest.as_str()) {
        // Retry of a decision whose stage update already committed:
        // finish whatever effects are still missing.
        false
    } else {
        return Err(EngineError::AlreadyConsolidated {
            stage_id: stage_id.to_string(),
        });
    };

    // Step 2 — remediation deadline, once per decision.
    let mut deadline_row = None;
    if let (Some(plan), Some(due)) = (&decision.deadline, due_date) {
        if !ledger.deadline_exists(stage_id, &digest)? {
            let row = Deadline::new(
                *stage_id,
                plan.description.clone(),
                due,
                ctx.actor.clone(),
                Some(digest.clone()),
            );
            ledger.insert_deadline(&row)?;
            tracing::info!(stage = %stage_id, due = %due, "remediation deadline created");
            progressed = true;
            deadline_row = Some(row);
        }
    }

    // Step 3 — successor stage, only if absent.
    let mut successor_row = None;
    if let Some(name) = decision.successor {
        if ledger.find_stage(&decision.project_id, name)?.is_none() {
            let row = ProjectStage::new(decision.project_id, name);
            ledger.insert_stage(&row)?;
            tracing::info!(project = %decision.project_id, stage = %name, "successor stage opened");
            progressed = true;
            successor_row = Some(row);
        }
    }

    // Step 4 — global status untouched: a graded defense does not
    // conclude the project; only the final delivery does.

    // Step 5 — exactly one audit event per decision.
    if !ledger.has_audit_event(&digest)? {
        let metadata = json!({
            "stage_name": decision.stage_name,
            "official_state": decision.official_state,
            "submission_version": decision.submission_version,
            "inputs": &decision.inputs,
        });
        let event = AuditEvent::new(
            decision.project_id,
            ctx.actor.clone(),
            AuditKind::EtapaConsolidada,
            decision.audit_description.clone(),
            metadata,
            Some(digest),
        )?;
        ledger.append_audit_event(&event)?;
        progressed = true;
    }

    if !progressed {
        // Every effect already existed: this decision was fully applied
        // before.
        return Err(EngineError::AlreadyConsolidated {
            stage_id: stage_id.to_string(),
        });
    }

    Ok(Applied {
        stage,
        deadline: deadline_row,
        successor: successor_row,
    })
}

// ─── Surrounding Operations ──────────────────────────────────────────

/// Register a project and open its proposal stage.
pub fn register_project(
    ledger: &impl StageLedger,
    project: Project,
    actor: &UserId,
) -> Result<ProjectStage, EngineError> {
    ledger.insert_project(&project)?;
    let stage = ProjectStage::new(project.id, StageName::Propuesta);
    ledger.insert_stage(&stage)?;
    append_audit(
        ledger,
        project.id,
        actor,
        AuditKind::ProyectoRegistrado,
        format!("Proyecto registrado: {}", project.title),
        json!({
            "program": &project.program,
            "modality": project.modality,
            "director": &project.director_id,
        }),
    )?;
    tracing::info!(project = %project.id, "project registered");
    Ok(stage)
}

/// File a submission version for a stage.
///
/// Moves a draft stage to `Radicada`; for a stage consolidated with
/// observations, resets it so endorsement and evaluation can repeat.
pub fn submit_version(
    ledger: &impl StageLedger,
    stage_id: &StageId,
    submitted_by: &UserId,
    document: &str,
    notes: &str,
) -> Result<Submission, EngineError> {
    let mut stage = ledger.get_stage(stage_id)?;
    let project = ledger.get_project(&stage.project_id)?;
    if !project.is_active() {
        return Err(EngineError::Project(ProjectError::NotActive {
            project_id: project.id.to_string(),
            status: project.global_status.to_string(),
        }));
    }

    let version = ledger
        .latest_submission(stage_id)?
        .map(|s| s.version)
        .unwrap_or(0)
        + 1;
    let expected = stage.official_state;
    stage.submit(StageTransitionEvidence {
        reason: format!("Entrega radicada (versión {version})"),
        actor: Some(submitted_by.clone()),
    })?;

    let submission = Submission::new(*stage_id, submitted_by.clone(), version, document, notes)?;
    ledger.insert_submission(&submission)?;
    ledger.update_stage(&stage, expected)?;
    append_audit(
        ledger,
        stage.project_id,
        submitted_by,
        AuditKind::EntregaRadicada,
        format!("Entrega radicada en {} (versión {version})", stage.stage_name),
        json!({"stage_name": stage.stage_name, "version": version, "document": document}),
    )?;
    tracing::info!(stage = %stage_id, version, "submission filed");
    Ok(submission)
}

/// Record a director endorsement on the latest submission.
///
/// No stage mutation happens here regardless of the sign: jury
/// assignment is a separate coordinator action, and a rejected
/// endorsement leaves the student to file a corrected version.
pub fn record_endorsement(
    ledger: &impl StageLedger,
    stage_id: &StageId,
    endorsed_by: &UserId,
    approved: bool,
    comments: &str,
) -> Result<Endorsement, EngineError> {
    let stage = ledger.get_stage(stage_id)?;
    let submission = ledger
        .latest_submission(stage_id)?
        .ok_or_else(|| LedgerError::NotFound {
            entity: "submission",
            id: stage_id.to_string(),
        })?;

    let endorsement = Endorsement::new(submission.id, endorsed_by.clone(), approved, comments);
    ledger.insert_endorsement(&endorsement)?;
    append_audit(
        ledger,
        stage.project_id,
        endorsed_by,
        AuditKind::AvalRegistrado,
        format!(
            "Aval {} para {} (versión {})",
            if approved { "otorgado" } else { "negado" },
            stage.stage_name,
            submission.version
        ),
        json!({"stage_name": stage.stage_name, "version": submission.version, "approved": approved}),
    )?;
    Ok(endorsement)
}

/// Assign the jury and begin the review (RADICADA → EN_REVISION).
///
/// Requires the endorsement gate for the document stages.
pub fn assign_jury(
    ledger: &impl StageLedger,
    stage_id: &StageId,
    jurors: &[UserId],
    actor: &UserId,
) -> Result<ProjectStage, EngineError> {
    let mut stage = ledger.get_stage(stage_id)?;
    let submission = ledger
        .latest_submission(stage_id)?
        .ok_or_else(|| LedgerError::NotFound {
            entity: "submission",
            id: stage_id.to_string(),
        })?;
    require_endorsement(ledger, &stage, &submission)?;

    let expected = stage.official_state;
    stage.begin_review(StageTransitionEvidence {
        reason: "Jurados asignados".to_string(),
        actor: Some(actor.clone()),
    })?;
    ledger.update_stage(&stage, expected)?;
    append_audit(
        ledger,
        stage.project_id,
        actor,
        AuditKind::JuradosAsignados,
        format!("Jurados asignados para {}", stage.stage_name),
        json!({"stage_name": stage.stage_name, "jurors": jurors}),
    )?;
    tracing::info!(stage = %stage_id, jurors = jurors.len(), "review started");
    Ok(stage)
}

/// Record one evaluator's verdict against the submission under review.
pub fn record_evaluation(
    ledger: &impl StageLedger,
    stage_id: &StageId,
    evaluator_id: &UserId,
    result: OfficialResult,
    observations: &str,
) -> Result<Evaluation, EngineError> {
    let stage = ledger.get_stage(stage_id)?;
    if stage.system_state != SystemState::EnRevision {
        return Err(EngineError::NotUnderReview {
            stage_id: stage_id.to_string(),
            state: stage.system_state.to_string(),
        });
    }
    let submission = ledger
        .latest_submission(stage_id)?
        .ok_or_else(|| LedgerError::NotFound {
            entity: "submission",
            id: stage_id.to_string(),
        })?;
    require_endorsement(ledger, &stage, &submission)?;

    let already = ledger.evaluations(stage_id)?.iter().any(|e| {
        e.submission_id == submission.id && e.evaluator_id == *evaluator_id
    });
    if already {
        return Err(EngineError::DuplicateEvaluation {
            evaluator_id: evaluator_id.to_string(),
            version: submission.version,
        });
    }

    let evaluation = Evaluation::new(
        submission.id,
        *stage_id,
        evaluator_id.clone(),
        result,
        observations,
    );
    ledger.insert_evaluation(&evaluation)?;
    append_audit(
        ledger,
        stage.project_id,
        evaluator_id,
        AuditKind::ConceptoRegistrado,
        format!("Concepto {} registrado en {}", result, stage.stage_name),
        json!({"stage_name": stage.stage_name, "version": submission.version, "result": result}),
    )?;
    Ok(evaluation)
}

/// Schedule the defense session (moves the defense stage to RADICADA).
pub fn schedule_defense(
    ledger: &impl StageLedger,
    stage_id: &StageId,
    scheduled_at: Timestamp,
    location: &str,
    actor: &UserId,
) -> Result<DefenseSession, EngineError> {
    let mut stage = ledger.get_stage(stage_id)?;
    if !stage.stage_name.is_graded() {
        return Err(EngineError::NotDefenseStage {
            stage_id: stage_id.to_string(),
            stage_name: stage.stage_name.to_string(),
        });
    }

    let expected = stage.official_state;
    stage.submit(StageTransitionEvidence {
        reason: format!("Sustentación programada para {scheduled_at}"),
        actor: Some(actor.clone()),
    })?;

    let session = DefenseSession::new(*stage_id, scheduled_at, location);
    ledger.insert_defense_session(&session)?;
    ledger.update_stage(&stage, expected)?;
    append_audit(
        ledger,
        stage.project_id,
        actor,
        AuditKind::SustentacionProgramada,
        format!("Sustentación programada para {scheduled_at}"),
        json!({"scheduled_at": scheduled_at, "location": location}),
    )?;
    Ok(session)
}

/// Record the defense grade (moves the defense stage to EN_REVISION).
///
/// The grade is validated before any mutation; an out-of-range grade
/// writes nothing.
pub fn record_defense_grade(
    ledger: &impl StageLedger,
    stage_id: &StageId,
    grade: i64,
    actor: &UserId,
) -> Result<DefenseSession, EngineError> {
    let outcome = classify_defense_grade(grade)?;

    let mut stage = ledger.get_stage(stage_id)?;
    if !stage.stage_name.is_graded() {
        return Err(EngineError::NotDefenseStage {
            stage_id: stage_id.to_string(),
            stage_name: stage.stage_name.to_string(),
        });
    }
    let mut session = ledger
        .latest_defense_session(stage_id)?
        .ok_or_else(|| LedgerError::NotFound {
            entity: "defense session",
            id: stage_id.to_string(),
        })?;

    let expected = stage.official_state;
    stage.begin_review(StageTransitionEvidence {
        reason: format!("Nota de sustentación registrada: {}", outcome.grade),
        actor: Some(actor.clone()),
    })?;

    session.grade = Some(outcome.grade);
    ledger.update_defense_session(&session)?;
    ledger.update_stage(&stage, expected)?;
    append_audit(
        ledger,
        stage.project_id,
        actor,
        AuditKind::NotaSustentacionRegistrada,
        format!("Nota de sustentación registrada: {}/100", outcome.grade),
        json!({"grade": outcome.grade, "label": outcome.label}),
    )?;
    tracing::info!(stage = %stage_id, grade = outcome.grade, "defense grade recorded");
    Ok(session)
}

/// Open a stage whose predecessor was approved but spawns no successor
/// automatically (the PROPUESTA → ANTEPROYECTO step).
///
/// Guarded: the predecessor must exist with outcome APROBADA, and no
/// stage may already exist under the same name.
pub fn open_successor_stage(
    ledger: &impl StageLedger,
    project_id: &ProjectId,
    stage_name: StageName,
    actor: &UserId,
) -> Result<ProjectStage, EngineError> {
    let project = ledger.get_project(project_id)?;
    if !project.is_active() {
        return Err(EngineError::Project(ProjectError::NotActive {
            project_id: project.id.to_string(),
            status: project.global_status.to_string(),
        }));
    }

    let Some(predecessor_name) = StageName::all()
        .iter()
        .copied()
        .find(|s| s.successor() == Some(stage_name))
    else {
        return Err(EngineError::PredecessorNotApproved {
            stage_name: stage_name.to_string(),
            reason: "stage has no predecessor in the pipeline".to_string(),
        });
    };

    let predecessor = ledger
        .find_stage(project_id, predecessor_name)?
        .ok_or_else(|| EngineError::PredecessorNotApproved {
            stage_name: stage_name.to_string(),
            reason: format!("{predecessor_name} does not exist"),
        })?;
    if predecessor.official_state != OfficialState::Aprobada {
        return Err(EngineError::PredecessorNotApproved {
            stage_name: stage_name.to_string(),
            reason: format!(
                "{predecessor_name} is {}",
                predecessor.official_state
            ),
        });
    }

    let stage = ProjectStage::new(*project_id, stage_name);
    ledger.insert_stage(&stage)?;
    append_audit(
        ledger,
        *project_id,
        actor,
        AuditKind::EtapaAbierta,
        format!("Etapa {stage_name} abierta"),
        json!({"stage_name": stage_name, "predecessor": predecessor_name}),
    )?;
    tracing::info!(project = %project_id, stage = %stage_name, "stage opened");
    Ok(stage)
}

/// Conclude the project on final delivery (VIGENTE → FINALIZADO).
///
/// The only operation that moves the global status forward; it requires
/// a closed, approved defense stage.
pub fn finalize_project(
    ledger: &impl StageLedger,
    project_id: &ProjectId,
    actor: &UserId,
) -> Result<Project, EngineError> {
    let mut project = ledger.get_project(project_id)?;

    match ledger.find_stage(project_id, StageName::Sustentacion)? {
        Some(defense)
            if defense.official_state == OfficialState::Aprobada && defense.is_closed() => {}
        Some(defense) => {
            return Err(EngineError::FinalDeliveryNotAllowed {
                reason: format!(
                    "defense stage is {} / {}",
                    defense.system_state, defense.official_state
                ),
            });
        }
        None => {
            return Err(EngineError::FinalDeliveryNotAllowed {
                reason: "no defense stage exists".to_string(),
            });
        }
    }

    project.finalize("Entrega final radicada")?;
    ledger.update_project(&project)?;
    append_audit(
        ledger,
        *project_id,
        actor,
        AuditKind::ProyectoFinalizado,
        "Proyecto finalizado con la entrega final".to_string(),
        json!({"global_status": project.global_status}),
    )?;
    tracing::info!(project = %project_id, "project finalized");
    Ok(project)
}

/// Administratively cancel a project (VIGENTE → CANCELADO).
pub fn cancel_project(
    ledger: &impl StageLedger,
    project_id: &ProjectId,
    reason: &str,
    actor: &UserId,
) -> Result<Project, EngineError> {
    let mut project = ledger.get_project(project_id)?;
    project.cancel(reason)?;
    ledger.update_project(&project)?;
    append_audit(
        ledger,
        *project_id,
        actor,
        AuditKind::ProyectoCancelado,
        format!("Proyecto cancelado: {reason}"),
        json!({"reason": reason}),
    )?;
    Ok(project)
}

/// Administratively lapse a project (VIGENTE → VENCIDO).
pub fn expire_project(
    ledger: &impl StageLedger,
    project_id: &ProjectId,
    reason: &str,
    actor: &UserId,
) -> Result<Project, EngineError> {
    let mut project = ledger.get_project(project_id)?;
    project.expire(reason)?;
    ledger.update_project(&project)?;
    append_audit(
        ledger,
        *project_id,
        actor,
        AuditKind::ProyectoVencido,
        format!("Proyecto vencido: {reason}"),
        json!({"reason": reason}),
    )?;
    Ok(project)
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Endorsement gate: the document stages need at least one approved
/// endorsement on the submission under evaluation.
fn require_endorsement(
    ledger: &impl StageLedger,
    stage: &ProjectStage,
    submission: &Submission,
) -> Result<(), EngineError> {
    if !stage.stage_name.requires_endorsement() {
        return Ok(());
    }
    let approved = ledger
        .endorsements(&submission.id)?
        .iter()
        .any(|e| e.approved);
    if approved {
        Ok(())
    } else {
        Err(EngineError::EndorsementMissing {
            stage_id: stage.id.to_string(),
            version: submission.version,
        })
    }
}

fn append_audit(
    ledger: &impl StageLedger,
    project_id: ProjectId,
    actor: &UserId,
    kind: AuditKind,
    description: String,
    metadata: serde_json::Value,
) -> Result<(), EngineError> {
    let event = AuditEvent::new(project_id, actor.clone(), kind, description, metadata, None)?;
    ledger.append_audit_event(&event)?;
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────
