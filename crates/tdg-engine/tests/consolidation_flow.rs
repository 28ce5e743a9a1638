//! End-to-end consolidation scenarios against the in-memory ledger:
//! full pipeline walks, successor spawning, deadline creation, audit
//! bookkeeping, and apply idempotence.

use tdg_core::{
    GlobalStatus, Modality, OfficialResult, OfficialState, ProgramCode, StageId, StageName,
    SystemState, Timestamp, UserId,
};
use tdg_engine::{
    apply_decision, assign_jury, consolidate, finalize_project, open_successor_stage,
    record_defense_grade, record_endorsement, record_evaluation, register_project,
    schedule_defense, submit_version, Applied, ApplyContext, Consolidation, DeadlineRule,
    EngineError, InMemoryLedger, StageLedger,
};
use tdg_state::{AuditKind, Project, ProjectStage};

fn user(s: &str) -> UserId {
    UserId::new(s).unwrap()
}

fn seed_project(ledger: &InMemoryLedger) -> (Project, ProjectStage) {
    let project = Project::new(
        "Clasificación de imágenes satelitales",
        ProgramCode::new("ISIS").unwrap(),
        Modality::Investigacion,
        user("director-01"),
    );
    let proposal = register_project(ledger, project.clone(), &user("coordinador-01")).unwrap();
    (project, proposal)
}

/// Insert a stage directly and drive it to EN_REVISION with an endorsed
/// submission.
fn seeded_stage_under_review(
    ledger: &InMemoryLedger,
    project: &Project,
    name: StageName,
) -> ProjectStage {
    let stage = ProjectStage::new(project.id, name);
    ledger.insert_stage(&stage).unwrap();
    submit_version(
        ledger,
        &stage.id,
        &user("estudiante-01"),
        "https://repositorio/doc-v1",
        "",
    )
    .unwrap();
    if name.requires_endorsement() {
        record_endorsement(ledger, &stage.id, &user("director-01"), true, "De acuerdo").unwrap();
    }
    assign_jury(
        ledger,
        &stage.id,
        &[user("jurado-1"), user("jurado-2")],
        &user("coordinador-01"),
    )
    .unwrap();
    ledger.get_stage(&stage.id).unwrap()
}

fn decided(ledger: &InMemoryLedger, stage_id: &StageId) -> tdg_engine::ConsolidationDecision {
    match consolidate(ledger, stage_id).unwrap() {
        Consolidation::Decided(d) => d,
        Consolidation::Pending(reason) => panic!("expected decision, pending: {reason}"),
    }
}

fn apply(
    ledger: &InMemoryLedger,
    stage_id: &StageId,
    decision: &tdg_engine::ConsolidationDecision,
) -> Applied {
    let ctx = ApplyContext {
        actor: user("coordinador-01"),
        coordinator_due: None,
    };
    apply_decision(ledger, stage_id, decision, &ctx).unwrap()
}

fn consolidation_events(
    ledger: &InMemoryLedger,
    project: &Project,
    digest: &str,
) -> usize {
    ledger
        .audit_events(&project.id)
        .unwrap()
        .iter()
        .filter(|e| {
            e.kind == AuditKind::EtapaConsolidada && e.decision_digest.as_deref() == Some(digest)
        })
        .count()
}

// ── Scenario: pre-project approved unanimously ───────────────────────

#[test]
fn anteproyecto_approved_spawns_informe_final_with_one_audit_event() {
    let ledger = InMemoryLedger::new();
    let (project, _) = seed_project(&ledger);
    let stage = seeded_stage_under_review(&ledger, &project, StageName::Anteproyecto);

    record_evaluation(
        &ledger,
        &stage.id,
        &user("jurado-1"),
        OfficialResult::Aprobado,
        "Metodología sólida",
    )
    .unwrap();
    record_evaluation(
        &ledger,
        &stage.id,
        &user("jurado-2"),
        OfficialResult::Aprobado,
        "",
    )
    .unwrap();

    let decision = decided(&ledger, &stage.id);
    let digest = decision.digest_hex().unwrap();
    let applied = apply(&ledger, &stage.id, &decision);

    // Stage closed approved.
    assert_eq!(applied.stage.official_state, OfficialState::Aprobada);
    assert_eq!(applied.stage.system_state, SystemState::Cerrada);

    // Successor spawned as a fresh draft.
    let successor = applied.successor.expect("successor stage");
    assert_eq!(successor.stage_name, StageName::InformeFinal);
    assert_eq!(successor.system_state, SystemState::Borrador);
    assert_eq!(successor.official_state, OfficialState::Pendiente);
    let stored = ledger
        .find_stage(&project.id, StageName::InformeFinal)
        .unwrap()
        .expect("successor persisted");
    assert_eq!(stored.id, successor.id);

    // No deadline, exactly one audit event for the decision.
    assert!(applied.deadline.is_none());
    assert!(ledger.deadlines(&stage.id).unwrap().is_empty());
    assert_eq!(consolidation_events(&ledger, &project, &digest), 1);

    // Observations carry one line per evaluator, in order.
    let lines: Vec<_> = applied.stage.observations.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("jurado-1: APROBADO"));
}

// ── Scenario: laureate defense, then final delivery ──────────────────

#[test]
fn defense_grade_100_is_laureada_and_project_stays_vigente_until_delivery() {
    let ledger = InMemoryLedger::new();
    let (project, _) = seed_project(&ledger);

    let stage = ProjectStage::new(project.id, StageName::Sustentacion);
    ledger.insert_stage(&stage).unwrap();
    schedule_defense(
        &ledger,
        &stage.id,
        Timestamp::now().plus_days(7),
        "Auditorio principal",
        &user("coordinador-01"),
    )
    .unwrap();
    record_defense_grade(&ledger, &stage.id, 100, &user("coordinador-01")).unwrap();

    let decision = decided(&ledger, &stage.id);
    assert_eq!(decision.final_grade, Some(100));
    assert_eq!(
        decision.grade_label,
        Some(tdg_core::DefenseLabel::Laureada)
    );
    assert_eq!(decision.official_state, OfficialState::Aprobada);
    assert_eq!(
        decision.deadline.as_ref().unwrap().rule,
        DeadlineRule::CalendarDays(8)
    );

    let before = Timestamp::now();
    let applied = apply(&ledger, &stage.id, &decision);
    assert_eq!(applied.stage.final_grade, Some(100));
    assert!(applied.successor.is_none());

    // Eight calendar days out.
    let deadline = applied.deadline.expect("final delivery deadline");
    assert!(deadline.due_date >= before.plus_days(8));
    assert!(deadline.due_date <= Timestamp::now().plus_days(8));

    // The consolidation itself leaves the project untouched.
    let stored = ledger.get_project(&project.id).unwrap();
    assert_eq!(stored.global_status, GlobalStatus::Vigente);

    // The separate final delivery concludes it.
    let concluded = finalize_project(&ledger, &project.id, &user("coordinador-01")).unwrap();
    assert_eq!(concluded.global_status, GlobalStatus::Finalizado);
}

#[test]
fn failed_defense_closes_without_delivery_deadline() {
    let ledger = InMemoryLedger::new();
    let (project, _) = seed_project(&ledger);

    let stage = ProjectStage::new(project.id, StageName::Sustentacion);
    ledger.insert_stage(&stage).unwrap();
    schedule_defense(
        &ledger,
        &stage.id,
        Timestamp::now(),
        "Sala 204",
        &user("coordinador-01"),
    )
    .unwrap();
    record_defense_grade(&ledger, &stage.id, 55, &user("coordinador-01")).unwrap();

    let decision = decided(&ledger, &stage.id);
    let applied = apply(&ledger, &stage.id, &decision);
    assert_eq!(applied.stage.official_state, OfficialState::NoAprobada);
    assert!(applied.deadline.is_none());

    // No final delivery possible.
    let result = finalize_project(&ledger, &project.id, &user("coordinador-01"));
    assert!(matches!(
        result,
        Err(EngineError::FinalDeliveryNotAllowed { .. })
    ));
}

// ── Scenario: idempotent apply ───────────────────────────────────────

#[test]
fn reapplying_a_decision_creates_no_duplicates() {
    let ledger = InMemoryLedger::new();
    let (project, _) = seed_project(&ledger);
    let stage = seeded_stage_under_review(&ledger, &project, StageName::Anteproyecto);

    record_evaluation(
        &ledger,
        &stage.id,
        &user("jurado-1"),
        OfficialResult::AplazadoPorModificaciones,
        "Ajustar cronograma",
    )
    .unwrap();
    record_evaluation(
        &ledger,
        &stage.id,
        &user("jurado-2"),
        OfficialResult::Aprobado,
        "",
    )
    .unwrap();

    let decision = decided(&ledger, &stage.id);
    let digest = decision.digest_hex().unwrap();
    let ctx = ApplyContext {
        actor: user("coordinador-01"),
        coordinator_due: None,
    };

    let applied = apply_decision(&ledger, &stage.id, &decision, &ctx).unwrap();
    assert_eq!(applied.stage.system_state, SystemState::Cerrada);
    assert!(applied.deadline.is_some());

    // Second apply of the same decision on the now-CERRADA stage.
    let result = apply_decision(&ledger, &stage.id, &decision, &ctx);
    assert!(matches!(
        result,
        Err(EngineError::AlreadyConsolidated { .. })
    ));

    // Still exactly one deadline and one audit event.
    assert_eq!(ledger.deadlines(&stage.id).unwrap().len(), 1);
    assert_eq!(consolidation_events(&ledger, &project, &digest), 1);
    assert!(ledger
        .find_stage(&project.id, StageName::InformeFinal)
        .unwrap()
        .is_none());
}

// ── Scenario: full pipeline walk ─────────────────────────────────────

#[test]
fn full_pipeline_from_proposal_to_finalized_project() {
    let ledger = InMemoryLedger::new();
    let (project, proposal) = seed_project(&ledger);
    let coordinator = user("coordinador-01");

    // Proposal: committee approves.
    submit_version(&ledger, &proposal.id, &user("estudiante-01"), "propuesta-v1", "").unwrap();
    assign_jury(&ledger, &proposal.id, &[], &coordinator).unwrap();
    record_evaluation(&ledger, &proposal.id, &user("comite-1"), OfficialResult::Aprobado, "")
        .unwrap();
    record_evaluation(&ledger, &proposal.id, &user("comite-2"), OfficialResult::Aprobado, "")
        .unwrap();
    let decision = decided(&ledger, &proposal.id);
    apply(&ledger, &proposal.id, &decision);

    // Proposal spawns nothing; the coordinator opens the pre-project.
    let pre_project =
        open_successor_stage(&ledger, &project.id, StageName::Anteproyecto, &coordinator)
            .unwrap();

    // Pre-project: endorsed, reviewed, approved → spawns final report.
    submit_version(&ledger, &pre_project.id, &user("estudiante-01"), "anteproyecto-v1", "")
        .unwrap();
    record_endorsement(&ledger, &pre_project.id, &user("director-01"), true, "").unwrap();
    assign_jury(
        &ledger,
        &pre_project.id,
        &[user("jurado-1"), user("jurado-2")],
        &coordinator,
    )
    .unwrap();
    record_evaluation(&ledger, &pre_project.id, &user("jurado-1"), OfficialResult::Aprobado, "")
        .unwrap();
    record_evaluation(&ledger, &pre_project.id, &user("jurado-2"), OfficialResult::Aprobado, "")
        .unwrap();
    let decision = decided(&ledger, &pre_project.id);
    let applied = apply(&ledger, &pre_project.id, &decision);
    let report = applied.successor.expect("final report stage");

    // Final report: endorsed, reviewed, approved → spawns defense.
    submit_version(&ledger, &report.id, &user("estudiante-01"), "informe-v1", "").unwrap();
    record_endorsement(&ledger, &report.id, &user("director-01"), true, "").unwrap();
    assign_jury(
        &ledger,
        &report.id,
        &[user("jurado-1"), user("jurado-2")],
        &coordinator,
    )
    .unwrap();
    record_evaluation(&ledger, &report.id, &user("jurado-1"), OfficialResult::Aprobado, "")
        .unwrap();
    record_evaluation(&ledger, &report.id, &user("jurado-2"), OfficialResult::Aprobado, "")
        .unwrap();
    let decision = decided(&ledger, &report.id);
    let applied = apply(&ledger, &report.id, &decision);
    let defense = applied.successor.expect("defense stage");
    assert_eq!(defense.stage_name, StageName::Sustentacion);

    // Defense: scheduled, graded, consolidated.
    schedule_defense(
        &ledger,
        &defense.id,
        Timestamp::now().plus_days(14),
        "Auditorio principal",
        &coordinator,
    )
    .unwrap();
    record_defense_grade(&ledger, &defense.id, 92, &coordinator).unwrap();
    let decision = decided(&ledger, &defense.id);
    let applied = apply(&ledger, &defense.id, &decision);
    assert_eq!(applied.stage.official_state, OfficialState::Aprobada);

    // Delivery closes the project.
    let concluded = finalize_project(&ledger, &project.id, &coordinator).unwrap();
    assert_eq!(concluded.global_status, GlobalStatus::Finalizado);

    // Every stage row exists exactly once, all closed approved.
    for name in StageName::all() {
        let stage = ledger
            .find_stage(&project.id, *name)
            .unwrap()
            .unwrap_or_else(|| panic!("missing stage {name}"));
        assert_eq!(stage.official_state, OfficialState::Aprobada);
        assert_eq!(stage.system_state, SystemState::Cerrada);
    }

    // The audit trail saw one consolidation per stage plus the
    // registration and delivery events.
    let events = ledger.audit_events(&project.id).unwrap();
    let consolidations = events
        .iter()
        .filter(|e| e.kind == AuditKind::EtapaConsolidada)
        .count();
    assert_eq!(consolidations, 4);
    assert!(events.iter().any(|e| e.kind == AuditKind::ProyectoRegistrado));
    assert!(events.iter().any(|e| e.kind == AuditKind::ProyectoFinalizado));
}
