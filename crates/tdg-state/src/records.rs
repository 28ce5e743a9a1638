//! # Ledger Records
//!
//! The remaining rows of the stage ledger: submissions, endorsements,
//! evaluations, deadlines, defense sessions, and the append-only audit
//! trail. These are plain typed records — the decision logic that
//! produces them lives in `tdg-engine`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use tdg_core::{
    sha256_hex, AuditEventId, CanonicalBytes, DeadlineId, DefenseSessionId, EndorsementId,
    EvaluationId, OfficialResult, ProjectId, StageId, SubmissionId, TdgError, Timestamp, UserId,
};

// ─── Submission ──────────────────────────────────────────────────────

/// A document submission within a stage. Immutable once created;
/// corrections arrive as a new version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Unique submission identifier.
    pub id: SubmissionId,
    /// The stage this submission belongs to.
    pub stage_id: StageId,
    /// Who filed the submission.
    pub submitted_by: UserId,
    /// Version number, starting at 1 and incrementing per stage.
    pub version: u32,
    /// Link or repository reference to the submitted document.
    pub document: String,
    /// Free-form notes from the submitter.
    pub notes: String,
    /// When the submission was filed.
    pub filed_at: Timestamp,
}

impl Submission {
    /// Create a submission with the given version.
    ///
    /// The orchestrator computes the version (latest + 1); this
    /// constructor only refuses version 0.
    pub fn new(
        stage_id: StageId,
        submitted_by: UserId,
        version: u32,
        document: impl Into<String>,
        notes: impl Into<String>,
    ) -> Result<Self, TdgError> {
        if version == 0 {
            return Err(TdgError::Validation(
                "submission version must be positive".to_string(),
            ));
        }
        Ok(Self {
            id: SubmissionId::new(),
            stage_id,
            submitted_by,
            version,
            document: document.into(),
            notes: notes.into(),
            filed_at: Timestamp::now(),
        })
    }
}

// ─── Endorsement ─────────────────────────────────────────────────────

/// Director sign-off on a submission. At least one approved endorsement
/// must exist before a jury can evaluate the document stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endorsement {
    /// Unique endorsement identifier.
    pub id: EndorsementId,
    /// The submission being endorsed.
    pub submission_id: SubmissionId,
    /// The director who signed.
    pub endorsed_by: UserId,
    /// Whether the director approves the submission for evaluation.
    pub approved: bool,
    /// Director comments.
    pub comments: String,
    /// When the endorsement was recorded.
    pub recorded_at: Timestamp,
}

impl Endorsement {
    /// Record a director endorsement.
    pub fn new(
        submission_id: SubmissionId,
        endorsed_by: UserId,
        approved: bool,
        comments: impl Into<String>,
    ) -> Self {
        Self {
            id: EndorsementId::new(),
            submission_id,
            endorsed_by,
            approved,
            comments: comments.into(),
            recorded_at: Timestamp::now(),
        }
    }
}

// ─── Evaluation ──────────────────────────────────────────────────────

/// One evaluator's verdict on one submission. Exactly one per
/// `(evaluator, submission)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// Unique evaluation identifier.
    pub id: EvaluationId,
    /// The submission this verdict applies to.
    pub submission_id: SubmissionId,
    /// The stage the submission belongs to.
    pub stage_id: StageId,
    /// The evaluator who issued the verdict.
    pub evaluator_id: UserId,
    /// The verdict.
    pub official_result: OfficialResult,
    /// Evaluator observations.
    pub observations: String,
    /// Whether this verdict was carried over from a previous version
    /// rather than issued against the current one.
    #[serde(default)]
    pub carried_over: bool,
    /// When the verdict was recorded.
    pub recorded_at: Timestamp,
}

impl Evaluation {
    /// Record a fresh verdict against a submission.
    pub fn new(
        submission_id: SubmissionId,
        stage_id: StageId,
        evaluator_id: UserId,
        official_result: OfficialResult,
        observations: impl Into<String>,
    ) -> Self {
        Self {
            id: EvaluationId::new(),
            submission_id,
            stage_id,
            evaluator_id,
            official_result,
            observations: observations.into(),
            carried_over: false,
            recorded_at: Timestamp::now(),
        }
    }

    /// Re-issue a prior approving verdict against a newer submission,
    /// tagged as carried over.
    pub fn carried_into(&self, submission_id: SubmissionId) -> Self {
        Self {
            id: EvaluationId::new(),
            submission_id,
            stage_id: self.stage_id,
            evaluator_id: self.evaluator_id.clone(),
            official_result: self.official_result,
            observations: self.observations.clone(),
            carried_over: true,
            recorded_at: self.recorded_at,
        }
    }
}

// ─── Deadline ────────────────────────────────────────────────────────

/// A remediation or delivery deadline attached to a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deadline {
    /// Unique deadline identifier.
    pub id: DeadlineId,
    /// The stage this deadline applies to.
    pub stage_id: StageId,
    /// What is due.
    pub description: String,
    /// When it is due.
    pub due_date: Timestamp,
    /// Who created the deadline.
    pub created_by: UserId,
    /// Hex digest of the consolidation decision that spawned this
    /// deadline, when orchestrator-created. Used to suppress duplicates
    /// on retried applies.
    pub decision_digest: Option<String>,
    /// When the deadline was created.
    pub created_at: Timestamp,
}

impl Deadline {
    /// Create a deadline.
    pub fn new(
        stage_id: StageId,
        description: impl Into<String>,
        due_date: Timestamp,
        created_by: UserId,
        decision_digest: Option<String>,
    ) -> Self {
        Self {
            id: DeadlineId::new(),
            stage_id,
            description: description.into(),
            due_date,
            created_by,
            decision_digest,
            created_at: Timestamp::now(),
        }
    }
}

// ─── Defense Session ─────────────────────────────────────────────────

/// A scheduled oral defense. Carries the numeric grade once recorded;
/// the consolidation engine reads the grade from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefenseSession {
    /// Unique session identifier.
    pub id: DefenseSessionId,
    /// The defense stage this session belongs to.
    pub stage_id: StageId,
    /// When the defense takes place.
    pub scheduled_at: Timestamp,
    /// Room or virtual meeting reference.
    pub location: String,
    /// Final grade (0–100), recorded after the session.
    pub grade: Option<u8>,
}

impl DefenseSession {
    /// Schedule a defense session.
    pub fn new(stage_id: StageId, scheduled_at: Timestamp, location: impl Into<String>) -> Self {
        Self {
            id: DefenseSessionId::new(),
            stage_id,
            scheduled_at,
            location: location.into(),
            grade: None,
        }
    }
}

// ─── Audit Trail ─────────────────────────────────────────────────────

/// Kind of audit event, one per state-changing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    /// A project was registered and its proposal stage opened.
    ProyectoRegistrado,
    /// A stage was consolidated with an official outcome.
    EtapaConsolidada,
    /// A director endorsement was recorded.
    AvalRegistrado,
    /// An evaluator's verdict was recorded.
    ConceptoRegistrado,
    /// Jurors were assigned and review began.
    JuradosAsignados,
    /// A submission version was filed.
    EntregaRadicada,
    /// A successor stage was opened.
    EtapaAbierta,
    /// A defense session was scheduled.
    SustentacionProgramada,
    /// The defense grade was recorded.
    NotaSustentacionRegistrada,
    /// The project concluded with its final delivery.
    ProyectoFinalizado,
    /// The project was administratively cancelled.
    ProyectoCancelado,
    /// The project administratively lapsed.
    ProyectoVencido,
}

impl AuditKind {
    /// The official uppercase label recorded in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProyectoRegistrado => "PROYECTO_REGISTRADO",
            Self::EtapaConsolidada => "ETAPA_CONSOLIDADA",
            Self::AvalRegistrado => "AVAL_REGISTRADO",
            Self::ConceptoRegistrado => "CONCEPTO_REGISTRADO",
            Self::JuradosAsignados => "JURADOS_ASIGNADOS",
            Self::EntregaRadicada => "ENTREGA_RADICADA",
            Self::EtapaAbierta => "ETAPA_ABIERTA",
            Self::SustentacionProgramada => "SUSTENTACION_PROGRAMADA",
            Self::NotaSustentacionRegistrada => "NOTA_SUSTENTACION_REGISTRADA",
            Self::ProyectoFinalizado => "PROYECTO_FINALIZADO",
            Self::ProyectoCancelado => "PROYECTO_CANCELADO",
            Self::ProyectoVencido => "PROYECTO_VENCIDO",
        }
    }
}

impl std::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditKind {
    type Err = TdgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROYECTO_REGISTRADO" => Ok(Self::ProyectoRegistrado),
            "ETAPA_CONSOLIDADA" => Ok(Self::EtapaConsolidada),
            "AVAL_REGISTRADO" => Ok(Self::AvalRegistrado),
            "CONCEPTO_REGISTRADO" => Ok(Self::ConceptoRegistrado),
            "JURADOS_ASIGNADOS" => Ok(Self::JuradosAsignados),
            "ENTREGA_RADICADA" => Ok(Self::EntregaRadicada),
            "ETAPA_ABIERTA" => Ok(Self::EtapaAbierta),
            "SUSTENTACION_PROGRAMADA" => Ok(Self::SustentacionProgramada),
            "NOTA_SUSTENTACION_REGISTRADA" => Ok(Self::NotaSustentacionRegistrada),
            "PROYECTO_FINALIZADO" => Ok(Self::ProyectoFinalizado),
            "PROYECTO_CANCELADO" => Ok(Self::ProyectoCancelado),
            "PROYECTO_VENCIDO" => Ok(Self::ProyectoVencido),
            other => Err(TdgError::Validation(format!(
                "unknown audit kind label: {other:?}"
            ))),
        }
    }
}

/// One entry of the append-only audit trail.
///
/// Every state-changing orchestrator operation appends exactly one
/// event. The metadata digest covers the canonicalized metadata payload
/// so later tampering is detectable; consolidation events additionally
/// carry their decision digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event identifier.
    pub id: AuditEventId,
    /// The project the event belongs to.
    pub project_id: ProjectId,
    /// The user on whose behalf the operation ran.
    pub user_id: UserId,
    /// Event kind.
    pub kind: AuditKind,
    /// Human-readable description of the decision taken.
    pub description: String,
    /// Raw inputs of the decision (evaluation snapshots, grades, …).
    pub metadata: Value,
    /// SHA-256 hex digest of the canonicalized metadata.
    pub metadata_digest: String,
    /// Hex digest of the consolidation decision, for consolidation
    /// events.
    pub decision_digest: Option<String>,
    /// When the event was recorded.
    pub recorded_at: Timestamp,
}

impl AuditEvent {
    /// Build an audit event, computing the metadata digest.
    ///
    /// # Errors
    ///
    /// Fails when the metadata cannot be canonicalized (float values).
    pub fn new(
        project_id: ProjectId,
        user_id: UserId,
        kind: AuditKind,
        description: impl Into<String>,
        metadata: Value,
        decision_digest: Option<String>,
    ) -> Result<Self, TdgError> {
        let canonical = CanonicalBytes::new(&metadata)?;
        Ok(Self {
            id: AuditEventId::new(),
            project_id,
            user_id,
            kind,
            description: description.into(),
            metadata,
            metadata_digest: sha256_hex(&canonical),
            decision_digest,
            recorded_at: Timestamp::now(),
        })
    }
}
