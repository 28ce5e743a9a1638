//! # In-Memory Ledger
//!
//! A `StageLedger` backed by in-memory maps, for unit tests and local
//! development. All state lives behind one mutex, so the conditional
//! stage update is a genuine atomic check-and-set — the same guarantee
//! the relational store provides with a conditional `UPDATE`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tdg_core::{OfficialState, ProjectId, StageId, StageName, SubmissionId};
use tdg_state::{
    AuditEvent, Deadline, DefenseSession, Endorsement, Evaluation, Project, ProjectStage,
    Submission,
};

use crate::ledger::{LedgerError, StageLedger};

#[derive(Default)]
struct Inner {
    projects: HashMap<ProjectId, Project>,
    stages: HashMap<StageId, ProjectStage>,
    submissions: Vec<Submission>,
    endorsements: Vec<Endorsement>,
    evaluations: Vec<Evaluation>,
    deadlines: Vec<Deadline>,
    defense_sessions: Vec<DefenseSession>,
    audit_events: Vec<AuditEvent>,
}

/// In-memory stage ledger.
///
/// Cheaply cloneable — all clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, LedgerError> {
        self.inner
            .lock()
            .map_err(|_| LedgerError::Backend("ledger lock poisoned".to_string()))
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.lock() {
            Ok(inner) => f
                .debug_struct("InMemoryLedger")
                .field("projects", &inner.projects.len())
                .field("stages", &inner.stages.len())
                .field("audit_events", &inner.audit_events.len())
                .finish(),
            Err(_) => f.write_str("InMemoryLedger(poisoned)"),
        }
    }
}

impl StageLedger for InMemoryLedger {
    fn get_project(&self, id: &ProjectId) -> Result<Project, LedgerError> {
        self.lock()?
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound {
                entity: "project",
                id: id.to_string(),
            })
    }

    fn get_stage(&self, id: &StageId) -> Result<ProjectStage, LedgerError> {
        self.lock()?
            .stages
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound {
                entity: "stage",
                id: id.to_string(),
            })
    }

    fn find_stage(
        &self,
        project_id: &ProjectId,
        stage_name: StageName,
    ) -> Result<Option<ProjectStage>, LedgerError> {
        Ok(self
            .lock()?
            .stages
            .values()
            .find(|s| s.project_id == *project_id && s.stage_name == stage_name)
            .cloned())
    }

    fn latest_submission(&self, stage_id: &StageId) -> Result<Option<Submission>, LedgerError> {
        Ok(self
            .lock()?
            .submissions
            .iter()
            .filter(|s| s.stage_id == *stage_id)
            .max_by_key(|s| s.version)
            .cloned())
    }

    fn endorsements(&self, submission_id: &SubmissionId) -> Result<Vec<Endorsement>, LedgerError> {
        Ok(self
            .lock()?
            .endorsements
            .iter()
            .filter(|e| e.submission_id == *submission_id)
            .cloned()
            .collect())
    }

    fn evaluations(&self, stage_id: &StageId) -> Result<Vec<Evaluation>, LedgerError> {
        Ok(self
            .lock()?
            .evaluations
            .iter()
            .filter(|e| e.stage_id == *stage_id)
            .cloned()
            .collect())
    }

    fn latest_defense_session(
        &self,
        stage_id: &StageId,
    ) -> Result<Option<DefenseSession>, LedgerError> {
        Ok(self
            .lock()?
            .defense_sessions
            .iter()
            .filter(|s| s.stage_id == *stage_id)
            .next_back()
            .cloned())
    }

    fn deadline_exists(
        &self,
        stage_id: &StageId,
        decision_digest: &str,
    ) -> Result<bool, LedgerError> {
        Ok(self.lock()?.deadlines.iter().any(|d| {
            d.stage_id == *stage_id && d.decision_digest.as_deref() == Some(decision_digest)
        }))
    }

    fn has_audit_event(&self, decision_digest: &str) -> Result<bool, LedgerError> {
        Ok(self
            .lock()?
            .audit_events
            .iter()
            .any(|e| e.decision_digest.as_deref() == Some(decision_digest)))
    }

    fn audit_events(&self, project_id: &ProjectId) -> Result<Vec<AuditEvent>, LedgerError> {
        Ok(self
            .lock()?
            .audit_events
            .iter()
            .filter(|e| e.project_id == *project_id)
            .cloned()
            .collect())
    }

    fn insert_project(&self, project: &Project) -> Result<(), LedgerError> {
        let mut inner = self.lock()?;
        if inner.projects.contains_key(&project.id) {
            return Err(LedgerError::Duplicate {
                entity: "project",
                detail: project.id.to_string(),
            });
        }
        inner.projects.insert(project.id, project.clone());
        Ok(())
    }

    fn update_project(&self, project: &Project) -> Result<(), LedgerError> {
        let mut inner = self.lock()?;
        if !inner.projects.contains_key(&project.id) {
            return Err(LedgerError::NotFound {
                entity: "project",
                id: project.id.to_string(),
            });
        }
        inner.projects.insert(project.id, project.clone());
        Ok(())
    }

    fn insert_stage(&self, stage: &ProjectStage) -> Result<(), LedgerError> {
        let mut inner = self.lock()?;
        let clash = inner.stages.values().any(|s| {
            s.id == stage.id
                || (s.project_id == stage.project_id && s.stage_name == stage.stage_name)
        });
        if clash {
            return Err(LedgerError::Duplicate {
                entity: "stage",
                detail: format!("{} for {}", stage.stage_name, stage.project_id),
            });
        }
        inner.stages.insert(stage.id, stage.clone());
        Ok(())
    }

    fn update_stage(
        &self,
        stage: &ProjectStage,
        expected: OfficialState,
    ) -> Result<(), LedgerError> {
        let mut inner = self.lock()?;
        let stored = inner
            .stages
            .get(&stage.id)
            .ok_or_else(|| LedgerError::NotFound {
                entity: "stage",
                id: stage.id.to_string(),
            })?;
        if stored.official_state != expected {
            return Err(LedgerError::Conflict {
                reason: format!(
                    "stage {} expected official state {expected}, found {}",
                    stage.id, stored.official_state
                ),
            });
        }
        inner.stages.insert(stage.id, stage.clone());
        Ok(())
    }

    fn insert_submission(&self, submission: &Submission) -> Result<(), LedgerError> {
        let mut inner = self.lock()?;
        let clash = inner
            .submissions
            .iter()
            .any(|s| s.stage_id == submission.stage_id && s.version == submission.version);
        if clash {
            return Err(LedgerError::Duplicate {
                entity: "submission",
                detail: format!("version {} for {}", submission.version, submission.stage_id),
            });
        }
        inner.submissions.push(submission.clone());
        Ok(())
    }

    fn insert_endorsement(&self, endorsement: &Endorsement) -> Result<(), LedgerError> {
        self.lock()?.endorsements.push(endorsement.clone());
        Ok(())
    }

    fn insert_evaluation(&self, evaluation: &Evaluation) -> Result<(), LedgerError> {
        let mut inner = self.lock()?;
        let clash = inner.evaluations.iter().any(|e| {
            e.submission_id == evaluation.submission_id
                && e.evaluator_id == evaluation.evaluator_id
        });
        if clash {
            return Err(LedgerError::Duplicate {
                entity: "evaluation",
                detail: format!(
                    "evaluator {} on {}",
                    evaluation.evaluator_id, evaluation.submission_id
                ),
            });
        }
        inner.evaluations.push(evaluation.clone());
        Ok(())
    }

    fn insert_deadline(&self, deadline: &Deadline) -> Result<(), LedgerError> {
        self.lock()?.deadlines.push(deadline.clone());
        Ok(())
    }

    fn insert_defense_session(&self, session: &DefenseSession) -> Result<(), LedgerError> {
        self.lock()?.defense_sessions.push(session.clone());
        Ok(())
    }

    fn update_defense_session(&self, session: &DefenseSession) -> Result<(), LedgerError> {
        let mut inner = self.lock()?;
        match inner
            .defense_sessions
            .iter_mut()
            .find(|s| s.id == session.id)
        {
            Some(slot) => {
                *slot = session.clone();
                Ok(())
            }
            None => Err(LedgerError::NotFound {
                entity: "defense session",
                id: session.id.to_string(),
            }),
        }
    }

    fn append_audit_event(&self, event: &AuditEvent) -> Result<(), LedgerError> {
        self.lock()?.audit_events.push(event.clone());
        Ok(())
    }
}

/// Deadlines recorded for a stage — test helper surface.
impl InMemoryLedger {
    /// All deadlines of a stage, in creation order.
    pub fn deadlines(&self, stage_id: &StageId) -> Result<Vec<Deadline>, LedgerError> {
        Ok(self
            .lock()?
            .deadlines
            .iter()
            .filter(|d| d.stage_id == *stage_id)
            .cloned()
            .collect())
    }
}
