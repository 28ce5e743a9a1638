//! # Project Global Status Machine
//!
//! Models the global status of a degree project. A project is `Vigente`
//! for its whole pipeline life; the only regular exit is `Finalizado`
//! (final delivery filed after an approved defense). `Vencido` and
//! `Cancelado` are administrative overrides recorded by the
//! coordination office.
//!
//! ```text
//! Vigente ──finalize()──▶ Finalizado (terminal)
//!    │
//!    ├──expire()───▶ Vencido    (terminal)
//!    └──cancel()───▶ Cancelado  (terminal)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tdg_core::{GlobalStatus, Modality, ProgramCode, ProjectId, Timestamp, UserId};

/// Errors that can occur when changing a project's global status.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// The project is no longer active.
    #[error("project {project_id} is {status} and cannot change status")]
    NotActive {
        /// The project identifier.
        project_id: String,
        /// The current (non-active) status.
        status: String,
    },
}

/// Record of a global status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectTransitionRecord {
    /// Status before the change.
    pub from_status: GlobalStatus,
    /// Status after the change.
    pub to_status: GlobalStatus,
    /// When the change occurred.
    pub timestamp: Timestamp,
    /// Reason for the change.
    pub reason: String,
}

/// A degree project with its global status and status history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier.
    pub id: ProjectId,
    /// Project title.
    pub title: String,
    /// Academic program the project belongs to.
    pub program: ProgramCode,
    /// Modality under which the project is undertaken.
    pub modality: Modality,
    /// Director (advisor) of the project.
    pub director_id: UserId,
    /// Current global status.
    pub global_status: GlobalStatus,
    /// When the project was registered.
    pub created_at: Timestamp,
    /// Ordered log of status changes.
    pub transitions: Vec<ProjectTransitionRecord>,
}

impl Project {
    /// Register a new project; starts `Vigente`.
    pub fn new(
        title: impl Into<String>,
        program: ProgramCode,
        modality: Modality,
        director_id: UserId,
    ) -> Self {
        Self {
            id: ProjectId::new(),
            title: title.into(),
            program,
            modality,
            director_id,
            global_status: GlobalStatus::Vigente,
            created_at: Timestamp::now(),
            transitions: Vec::new(),
        }
    }

    /// Conclude the project on final delivery (VIGENTE → FINALIZADO).
    pub fn finalize(&mut self, reason: &str) -> Result<(), ProjectError> {
        self.transition_from_active(GlobalStatus::Finalizado, reason)
    }

    /// Administratively lapse the project (VIGENTE → VENCIDO).
    pub fn expire(&mut self, reason: &str) -> Result<(), ProjectError> {
        self.transition_from_active(GlobalStatus::Vencido, reason)
    }

    /// Administratively cancel the project (VIGENTE → CANCELADO).
    pub fn cancel(&mut self, reason: &str) -> Result<(), ProjectError> {
        self.transition_from_active(GlobalStatus::Cancelado, reason)
    }

    /// Whether the project can still advance through the pipeline.
    pub fn is_active(&self) -> bool {
        self.global_status.is_active()
    }

    fn transition_from_active(
        &mut self,
        to: GlobalStatus,
        reason: &str,
    ) -> Result<(), ProjectError> {
        if !self.global_status.is_active() {
            return Err(ProjectError::NotActive {
                project_id: self.id.to_string(),
                status: self.global_status.to_string(),
            });
        }
        self.transitions.push(ProjectTransitionRecord {
            from_status: self.global_status,
            to_status: to,
            timestamp: Timestamp::now(),
            reason: reason.to_string(),
        });
        self.global_status = to;
        Ok(())
    }
}
