//! # Domain Enums — Single Source of Truth
//!
//! Defines the catalog enums of the thesis pipeline: stage names,
//! workflow states, official outcomes, jury verdicts, project statuses,
//! defense distinction labels, and project modalities. Each is defined
//! exactly once; every `match` on them must be exhaustive, so adding a
//! variant forces every consumer to handle it at compile time.
//!
//! ## Wire Labels
//!
//! The external store records the academic office's official uppercase
//! Spanish labels (`"ANTEPROYECTO"`, `"EN_REVISION"`,
//! `"APROBADA_CON_MODIFICACIONES"`, …). `as_str()`, `FromStr`, and the
//! serde representation all agree on those labels; `as_str()` is the
//! canonical mapping.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::TdgError;

// ─── Stage Names ─────────────────────────────────────────────────────

/// The four stages of the approval pipeline, in order.
///
/// A project advances Propuesta → Anteproyecto → InformeFinal →
/// Sustentacion. Exactly one stage row exists per `(project, stage)`;
/// a successor may be created only once its predecessor is approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageName {
    /// Initial proposal reviewed by the program committee.
    Propuesta,
    /// Pre-project document evaluated by a jury.
    Anteproyecto,
    /// Final report evaluated by a jury.
    InformeFinal,
    /// Oral defense, graded 0–100.
    Sustentacion,
}

impl StageName {
    /// The next stage in the pipeline, if any.
    pub fn successor(&self) -> Option<StageName> {
        match self {
            Self::Propuesta => Some(Self::Anteproyecto),
            Self::Anteproyecto => Some(Self::InformeFinal),
            Self::InformeFinal => Some(Self::Sustentacion),
            Self::Sustentacion => None,
        }
    }

    /// Whether jury evaluation requires a prior approved director
    /// endorsement for this stage.
    ///
    /// The proposal is reviewed directly by the committee and the
    /// defense is graded in session; only the two document stages are
    /// gated on an endorsement.
    pub fn requires_endorsement(&self) -> bool {
        matches!(self, Self::Anteproyecto | Self::InformeFinal)
    }

    /// Whether the stage is consolidated from a single numeric grade
    /// rather than jury verdicts.
    pub fn is_graded(&self) -> bool {
        matches!(self, Self::Sustentacion)
    }

    /// The official uppercase label recorded in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Propuesta => "PROPUESTA",
            Self::Anteproyecto => "ANTEPROYECTO",
            Self::InformeFinal => "INFORME_FINAL",
            Self::Sustentacion => "SUSTENTACION",
        }
    }

    /// All stages in pipeline order.
    pub fn all() -> &'static [StageName] {
        &[
            Self::Propuesta,
            Self::Anteproyecto,
            Self::InformeFinal,
            Self::Sustentacion,
        ]
    }
}

// ─── Workflow (System) State ─────────────────────────────────────────

/// Workflow position of a stage, distinct from its official outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemState {
    /// Being drafted by the student; nothing filed yet.
    Borrador,
    /// Filed and awaiting review.
    Radicada,
    /// Under committee/jury review.
    EnRevision,
    /// Consolidated with observations; remediation expected.
    ConObservaciones,
    /// Closed (terminal).
    Cerrada,
}

impl SystemState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cerrada)
    }

    /// The official uppercase label recorded in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Borrador => "BORRADOR",
            Self::Radicada => "RADICADA",
            Self::EnRevision => "EN_REVISION",
            Self::ConObservaciones => "CON_OBSERVACIONES",
            Self::Cerrada => "CERRADA",
        }
    }
}

// ─── Official State ──────────────────────────────────────────────────

/// The formally recorded approval outcome of a stage.
///
/// Invariant (enforced by the stage machine): a stage whose official
/// state is not `Pendiente` must sit in `Cerrada` or `ConObservaciones`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfficialState {
    /// No official outcome recorded yet.
    Pendiente,
    /// Approved.
    Aprobada,
    /// Approved subject to modifications.
    AprobadaConModificaciones,
    /// Not approved.
    NoAprobada,
}

impl OfficialState {
    /// Whether an official outcome has been recorded.
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Pendiente)
    }

    /// The official uppercase label recorded in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pendiente => "PENDIENTE",
            Self::Aprobada => "APROBADA",
            Self::AprobadaConModificaciones => "APROBADA_CON_MODIFICACIONES",
            Self::NoAprobada => "NO_APROBADA",
        }
    }
}

// ─── Jury Verdict ────────────────────────────────────────────────────

/// An individual evaluator's verdict on one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfficialResult {
    /// Approved as submitted.
    Aprobado,
    /// Deferred pending modifications.
    AplazadoPorModificaciones,
    /// Not approved.
    NoAprobado,
}

impl OfficialResult {
    /// The official uppercase label recorded in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aprobado => "APROBADO",
            Self::AplazadoPorModificaciones => "APLAZADO_POR_MODIFICACIONES",
            Self::NoAprobado => "NO_APROBADO",
        }
    }
}

// ─── Project Global Status ───────────────────────────────────────────

/// Global status of a project, derived from stage outcomes.
///
/// `Vigente` until closure; `Finalizado` after the final delivery is
/// filed; `Vencido` and `Cancelado` are administrative overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlobalStatus {
    /// Active.
    Vigente,
    /// Concluded with the final delivery filed.
    Finalizado,
    /// Lapsed past its allowed time (administrative).
    Vencido,
    /// Cancelled (administrative).
    Cancelado,
}

impl GlobalStatus {
    /// Whether the project can still advance through the pipeline.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Vigente)
    }

    /// The official uppercase label recorded in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vigente => "VIGENTE",
            Self::Finalizado => "FINALIZADO",
            Self::Vencido => "VENCIDO",
            Self::Cancelado => "CANCELADO",
        }
    }
}

// ─── Defense Distinction ─────────────────────────────────────────────

/// Distinction tier awarded from the defense grade.
///
/// Bands over the integer grade: `< 70` Reprobada, `70..=94` Aprobada,
/// `95..=99` Meritoria, `100` Laureada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefenseLabel {
    /// Failed defense.
    Reprobada,
    /// Passing defense with no distinction.
    Aprobada,
    /// Meritorious distinction.
    Meritoria,
    /// Laureate distinction (perfect grade).
    Laureada,
}

impl DefenseLabel {
    /// The official uppercase label recorded in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reprobada => "REPROBADA",
            Self::Aprobada => "APROBADA",
            Self::Meritoria => "MERITORIA",
            Self::Laureada => "LAUREADA",
        }
    }
}

// ─── Modality ────────────────────────────────────────────────────────

/// Modality under which a degree project is undertaken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    /// Research project.
    Investigacion,
    /// Supervised internship in industry.
    PracticaEmpresarial,
    /// Entrepreneurship project.
    Emprendimiento,
    /// Coursework-deepening project.
    Profundizacion,
}

impl Modality {
    /// The official uppercase label recorded in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Investigacion => "INVESTIGACION",
            Self::PracticaEmpresarial => "PRACTICA_EMPRESARIAL",
            Self::Emprendimiento => "EMPRENDIMIENTO",
            Self::Profundizacion => "PROFUNDIZACION",
        }
    }
}

// ─── Display / FromStr ───────────────────────────────────────────────

macro_rules! impl_label_conversions {
    ($ty:ident { $($label:literal => $variant:ident),+ $(,)? }) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = TdgError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    other => Err(TdgError::Validation(format!(
                        concat!("unknown ", stringify!($ty), " label: {:?}"),
                        other
                    ))),
                }
            }
        }
    };
}

impl_label_conversions!(StageName {
    "PROPUESTA" => Propuesta,
    "ANTEPROYECTO" => Anteproyecto,
    "INFORME_FINAL" => InformeFinal,
    "SUSTENTACION" => Sustentacion,
});

impl_label_conversions!(SystemState {
    "BORRADOR" => Borrador,
    "RADICADA" => Radicada,
    "EN_REVISION" => EnRevision,
    "CON_OBSERVACIONES" => ConObservaciones,
    "CERRADA" => Cerrada,
});

impl_label_conversions!(OfficialState {
    "PENDIENTE" => Pendiente,
    "APROBADA" => Aprobada,
    "APROBADA_CON_MODIFICACIONES" => AprobadaConModificaciones,
    "NO_APROBADA" => NoAprobada,
});

impl_label_conversions!(OfficialResult {
    "APROBADO" => Aprobado,
    "APLAZADO_POR_MODIFICACIONES" => AplazadoPorModificaciones,
    "NO_APROBADO" => NoAprobado,
});

impl_label_conversions!(GlobalStatus {
    "VIGENTE" => Vigente,
    "FINALIZADO" => Finalizado,
    "VENCIDO" => Vencido,
    "CANCELADO" => Cancelado,
});

impl_label_conversions!(DefenseLabel {
    "REPROBADA" => Reprobada,
    "APROBADA" => Aprobada,
    "MERITORIA" => Meritoria,
    "LAUREADA" => Laureada,
});

impl_label_conversions!(Modality {
    "INVESTIGACION" => Investigacion,
    "PRACTICA_EMPRESARIAL" => PracticaEmpresarial,
    "EMPRENDIMIENTO" => Emprendimiento,
    "PROFUNDIZACION" => Profundizacion,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_pipeline() {
        assert_eq!(StageName::Propuesta.successor(), Some(StageName::Anteproyecto));
        assert_eq!(
            StageName::Anteproyecto.successor(),
            Some(StageName::InformeFinal)
        );
        assert_eq!(
            StageName::InformeFinal.successor(),
            Some(StageName::Sustentacion)
        );
        assert_eq!(StageName::Sustentacion.successor(), None);
    }

    #[test]
    fn test_endorsement_gate_stages() {
        assert!(!StageName::Propuesta.requires_endorsement());
        assert!(StageName::Anteproyecto.requires_endorsement());
        assert!(StageName::InformeFinal.requires_endorsement());
        assert!(!StageName::Sustentacion.requires_endorsement());
    }

    #[test]
    fn test_only_defense_is_graded() {
        for stage in StageName::all() {
            assert_eq!(stage.is_graded(), *stage == StageName::Sustentacion);
        }
    }

    #[test]
    fn test_stage_as_str_roundtrip() {
        for stage in StageName::all() {
            let parsed: StageName = stage.as_str().parse().unwrap();
            assert_eq!(*stage, parsed);
        }
    }

    #[test]
    fn test_system_state_terminal() {
        assert!(SystemState::Cerrada.is_terminal());
        assert!(!SystemState::ConObservaciones.is_terminal());
        assert!(!SystemState::Borrador.is_terminal());
    }

    #[test]
    fn test_official_state_decided() {
        assert!(!OfficialState::Pendiente.is_decided());
        assert!(OfficialState::Aprobada.is_decided());
        assert!(OfficialState::AprobadaConModificaciones.is_decided());
        assert!(OfficialState::NoAprobada.is_decided());
    }

    #[test]
    fn test_serde_format_matches_as_str() {
        let cases = [
            serde_json::to_string(&StageName::InformeFinal).unwrap(),
            serde_json::to_string(&SystemState::EnRevision).unwrap(),
            serde_json::to_string(&OfficialState::AprobadaConModificaciones).unwrap(),
            serde_json::to_string(&OfficialResult::AplazadoPorModificaciones).unwrap(),
            serde_json::to_string(&GlobalStatus::Vigente).unwrap(),
            serde_json::to_string(&Modality::PracticaEmpresarial).unwrap(),
        ];
        let expected = [
            "\"INFORME_FINAL\"",
            "\"EN_REVISION\"",
            "\"APROBADA_CON_MODIFICACIONES\"",
            "\"APLAZADO_POR_MODIFICACIONES\"",
            "\"VIGENTE\"",
            "\"PRACTICA_EMPRESARIAL\"",
        ];
        assert_eq!(cases, expected);
    }

    #[test]
    fn test_from_str_rejects_unknown_and_case() {
        assert!("propuesta".parse::<StageName>().is_err());
        assert!("SUSPENDIDA".parse::<SystemState>().is_err());
        assert!("".parse::<OfficialResult>().is_err());
    }

    #[test]
    fn test_global_status_active() {
        assert!(GlobalStatus::Vigente.is_active());
        assert!(!GlobalStatus::Finalizado.is_active());
        assert!(!GlobalStatus::Vencido.is_active());
        assert!(!GlobalStatus::Cancelado.is_active());
    }

    #[test]
    fn test_defense_label_serde_roundtrip() {
        for label in [
            DefenseLabel::Reprobada,
            DefenseLabel::Aprobada,
            DefenseLabel::Meritoria,
            DefenseLabel::Laureada,
        ] {
            let json = serde_json::to_string(&label).unwrap();
            let parsed: DefenseLabel = serde_json::from_str(&json).unwrap();
            assert_eq!(label, parsed);
        }
    }
}
