use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::errors::{DomainError, DomainResult};
use super::severity::SeverityLabel;

/// Tabla de consejos incluida en el binario.
pub const BUILTIN_ADVISORY_JSON: &str = include_str!("../../data/advisory.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub organic: Vec<String>,
    pub chemical: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreventionCategory {
    pub title: String,
    pub items: Vec<String>,
}

/// Texto de tratamiento y prevención asociado a un nivel de severidad.
/// `treatment == None` es el bloque "sin tratamiento".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryBundle {
    pub headline: String,
    #[serde(default)]
    pub treatment: Option<Treatment>,
    #[serde(default)]
    pub prevention: Vec<PreventionCategory>,
}

impl AdvisoryBundle {
    pub fn needs_treatment(&self) -> bool {
        self.treatment.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AdvisoryTable(BTreeMap<SeverityLabel, AdvisoryBundle>);

impl AdvisoryTable {
    /// Parsea y valida la tabla: debe cubrir los cuatro niveles.
    pub fn from_json(raw: &str) -> DomainResult<Self> {
        let map: BTreeMap<SeverityLabel, AdvisoryBundle> = serde_json::from_str(raw)
            .map_err(|e| DomainError::InvalidInput(format!("tabla de consejos: {e}")))?;
        Self::from_map(map)
    }

    pub fn from_map(map: BTreeMap<SeverityLabel, AdvisoryBundle>) -> DomainResult<Self> {
        let missing: Vec<&str> = SeverityLabel::ALL
            .iter()
            .filter(|label| !map.contains_key(label))
            .map(|label| label.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::InvalidInput(format!(
                "tabla de consejos incompleta, faltan: {}",
                missing.join(", ")
            )));
        }
        Ok(Self(map))
    }

    pub fn builtin() -> DomainResult<Self> {
        Self::from_json(BUILTIN_ADVISORY_JSON)
    }

    pub fn bundle_for(&self, label: SeverityLabel) -> &AdvisoryBundle {
        // from_map garantiza que todas las claves existen
        &self.0[&label]
    }
}
