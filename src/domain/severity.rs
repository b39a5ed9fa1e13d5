use serde::{Deserialize, Serialize};
use std::fmt;

/// Máximo de manchas (inclusive) para clasificar como Mild.
pub const MILD_MAX_SPOTS: usize = 5;
/// Máximo de manchas (inclusive) para clasificar como Moderate.
pub const MODERATE_MAX_SPOTS: usize = 15;

/// Nivel de severidad derivado únicamente del número de manchas detectadas.
/// El orden de las variantes es el orden de gravedad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeverityLabel {
    Healthy,
    Mild,
    Moderate,
    Severe,
}

impl SeverityLabel {
    pub const ALL: [SeverityLabel; 4] = [
        SeverityLabel::Healthy,
        SeverityLabel::Mild,
        SeverityLabel::Moderate,
        SeverityLabel::Severe,
    ];

    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SeverityLabel::Healthy => "Healthy",
            SeverityLabel::Mild => "Mild",
            SeverityLabel::Moderate => "Moderate",
            SeverityLabel::Severe => "Severe",
        }
    }

    /// Rango de manchas que cubre cada nivel, para la leyenda del informe.
    pub fn spot_range(self) -> &'static str {
        match self {
            SeverityLabel::Healthy => "0 spots",
            SeverityLabel::Mild => "1-5 spots",
            SeverityLabel::Moderate => "6-15 spots",
            SeverityLabel::Severe => "16+ spots",
        }
    }

    pub fn bands() -> Vec<SeverityBand> {
        Self::ALL
            .iter()
            .map(|&label| SeverityBand { label, range: label.spot_range().to_string() })
            .collect()
    }
}

impl fmt::Display for SeverityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityBand {
    pub label: SeverityLabel,
    pub range: String,
}

pub fn classify(count: usize) -> SeverityLabel {
    match count {
        0 => SeverityLabel::Healthy,
        c if c <= MILD_MAX_SPOTS => SeverityLabel::Mild,
        c if c <= MODERATE_MAX_SPOTS => SeverityLabel::Moderate,
        _ => SeverityLabel::Severe,
    }
}
