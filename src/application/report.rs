use crate::application::dto::{AnalysisReport, AnnotatedImage};
use crate::domain::{
    advisory::AdvisoryTable,
    detection::DetectionSet,
    severity::SeverityLabel,
};

/// Compone el informe que se muestra al usuario. Sólo selecciona el bloque
/// de consejos que corresponde a la severidad; no decide nada más.
pub fn render_report(
    annotated_image: AnnotatedImage,
    severity: SeverityLabel,
    detections: DetectionSet,
    average_confidence: f64,
    infer_ms: f32,
    advisory: &AdvisoryTable,
) -> AnalysisReport {
    let spot_count = detections.len();
    let confidence_progress = if spot_count > 0 {
        (average_confidence / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    };

    AnalysisReport {
        severity,
        severity_rank: severity.rank(),
        spot_count,
        average_confidence,
        average_confidence_display: format_percentage(average_confidence),
        confidence_progress,
        advisory: advisory.bundle_for(severity).clone(),
        legend: SeverityLabel::bands(),
        annotated_image,
        infer_ms,
        detections,
    }
}

pub fn format_percentage(value: f64) -> String {
    format!("{value:.1}%")
}
