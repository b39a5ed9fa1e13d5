use std::sync::Arc;
use crate::application::{dto::ConfigResponse, services::AnalysisService};

/// Estado compartido para los manejadores HTTP de Axum.
/// Siguiendo la Arquitectura Hexagonal, el estado contiene los servicios (Casos de Uso).
#[derive(Clone)]
pub struct HttpState {
    /// Servicio que ejecuta el análisis de cada hoja subida.
    pub analysis: Arc<AnalysisService>,
    /// Parámetros activos, expuestos tal cual en /api/config.
    pub config: Arc<ConfigResponse>,
}
