use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No se pudo cargar el modelo: {0}")]
    ModelLoad(String),
    #[error("Análisis deshabilitado: {0}")]
    AnalysisDisabled(String),
    #[error("Error procesando la imagen: {0}")]
    Processing(String),
    #[error("Error de inferencia: {0}")]
    Inference(String),
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),
    #[error("No encontrado: {0}")]
    NotFound(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
