mod domain;
mod application;
mod adapters;
mod config;

use clap::Parser;
use std::sync::Arc;
use tower_http::services::ServeDir;
use crate::application::{
    dto::ConfigResponse,
    ports::DetectorPort,
    services::{prepare_detector, AnalysisService},
};
use crate::adapters::{
    imaging::{annotate::BoxAnnotator, ingest::ImageIngestor},
    onnx::{model_catalog::OnnxModelCatalog, yolo_engine::OnnxYoloEngine},
    http::{state::HttpState, router},
};
use crate::config::Settings;
use crate::domain::errors::DomainError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    // 2. Configuración (flags + variables de entorno)
    let settings = Settings::parse();
    settings.validate()?;
    let advisory = Arc::new(settings.load_advisory()?);
    let infer = settings.inference_config();

    tracing::info!("🔧 Cargando modelo {} ...", infer.model.onnx_path);

    // 3. Detector: se valida y construye una sola vez. Si falla, el servidor
    // arranca igualmente con el análisis deshabilitado.
    let catalog = OnnxModelCatalog::new();
    let detector = prepare_detector(&catalog, &infer.model, || {
        OnnxYoloEngine::load(
            &infer.model.onnx_path,
            infer.intra_threads,
            infer.params.clone(),
            infer.class_names.clone(),
        )
        .map(|engine| Arc::new(engine) as Arc<dyn DetectorPort>)
        .map_err(|e| DomainError::ModelLoad(format!("{e:#}")))
    })
    .await;

    // 4. Servicio de análisis (Capa de Aplicación - Caso de Uso)
    let analysis = Arc::new(AnalysisService::new(
        detector,
        Arc::new(ImageIngestor::new()),
        Arc::new(BoxAnnotator::default()),
        advisory,
        infer.model.clone(),
        infer.params.channel_order,
    ));

    // 5. Configurar el Estado de la API
    let state = HttpState {
        analysis,
        config: Arc::new(ConfigResponse {
            yolo: infer.params.clone(),
            class_names: infer.class_names.clone(),
            max_upload_bytes: settings.max_upload_bytes(),
        }),
    };

    // 6. Router de Axum y archivos estáticos
    let app = router(state)
        .fallback_service(ServeDir::new(&settings.static_dir));

    // 7. Lanzar el Servidor
    let addr = settings.bind_addr();

    tracing::info!("🚀 Servidor de diagnóstico de hojas iniciado en http://{}", addr);
    tracing::info!("📂 Archivos estáticos servidos desde {}", settings.static_dir.display());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
