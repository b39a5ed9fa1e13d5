use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::{
    application::{
        dto::{AnalysisReport, StatusResponse},
        ports::{AnnotatorPort, DetectorPort, ImageIngestPort, ModelCatalogPort},
        report::render_report,
    },
    domain::{
        advisory::AdvisoryTable,
        errors::{DomainError, DomainResult},
        model::{ChannelOrder, ModelId},
        severity::classify,
    },
};

/// Estado del detector tras el arranque. Si la carga falla el análisis queda
/// deshabilitado para el resto del proceso; no se reintenta.
#[derive(Clone)]
pub enum DetectorState {
    Ready(Arc<dyn DetectorPort>),
    Disabled(String),
}

/// Valida el artefacto y construye el detector una única vez.
/// Cualquier fallo se registra aquí (una sola vez) y se convierte en `Disabled`.
pub async fn prepare_detector<F>(
    catalog: &dyn ModelCatalogPort,
    model: &ModelId,
    load: F,
) -> DetectorState
where
    F: FnOnce() -> DomainResult<Arc<dyn DetectorPort>>,
{
    let loaded = match catalog.validate_model(model).await {
        Ok(()) => load(),
        Err(e) => Err(DomainError::ModelLoad(e.to_string())),
    };

    match loaded {
        Ok(detector) => {
            info!("Modelo '{}' cargado desde {}", model.name, model.onnx_path);
            DetectorState::Ready(detector)
        }
        Err(e) => {
            error!("Análisis deshabilitado: {}", e);
            DetectorState::Disabled(e.to_string())
        }
    }
}

/// Caso de uso: subida → ingesta → detección → severidad → informe.
/// No guarda nada entre peticiones.
#[derive(Clone)]
pub struct AnalysisService {
    detector: DetectorState,
    ingest: Arc<dyn ImageIngestPort>,
    annotator: Arc<dyn AnnotatorPort>,
    advisory: Arc<AdvisoryTable>,
    model: ModelId,
    channel_order: ChannelOrder,
}

impl AnalysisService {
    pub fn new(
        detector: DetectorState,
        ingest: Arc<dyn ImageIngestPort>,
        annotator: Arc<dyn AnnotatorPort>,
        advisory: Arc<AdvisoryTable>,
        model: ModelId,
        channel_order: ChannelOrder,
    ) -> Self {
        Self { detector, ingest, annotator, advisory, model, channel_order }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.detector, DetectorState::Ready(_))
    }

    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            ready: self.is_ready(),
            model_path: self.model.onnx_path.clone(),
            error: match &self.detector {
                DetectorState::Ready(_) => None,
                DetectorState::Disabled(reason) => Some(reason.clone()),
            },
        }
    }

    pub fn advisory(&self) -> &AdvisoryTable {
        &self.advisory
    }

    /// Ejecuta el pipeline completo de forma síncrona sobre los bytes subidos.
    pub fn analyze(&self, upload: &[u8]) -> DomainResult<AnalysisReport> {
        let detector = match &self.detector {
            DetectorState::Ready(d) => d,
            DetectorState::Disabled(reason) => {
                return Err(DomainError::AnalysisDisabled(reason.clone()))
            }
        };

        let image = self.ingest.ingest(upload, self.channel_order)?;

        let t_infer_start = Instant::now();
        let detections = detector.detect(&image.input)?;
        let infer_ms = t_infer_start.elapsed().as_secs_f32() * 1000.0;

        let severity = classify(detections.len());
        let average_confidence = detections.average_confidence_pct();
        let annotated = self.annotator.annotate(&image.rgb, &detections)?;

        info!(
            "Análisis: {}x{} px, {} manchas, severidad {}, {:.1} ms",
            image.rgb.width(),
            image.rgb.height(),
            detections.len(),
            severity,
            infer_ms
        );

        Ok(render_report(
            annotated,
            severity,
            detections,
            average_confidence,
            infer_ms,
            &self.advisory,
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::imaging::{annotate::BoxAnnotator, ingest::ImageIngestor};
    use crate::domain::{
        detection::{spot, DetectionSet},
        pixels::PixelArray,
        severity::SeverityLabel,
    };
    use async_trait::async_trait;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Detector de pruebas que siempre devuelve el mismo conjunto.
    pub(crate) struct StubDetector {
        pub set: DetectionSet,
        pub calls: AtomicUsize,
    }

    impl StubDetector {
        pub(crate) fn new(set: DetectionSet) -> Self {
            Self { set, calls: AtomicUsize::new(0) }
        }
    }

    impl DetectorPort for StubDetector {
        fn detect(&self, _image: &PixelArray) -> DomainResult<DetectionSet> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.set.clone())
        }
    }

    struct FailingDetector;

    impl DetectorPort for FailingDetector {
        fn detect(&self, _image: &PixelArray) -> DomainResult<DetectionSet> {
            Err(DomainError::Inference("tensor de salida vacío".into()))
        }
    }

    struct StaticCatalog(DomainResult<()>);

    #[async_trait]
    impl ModelCatalogPort for StaticCatalog {
        async fn validate_model(&self, _model: &ModelId) -> DomainResult<()> {
            match &self.0 {
                Ok(()) => Ok(()),
                Err(e) => Err(DomainError::NotFound(e.to_string())),
            }
        }
    }

    pub(crate) fn test_model() -> ModelId {
        ModelId { name: "test".into(), onnx_path: "models/test.onnx".into() }
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([40, 160, 60]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    pub(crate) fn service_with(detector: DetectorState) -> AnalysisService {
        AnalysisService::new(
            detector,
            Arc::new(ImageIngestor::new()),
            Arc::new(BoxAnnotator::default()),
            Arc::new(AdvisoryTable::builtin().unwrap()),
            test_model(),
            ChannelOrder::Rgb,
        )
    }

    fn three_spots() -> DetectionSet {
        DetectionSet::new(vec![
            spot(2.0, 2.0, 8.0, 8.0, 0.9),
            spot(10.0, 10.0, 16.0, 16.0, 0.8),
            spot(20.0, 4.0, 28.0, 12.0, 0.7),
        ])
    }

    #[test]
    fn stub_detector_drives_mild_report() {
        let stub = Arc::new(StubDetector::new(three_spots()));
        let svc = service_with(DetectorState::Ready(stub.clone()));

        let report = svc.analyze(&png_bytes(32, 32)).unwrap();
        assert_eq!(report.severity, SeverityLabel::Mild);
        assert_eq!(report.spot_count, 3);
        assert_eq!(report.average_confidence_display, "80.0%");
        assert_eq!(report.annotated_image.width, 32);
        assert_eq!(report.annotated_image.mime, "image/png");
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_detection_set_is_healthy_without_treatment() {
        let svc = service_with(DetectorState::Ready(Arc::new(StubDetector::new(DetectionSet::empty()))));
        let report = svc.analyze(&png_bytes(16, 16)).unwrap();
        assert_eq!(report.severity, SeverityLabel::Healthy);
        assert_eq!(report.average_confidence, 0.0);
        assert!(report.advisory.treatment.is_none());
    }

    #[test]
    fn disabled_service_refuses_analysis() {
        let svc = service_with(DetectorState::Disabled("best.onnx no existe".into()));
        assert!(!svc.is_ready());
        let err = svc.analyze(&png_bytes(8, 8)).unwrap_err();
        assert!(matches!(err, DomainError::AnalysisDisabled(_)));
        assert_eq!(svc.status().error.as_deref(), Some("best.onnx no existe"));
    }

    #[test]
    fn bad_upload_fails_request_but_service_stays_usable() {
        let svc = service_with(DetectorState::Ready(Arc::new(StubDetector::new(three_spots()))));
        let err = svc.analyze(b"definitely not an image").unwrap_err();
        assert!(matches!(err, DomainError::Processing(_)));
        assert!(svc.analyze(&png_bytes(32, 32)).is_ok());
    }

    #[test]
    fn inference_error_is_surfaced() {
        let svc = service_with(DetectorState::Ready(Arc::new(FailingDetector)));
        let err = svc.analyze(&png_bytes(8, 8)).unwrap_err();
        assert!(matches!(err, DomainError::Inference(_)));
    }

    #[tokio::test]
    async fn prepare_detector_disables_on_missing_artifact() {
        let catalog = StaticCatalog(Err(DomainError::NotFound("models/test.onnx".into())));
        let mut loader_called = false;
        let state = prepare_detector(&catalog, &test_model(), || {
            loader_called = true;
            Ok(Arc::new(StubDetector::new(DetectionSet::empty())) as Arc<dyn DetectorPort>)
        })
        .await;
        assert!(matches!(state, DetectorState::Disabled(_)));
        assert!(!loader_called);
    }

    #[tokio::test]
    async fn prepare_detector_disables_on_load_error() {
        let catalog = StaticCatalog(Ok(()));
        let state = prepare_detector(&catalog, &test_model(), || {
            Err(DomainError::ModelLoad("protobuf parsing failed".into()))
        })
        .await;
        match state {
            DetectorState::Disabled(reason) => assert!(reason.contains("protobuf")),
            DetectorState::Ready(_) => panic!("expected disabled detector"),
        }
    }

    #[tokio::test]
    async fn prepare_detector_returns_ready_handle() {
        let catalog = StaticCatalog(Ok(()));
        let state = prepare_detector(&catalog, &test_model(), || {
            Ok(Arc::new(StubDetector::new(DetectionSet::empty())) as Arc<dyn DetectorPort>)
        })
        .await;
        assert!(matches!(state, DetectorState::Ready(_)));
    }
}
