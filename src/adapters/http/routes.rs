use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::adapters::http::state::HttpState;
use crate::application::dto::{AdvisoryResponse, ErrorResponse};
use crate::domain::{errors::DomainError, severity::SeverityLabel};

/// Campo del formulario multipart que trae la foto.
pub const IMAGE_FIELD: &str = "image";

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

fn domain_error_response(e: DomainError) -> Response {
    let status = match &e {
        DomainError::AnalysisDisabled(_) | DomainError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::Processing(_) | DomainError::Inference(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
    };
    warn!("Análisis rechazado ({}): {}", status, e);
    error_response(status, e.to_string())
}

pub async fn analyze(State(st): State<HttpState>, mut multipart: Multipart) -> Response {
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(IMAGE_FIELD) => match field.bytes().await {
                Ok(bytes) => {
                    upload = Some(bytes);
                    break;
                }
                Err(e) => return error_response(e.status(), e.body_text()),
            },
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => return error_response(e.status(), e.body_text()),
        }
    }

    let Some(bytes) = upload else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("falta el campo '{IMAGE_FIELD}' en el formulario"),
        );
    };

    // La inferencia es CPU pura: fuera del runtime async.
    let analysis = st.analysis.clone();
    match tokio::task::spawn_blocking(move || analysis.analyze(&bytes)).await {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(e)) => domain_error_response(e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("tarea de análisis abortada: {e}")),
    }
}

pub async fn status(State(st): State<HttpState>) -> impl IntoResponse {
    Json(st.analysis.status())
}

pub async fn advisory(State(st): State<HttpState>) -> impl IntoResponse {
    Json(AdvisoryResponse {
        advisory: st.analysis.advisory().clone(),
        legend: SeverityLabel::bands(),
    })
}

pub async fn get_config(State(st): State<HttpState>) -> impl IntoResponse {
    Json(st.config.as_ref().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http::router;
    use crate::application::{
        dto::{AnalysisReport, ConfigResponse, StatusResponse},
        ports::DetectorPort,
        services::{
            tests::{png_bytes, service_with, StubDetector},
            DetectorState,
        },
    };
    use crate::domain::{
        detection::{spot, DetectionSet},
        errors::DomainResult,
        model::YoloParams,
        pixels::PixelArray,
    };
    use axum::{body::Body, http::Request, Router};
    use serde::de::DeserializeOwned;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "leafspot-boundary";

    fn app(detector: DetectorState, max_upload_bytes: usize) -> Router {
        router(HttpState {
            analysis: Arc::new(service_with(detector)),
            config: Arc::new(ConfigResponse {
                yolo: YoloParams::default(),
                class_names: vec!["brown_spot".into()],
                max_upload_bytes,
            }),
        })
    }

    fn ready(set: DetectionSet) -> DetectorState {
        DetectorState::Ready(Arc::new(StubDetector::new(set)))
    }

    fn multipart(field: &str, payload: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"leaf.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn json<T: DeserializeOwned>(resp: Response) -> T {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn analyze_returns_report() {
        let set = DetectionSet::new((0..7).map(|i| spot(i as f32, 0.0, i as f32 + 2.0, 2.0, 0.5)).collect());
        let resp = app(ready(set), 1 << 20).oneshot(multipart(IMAGE_FIELD, &png_bytes(24, 24))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let report: AnalysisReport = json(resp).await;
        assert_eq!(report.severity, SeverityLabel::Moderate);
        assert_eq!(report.spot_count, 7);
        assert_eq!(report.average_confidence_display, "50.0%");
        assert!(!report.annotated_image.data_base64.is_empty());
    }

    #[tokio::test]
    async fn missing_image_field_is_bad_request() {
        let resp = app(ready(DetectionSet::empty()), 1 << 20)
            .oneshot(multipart("photo", &png_bytes(8, 8)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn undecodable_upload_is_unprocessable() {
        let resp = app(ready(DetectionSet::empty()), 1 << 20)
            .oneshot(multipart(IMAGE_FIELD, b"GIF89a not really"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let err: ErrorResponse = json(resp).await;
        assert!(!err.error.is_empty());
    }

    /// Falla en la primera inferencia y responde con normalidad después.
    struct FailOnceDetector {
        failed: AtomicBool,
    }

    impl DetectorPort for FailOnceDetector {
        fn detect(&self, _image: &PixelArray) -> DomainResult<DetectionSet> {
            if self.failed.swap(true, Ordering::SeqCst) {
                Ok(DetectionSet::new(vec![spot(1.0, 1.0, 4.0, 4.0, 0.9)]))
            } else {
                Err(DomainError::Inference("Non-zero status code returned while running Conv node".into()))
            }
        }
    }

    #[tokio::test]
    async fn inference_error_is_unprocessable_and_next_upload_succeeds() {
        let detector = DetectorState::Ready(Arc::new(FailOnceDetector { failed: AtomicBool::new(false) }));
        let svc = app(detector, 1 << 20);

        let resp = svc.clone().oneshot(multipart(IMAGE_FIELD, &png_bytes(16, 16))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let err: ErrorResponse = json(resp).await;
        assert!(err.error.contains("Conv node"));

        let resp = svc.oneshot(multipart(IMAGE_FIELD, &png_bytes(16, 16))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let report: AnalysisReport = json(resp).await;
        assert_eq!(report.severity, SeverityLabel::Mild);
        assert_eq!(report.spot_count, 1);
    }

    #[tokio::test]
    async fn disabled_model_is_service_unavailable() {
        let resp = app(DetectorState::Disabled("model file not found".into()), 1 << 20)
            .oneshot(multipart(IMAGE_FIELD, &png_bytes(8, 8)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let resp = app(ready(DetectionSet::empty()), 64)
            .oneshot(multipart(IMAGE_FIELD, &vec![0u8; 4096]))
            .await
            .unwrap();
        assert!(!resp.status().is_success());
    }

    #[tokio::test]
    async fn status_reports_disabled_reason() {
        let resp = app(DetectorState::Disabled("corrupt".into()), 1024)
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status: StatusResponse = json(resp).await;
        assert!(!status.ready);
        assert_eq!(status.error.as_deref(), Some("corrupt"));
        assert_eq!(status.model_path, "models/test.onnx");
    }

    #[tokio::test]
    async fn advisory_and_config_are_served() {
        let svc = app(ready(DetectionSet::empty()), 2048);

        let resp = svc
            .clone()
            .oneshot(Request::builder().uri("/api/advisory").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let advisory: serde_json::Value = json(resp).await;
        assert!(advisory["advisory"]["Healthy"]["treatment"].is_null());
        assert_eq!(advisory["legend"].as_array().map(|l| l.len()), Some(4));

        let resp = svc
            .oneshot(Request::builder().uri("/api/config").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let config: ConfigResponse = json(resp).await;
        assert_eq!(config.max_upload_bytes, 2048);
        assert_eq!(config.yolo.input_size, 640);
    }
}
