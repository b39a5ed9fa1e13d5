use async_trait::async_trait;
use image::RgbImage;

use crate::application::dto::AnnotatedImage;
use crate::domain::{
    detection::DetectionSet,
    errors::DomainResult,
    model::{ChannelOrder, ModelId},
    pixels::{IngestedImage, PixelArray},
};

/// Detector de manchas. La inferencia es síncrona; el llamador decide en qué hilo corre.
pub trait DetectorPort: Send + Sync {
    fn detect(&self, image: &PixelArray) -> DomainResult<DetectionSet>;
}

pub trait ImageIngestPort: Send + Sync {
    fn ingest(&self, bytes: &[u8], order: ChannelOrder) -> DomainResult<IngestedImage>;
}

pub trait AnnotatorPort: Send + Sync {
    fn annotate(&self, rgb: &RgbImage, detections: &DetectionSet) -> DomainResult<AnnotatedImage>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}
