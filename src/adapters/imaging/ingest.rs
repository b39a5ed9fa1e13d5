use image::{ImageFormat, Rgb, RgbImage};

use crate::application::ports::ImageIngestPort;
use crate::domain::{
    errors::{DomainError, DomainResult},
    model::ChannelOrder,
    pixels::{IngestedImage, PixelArray},
};

/// Decodifica subidas JPEG/PNG a RGB y prepara la entrada del detector.
pub struct ImageIngestor;

impl ImageIngestor {
    pub fn new() -> Self { Self }
}

impl ImageIngestPort for ImageIngestor {
    fn ingest(&self, bytes: &[u8], order: ChannelOrder) -> DomainResult<IngestedImage> {
        if bytes.is_empty() {
            return Err(DomainError::Processing("archivo vacío".into()));
        }

        // El formato se deduce de la cabecera, no del nombre del fichero.
        let format = image::guess_format(bytes)
            .map_err(|_| DomainError::Processing("formato de imagen no reconocido".into()))?;
        if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
            return Err(DomainError::Processing(format!(
                "formato no soportado: {:?} (sólo JPEG/PNG)",
                format
            )));
        }

        let rgb = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| DomainError::Processing(e.to_string()))?
            .to_rgb8();

        let input = to_channel_order(&rgb, order);
        Ok(IngestedImage { rgb, input })
    }
}

pub fn to_channel_order(rgb: &RgbImage, order: ChannelOrder) -> PixelArray {
    let pixels = match order {
        ChannelOrder::Rgb => rgb.clone(),
        ChannelOrder::Bgr => {
            let mut bgr = rgb.clone();
            for px in bgr.pixels_mut() {
                let [r, g, b] = px.0;
                *px = Rgb([b, g, r]);
            }
            bgr
        }
    };
    PixelArray { pixels, order }
}
