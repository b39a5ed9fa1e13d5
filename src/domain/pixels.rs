use image::RgbImage;

use super::model::ChannelOrder;

/// Píxeles decodificados (3 canales u8) en el orden que indica `order`.
#[derive(Debug, Clone)]
pub struct PixelArray {
    pub pixels: RgbImage,
    pub order: ChannelOrder,
}

impl PixelArray {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Resultado de ingerir una subida: la imagen RGB original (para anotar)
/// y la entrada del detector ya en su orden de canales.
#[derive(Debug, Clone)]
pub struct IngestedImage {
    pub rgb: RgbImage,
    pub input: PixelArray,
}
