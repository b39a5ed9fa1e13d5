use base64::{prelude::BASE64_STANDARD, Engine};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::io::Cursor;

use crate::application::{dto::AnnotatedImage, ports::AnnotatorPort};
use crate::domain::{
    detection::DetectionSet,
    errors::{DomainError, DomainResult},
};

fn class_color(class_id: usize) -> Rgb<u8> {
    match class_id % 4 {
        0 => Rgb([220, 38, 38]),  // rojo: mancha marrón
        1 => Rgb([250, 204, 21]),
        2 => Rgb([37, 99, 235]),
        _ => Rgb([217, 70, 239]),
    }
}

/// Dibuja las cajas sobre la imagen RGB original y la codifica en PNG/base64.
pub struct BoxAnnotator {
    pub line_width: u32,
}

impl Default for BoxAnnotator {
    fn default() -> Self {
        Self { line_width: 3 }
    }
}

impl BoxAnnotator {
    pub fn draw(&self, rgb: &RgbImage, detections: &DetectionSet) -> RgbImage {
        let (w, h) = (rgb.width() as i32, rgb.height() as i32);
        let mut im = rgb.clone();

        for d in detections {
            let x_min = (d.x1.min(d.x2).round() as i32).clamp(0, w);
            let y_min = (d.y1.min(d.y2).round() as i32).clamp(0, h);
            let x_max = (d.x1.max(d.x2).round() as i32).clamp(0, w);
            let y_max = (d.y1.max(d.y2).round() as i32).clamp(0, h);
            let rw = (x_max - x_min).max(1) as u32;
            let rh = (y_max - y_min).max(1) as u32;
            let color = class_color(d.class_id);

            draw_hollow_rect_mut(&mut im, Rect::at(x_min, y_min).of_size(rw, rh), color);
            // Grosor: rectángulos concéntricos hacia dentro.
            let max_t = (self.line_width as i32).min(rw as i32 / 2).min(rh as i32 / 2);
            for t in 1..max_t {
                let inner = Rect::at(x_min + t, y_min + t)
                    .of_size(rw.saturating_sub(2 * t as u32).max(1), rh.saturating_sub(2 * t as u32).max(1));
                draw_hollow_rect_mut(&mut im, inner, color);
            }
        }
        im
    }
}

impl AnnotatorPort for BoxAnnotator {
    fn annotate(&self, rgb: &RgbImage, detections: &DetectionSet) -> DomainResult<AnnotatedImage> {
        let annotated = self.draw(rgb, detections);

        let mut png = Cursor::new(Vec::new());
        annotated
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| DomainError::Processing(format!("codificando imagen anotada: {e}")))?;

        Ok(AnnotatedImage {
            mime: "image/png".into(),
            width: annotated.width(),
            height: annotated.height(),
            data_base64: BASE64_STANDARD.encode(png.into_inner()),
        })
    }
}
