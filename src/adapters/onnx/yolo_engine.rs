use anyhow::{anyhow, Result};
use image::imageops::FilterType;
use ndarray::{s, Array4, ArrayView2, ArrayViewD, Axis, Ix2, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Tensor;
use std::fs;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::application::ports::DetectorPort;
use crate::domain::{
    detection::{non_max_suppression, Detection, DetectionSet},
    errors::{DomainError, DomainResult},
    model::YoloParams,
    pixels::PixelArray,
};

/// Sesión ONNX de un detector YOLOv8 exportado. Se construye una vez al arrancar
/// y se comparte; `Session::run` necesita acceso exclusivo, de ahí el Mutex.
pub struct OnnxYoloEngine {
    session: Mutex<Session>,
    params: YoloParams,
    class_names: Vec<String>,
}

impl OnnxYoloEngine {
    pub fn load(path: &str, intra_threads: usize, params: YoloParams, class_names: Vec<String>) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(intra_threads)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let model_bytes = fs::read(path)?;
        let session = builder.commit_from_memory(&model_bytes)?;
        info!("Sesión ONNX lista ({} bytes, {} hilos)", model_bytes.len(), intra_threads);

        Ok(Self { session: Mutex::new(session), params, class_names })
    }

    pub fn infer(&self, image: &PixelArray) -> Result<Vec<Detection>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(anyhow!("imagen sin píxeles"));
        }

        let imgsz = self.params.input_size as usize;
        let (input, letterbox) = preprocess(image, &self.params);
        let input_shape = [1usize, 3, imgsz, imgsz];
        let input_tensor = Tensor::from_array((input_shape, input.into_raw_vec_and_offset().0.into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("sesión ONNX envenenada"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        if dims.len() != 3 || dims[1] < 5 {
            return Err(anyhow!("salida inesperada del modelo: {:?}", dims));
        }
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;
        debug!("Salida YOLO {:?}, letterbox {:?}", dims, letterbox);

        Ok(decode_predictions(view, &letterbox, &self.params, &self.class_names))
    }
}

impl DetectorPort for OnnxYoloEngine {
    fn detect(&self, image: &PixelArray) -> DomainResult<DetectionSet> {
        self.infer(image)
            .map(DetectionSet::new)
            .map_err(|e| DomainError::Inference(e.to_string()))
    }
}

/// Gris con el que se rellena el lienzo cuadrado.
pub const LETTERBOX_FILL: u8 = 114;

/// Geometría del letterbox: escala única y relleno aplicados a la imagen original.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub ratio: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub orig_w: u32,
    pub orig_h: u32,
    pub new_w: u32,
    pub new_h: u32,
}

impl Letterbox {
    /// Escala conservando la proporción para que quepa en `input_size`² y centra.
    pub fn fit(orig_w: u32, orig_h: u32, input_size: u32) -> Self {
        let ratio = (input_size as f32 / orig_w as f32).min(input_size as f32 / orig_h as f32);
        let new_w = ((orig_w as f32 * ratio).round() as u32).clamp(1, input_size);
        let new_h = ((orig_h as f32 * ratio).round() as u32).clamp(1, input_size);
        let pad_x = (((input_size - new_w) as f32 / 2.0) - 0.1).round().max(0.0) as u32;
        let pad_y = (((input_size - new_h) as f32 / 2.0) - 0.1).round().max(0.0) as u32;
        Self { ratio, pad_x, pad_y, orig_w, orig_h, new_w, new_h }
    }

    /// Lleva un punto del espacio de entrada del modelo al de la imagen original.
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let ox = (x - self.pad_x as f32) / self.ratio;
        let oy = (y - self.pad_y as f32) / self.ratio;
        (ox.clamp(0.0, self.orig_w as f32), oy.clamp(0.0, self.orig_h as f32))
    }
}

/// Letterbox a `imgsz`² (relleno gris 114) y normalización a 0..1 en NCHW.
/// Si el `PixelArray` no viene en el orden que espera el modelo, se reordena aquí.
pub fn preprocess(image: &PixelArray, params: &YoloParams) -> (Array4<f32>, Letterbox) {
    let imgsz = params.input_size as usize;
    let letterbox = Letterbox::fit(image.width(), image.height(), params.input_size);

    let resized = if (letterbox.new_w, letterbox.new_h) == (image.width(), image.height()) {
        image.pixels.clone()
    } else {
        image::imageops::resize(&image.pixels, letterbox.new_w, letterbox.new_h, FilterType::Triangle)
    };
    let swap = image.order != params.channel_order;

    let mut input = Array4::<f32>::from_elem((1, 3, imgsz, imgsz), LETTERBOX_FILL as f32 / 255.0);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (cx, cy) = ((x + letterbox.pad_x) as usize, (y + letterbox.pad_y) as usize);
        let [a, g, b] = pixel.0;
        let (c0, c2) = if swap { (b, a) } else { (a, b) };
        input[[0, 0, cy, cx]] = c0 as f32 / 255.0;
        input[[0, 1, cy, cx]] = g as f32 / 255.0;
        input[[0, 2, cy, cx]] = c2 as f32 / 255.0;
    }
    (input, letterbox)
}

/// Decodifica la salida `[4 + clases, candidatos]` (cx, cy, w, h, puntuaciones)
/// a cajas en coordenadas de la imagen original, ya filtradas y suprimidas.
pub fn decode_predictions(
    view: ArrayView2<f32>,
    letterbox: &Letterbox,
    params: &YoloParams,
    class_names: &[String],
) -> Vec<Detection> {
    let mut candidates = Vec::new();
    for i in 0..view.shape()[1] {
        let scores = view.slice(s![4.., i]);
        let Some((class_id, &max_score)) = scores
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };

        if max_score > params.conf_threshold {
            let cx = view[[0, i]];
            let cy = view[[1, i]];
            let w = view[[2, i]];
            let h = view[[3, i]];
            let (x1, y1) = letterbox.to_original(cx - w / 2.0, cy - h / 2.0);
            let (x2, y2) = letterbox.to_original(cx + w / 2.0, cy + h / 2.0);

            candidates.push(Detection {
                x1,
                y1,
                x2,
                y2,
                score: max_score,
                class_id,
                label: class_names
                    .get(class_id)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{class_id}")),
            });
        }
    }

    non_max_suppression(candidates, params.iou_threshold, params.max_detections)
}
