use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::domain::{
    advisory::AdvisoryTable,
    model::{ChannelOrder, InferenceConfig, ModelId, YoloParams},
};

#[derive(Parser, Debug, Clone)]
#[command(name = "leafspot")]
#[command(about = "Detección de mancha marrón en hojas con YOLO (ONNX) y panel web")]
pub struct Settings {
    /// Ruta al modelo YOLO exportado a ONNX
    #[arg(short, long, env = "LEAFSPOT_MODEL", default_value = "models/best.onnx")]
    pub model: String,

    #[arg(long, env = "LEAFSPOT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "LEAFSPOT_PORT", default_value_t = 8090)]
    pub port: u16,

    /// Carpeta con la página estática
    #[arg(long, env = "LEAFSPOT_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Tabla de consejos en JSON (por defecto la incluida en el binario)
    #[arg(long, env = "LEAFSPOT_ADVISORY")]
    pub advisory: Option<PathBuf>,

    #[arg(long, default_value_t = 640)]
    pub imgsz: u32,

    #[arg(long, default_value_t = 0.25)]
    pub conf: f32,

    #[arg(long, default_value_t = 0.7)]
    pub iou: f32,

    #[arg(long, default_value_t = 300)]
    pub max_det: usize,

    /// El modelo espera los canales en orden BGR
    #[arg(long)]
    pub bgr: bool,

    #[arg(long, default_value_t = 4)]
    pub intra_threads: usize,

    #[arg(long, env = "LEAFSPOT_MAX_UPLOAD_MB", default_value_t = 20)]
    pub max_upload_mb: usize,

    /// Nombres de clase en el orden del modelo, separados por comas
    #[arg(long, value_delimiter = ',', default_value = "brown_spot")]
    pub class_names: Vec<String>,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.imgsz == 0 || self.imgsz % 32 != 0 {
            bail!("--imgsz debe ser un múltiplo positivo de 32 (recibido {})", self.imgsz);
        }
        if !(0.0..=1.0).contains(&self.conf) {
            bail!("--conf fuera de rango 0..1: {}", self.conf);
        }
        if !(0.0..=1.0).contains(&self.iou) {
            bail!("--iou fuera de rango 0..1: {}", self.iou);
        }
        if self.max_det == 0 || self.intra_threads == 0 || self.max_upload_mb == 0 {
            bail!("--max-det, --intra-threads y --max-upload-mb deben ser mayores que 0");
        }
        if self.max_upload_mb.checked_mul(1024 * 1024).is_none() {
            bail!("--max-upload-mb demasiado grande: {}", self.max_upload_mb);
        }
        Ok(())
    }

    pub fn yolo_params(&self) -> YoloParams {
        YoloParams {
            input_size: self.imgsz,
            conf_threshold: self.conf,
            iou_threshold: self.iou,
            max_detections: self.max_det,
            channel_order: if self.bgr { ChannelOrder::Bgr } else { ChannelOrder::Rgb },
        }
    }

    pub fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            model: ModelId { name: "brown-spot-yolo".into(), onnx_path: self.model.clone() },
            params: self.yolo_params(),
            class_names: self.class_names.clone(),
            intra_threads: self.intra_threads,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn load_advisory(&self) -> Result<AdvisoryTable> {
        match &self.advisory {
            None => Ok(AdvisoryTable::builtin()?),
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("leyendo tabla de consejos {}", path.display()))?;
                AdvisoryTable::from_json(&raw)
                    .with_context(|| format!("tabla de consejos inválida {}", path.display()))
            }
        }
    }
}
