use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_id: usize,
    pub label: String,
}

impl Detection {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersección sobre unión entre dos cajas (0 si no se solapan).
    pub fn iou(&self, other: &Detection) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);
        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if inter <= 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter + f32::EPSILON)
    }
}

/// Detecciones de una sola imagen, ordenadas de mayor a menor confianza.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionSet(Vec<Detection>);

impl DetectionSet {
    pub fn new(mut detections: Vec<Detection>) -> Self {
        detections.sort_by(|a, b| b.score.total_cmp(&a.score));
        Self(detections)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.0.iter()
    }

    /// Media aritmética de las confianzas expresada en porcentaje; 0 si no hay detecciones.
    pub fn average_confidence_pct(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.0.iter().map(|d| d.score as f64).sum();
        sum / self.0.len() as f64 * 100.0
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Supresión de no-máximos por clase. Devuelve como mucho `max_det` cajas,
/// de mayor a menor confianza.
pub fn non_max_suppression(
    mut candidates: Vec<Detection>,
    iou_threshold: f32,
    max_det: usize,
) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Detection> = Vec::new();

    'outer: for det in candidates {
        if kept.len() >= max_det {
            break;
        }
        for k in &kept {
            if k.class_id == det.class_id && k.iou(&det) > iou_threshold {
                continue 'outer;
            }
        }
        kept.push(det);
    }
    kept
}

#[cfg(test)]
pub(crate) fn spot(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Detection {
    Detection { x1, y1, x2, y2, score, class_id: 0, label: "brown_spot".into() }
}
