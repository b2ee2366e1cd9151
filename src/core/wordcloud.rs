use crate::core::fonts::TextMeasure;
use crate::core::{CloudRequest, PlacedWord, Rotation, WordCloudPacker};
use crate::utils::error::{RenderError, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Spiral steps tried per word before it is dropped.
const MAX_SPIRAL_STEPS: u32 = 20_000;

/// Axis-aligned box relative to a word's anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    fn at(self, x: f64, y: f64) -> Bounds {
        Bounds {
            min_x: self.min_x + x,
            min_y: self.min_y + y,
            max_x: self.max_x + x,
            max_y: self.max_y + y,
        }
    }

    fn fits_within(&self, other: &Bounds) -> bool {
        self.max_x - self.min_x <= other.max_x - other.min_x
            && self.max_y - self.min_y <= other.max_y - other.min_y
    }

    fn contains(&self, other: &Bounds) -> bool {
        other.min_x >= self.min_x
            && other.min_y >= self.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }

    fn intersects(&self, other: &Bounds) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }
}

/// Archimedean-spiral word packer.
///
/// Words are placed largest first. Each starts from a jittered point near the
/// cell center and walks outward along the spiral until its padded bounding
/// box fits inside the cell without touching an already placed word. A word
/// whose box is larger than the cell, or that finds no room within
/// `MAX_SPIRAL_STEPS`, is dropped.
pub struct SpiralPacker {
    measure: Arc<dyn TextMeasure>,
}

impl SpiralPacker {
    pub fn new(measure: Arc<dyn TextMeasure>) -> Self {
        Self { measure }
    }
}

#[async_trait]
impl WordCloudPacker for SpiralPacker {
    async fn pack(&self, request: CloudRequest) -> Result<Vec<PlacedWord>> {
        let measure = Arc::clone(&self.measure);
        let department = request.department.clone();
        tokio::task::spawn_blocking(move || place_words(measure.as_ref(), &request))
            .await
            .map_err(|e| RenderError::WordCloudError {
                department,
                message: format!("packing task failed: {}", e),
            })?
    }
}

pub fn place_words(measure: &dyn TextMeasure, request: &CloudRequest) -> Result<Vec<PlacedWord>> {
    let (width, height) = (request.width, request.height);
    if !(width > 0.0 && height > 0.0) {
        return Err(RenderError::WordCloudError {
            department: request.department.clone(),
            message: format!("cell {}x{} has no area", width, height),
        });
    }

    let mut rng = StdRng::seed_from_u64(request.seed);
    let mut words: Vec<(&str, f64)> = request
        .words
        .iter()
        .filter(|(text, _)| !text.trim().is_empty())
        .map(|(text, count)| (text.as_str(), request.font_size.size(*count)))
        .filter(|(_, size)| size.is_finite() && *size > 0.0)
        .collect();
    words.sort_by(|a, b| b.1.total_cmp(&a.1));

    let cell = Bounds {
        min_x: -width / 2.0,
        min_y: -height / 2.0,
        max_x: width / 2.0,
        max_y: height / 2.0,
    };
    let half_pad = request.padding / 2.0;
    let max_delta = (width * width + height * height).sqrt();
    let eccentricity = width / height;

    let mut placed: Vec<PlacedWord> = Vec::with_capacity(words.len());
    let mut occupied: Vec<Bounds> = Vec::with_capacity(words.len());

    for (text, size) in words {
        let rotation = request.rotation.choose(&mut rng);
        let extent = measure.measure(text, size);
        let half_w = extent.width / 2.0 + half_pad;
        let ascent = extent.ascent + half_pad;
        let descent = extent.descent + half_pad;
        let local = match rotation {
            Rotation::Horizontal => Bounds {
                min_x: -half_w,
                min_y: -ascent,
                max_x: half_w,
                max_y: descent,
            },
            // rotate(90) maps (x, y) to (-y, x)
            Rotation::Vertical => Bounds {
                min_x: -descent,
                min_y: -half_w,
                max_x: ascent,
                max_y: half_w,
            },
        };

        let start_x = (rng.gen::<f64>() - 0.5) * width / 2.0;
        let start_y = (rng.gen::<f64>() - 0.5) * height / 2.0;
        let dt: f64 = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };

        if !local.fits_within(&cell) {
            tracing::trace!("Dropped '{}' in {}: larger than the cell", text, request.department);
            continue;
        }

        let mut t = -dt;
        let mut found = None;
        for _ in 0..MAX_SPIRAL_STEPS {
            t += dt;
            let theta = t * 0.1;
            let dx = eccentricity * theta * theta.cos();
            let dy = theta * theta.sin();
            if dx.abs().min(dy.abs()) >= max_delta {
                break;
            }

            let (x, y) = (start_x + dx, start_y + dy);
            let candidate = local.at(x, y);
            if !cell.contains(&candidate) {
                continue;
            }
            if occupied.iter().any(|other| other.intersects(&candidate)) {
                continue;
            }
            found = Some((x, y, candidate));
            break;
        }

        match found {
            Some((x, y, bounds)) => {
                occupied.push(bounds);
                placed.push(PlacedWord {
                    text: text.to_string(),
                    x,
                    y,
                    rotation,
                    size_px: size,
                });
            }
            None => {
                tracing::trace!("Dropped '{}' in {}: no room", text, request.department);
            }
        }
    }

    Ok(placed)
}
