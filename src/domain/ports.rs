use crate::config::toml_config::{
    CanvasSettings, CloudSettings, ExportSettings, StyleSettings, TextSettings,
};
use crate::domain::model::{Cell, HierarchyNode, PlacedWord, Rotation};
use crate::utils::error::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Location a written file ends up at, for reporting.
    fn resolve(&self, path: &str) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn funding_source(&self) -> &str;
    fn words_source(&self) -> &str;
    fn output_path(&self) -> &str;
    fn canvas(&self) -> &CanvasSettings;
    fn style(&self) -> &StyleSettings;
    fn cloud(&self) -> &CloudSettings;
    fn export(&self) -> &ExportSettings;
    fn text(&self) -> &TextSettings;
    fn save_svg(&self) -> bool;
}

/// Partitions the canvas into one cell per leaf.
pub trait LayoutEngine: Send + Sync {
    fn name(&self) -> &'static str;
    fn layout(&self, root: &HierarchyNode, options: &TreemapOptions) -> Result<Vec<Cell>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreemapOptions {
    pub width: f64,
    pub height: f64,
    pub padding_outer: f64,
    pub padding_inner: f64,
}

/// `size(count) = count^exponent * factor`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizeScale {
    pub exponent: f64,
    pub factor: f64,
}

impl FontSizeScale {
    pub fn size(&self, count: u64) -> f64 {
        (count as f64).powf(self.exponent) * self.factor
    }
}

impl Default for FontSizeScale {
    fn default() -> Self {
        Self {
            exponent: 0.6,
            factor: 6.0,
        }
    }
}

/// Picks 0° or 90° per word from the injected generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationSelector {
    pub vertical_probability: f64,
}

impl RotationSelector {
    pub fn choose(&self, rng: &mut StdRng) -> Rotation {
        if rng.gen_bool(self.vertical_probability.clamp(0.0, 1.0)) {
            Rotation::Vertical
        } else {
            Rotation::Horizontal
        }
    }
}

impl Default for RotationSelector {
    fn default() -> Self {
        Self {
            vertical_probability: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CloudRequest {
    pub department: String,
    pub words: Vec<(String, u64)>,
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub font_size: FontSizeScale,
    pub rotation: RotationSelector,
    pub seed: u64,
}

#[async_trait]
pub trait WordCloudPacker: Send + Sync {
    /// Places as many words as fit; unplaceable words are dropped, not errors.
    async fn pack(&self, request: CloudRequest) -> Result<Vec<PlacedWord>>;
}
