use crate::core::ConfigProvider;
use crate::utils::error::{RenderError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_location, validate_non_empty_string, validate_path,
    validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub canvas: CanvasSettings,
    pub style: StyleSettings,
    pub cloud: CloudSettings,
    pub export: ExportSettings,
    pub text: TextSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub funding: String,
    pub words: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            funding: "../departments_funding.csv".to_string(),
            words: "../word_counts_by_department.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub save_svg: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
            save_svg: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tiling {
    #[default]
    Squarify,
    Slice,
    Dice,
    SliceDice,
}

/// Treemap body size plus the gutter band that holds the title block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    pub width: f64,
    pub height: f64,
    pub gutter: f64,
    pub padding_outer: f64,
    pub padding_inner: f64,
    pub tiling: Tiling,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 900.0,
            gutter: 220.0,
            padding_outer: 5.0,
            padding_inner: 0.0,
            tiling: Tiling::Squarify,
        }
    }
}

impl CanvasSettings {
    pub fn scene_width(&self) -> f64 {
        self.width + self.gutter
    }

    pub fn scene_height(&self) -> f64 {
        self.height + self.gutter
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSettings {
    pub stroke: String,
    pub stroke_width: f64,
    pub fill: String,
    pub background: Option<String>,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            stroke: "black".to_string(),
            stroke_width: 5.0,
            fill: "black".to_string(),
            background: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSettings {
    pub enabled: bool,
    pub padding: f64,
    pub font_exponent: f64,
    pub font_factor: f64,
    pub vertical_probability: f64,
    pub seed: u64,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            padding: 3.0,
            font_exponent: 0.6,
            font_factor: 6.0,
            vertical_probability: 0.5,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub font_family: String,
    pub font_weight: u16,
    pub filename: String,
    pub font_dirs: Vec<String>,
    pub system_fonts: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            font_family: "DM Sans".to_string(),
            font_weight: 300,
            filename: "treemap.png".to_string(),
            font_dirs: Vec::new(),
            system_fonts: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    pub title: String,
    pub paragraphs: Vec<String>,
    pub title_size: f64,
    pub body_size: f64,
    pub color: String,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            title: "Federal Research Funding by Department".to_string(),
            paragraphs: vec![
                "Each block is one department, sized by the total funding it reported."
                    .to_string(),
                "The words inside a block are the most frequent terms in that department's \
                 funded projects, sized by how often they appear."
                    .to_string(),
            ],
            title_size: 28.0,
            body_size: 13.0,
            color: "#222222".to_string(),
        }
    }
}

impl RenderConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RenderError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${DATA_ROOT})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RenderError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_location("source.funding", &self.source.funding, &["csv"])?;
        validate_location("source.words", &self.source.words, &["json"])?;
        validate_path("output.path", &self.output.path)?;

        validate_range("canvas.width", self.canvas.width, 1.0, 20_000.0)?;
        validate_range("canvas.height", self.canvas.height, 1.0, 20_000.0)?;
        validate_range("canvas.gutter", self.canvas.gutter, 0.0, 5_000.0)?;
        let max_padding = self.canvas.width.min(self.canvas.height) / 2.0;
        validate_range("canvas.padding_outer", self.canvas.padding_outer, 0.0, max_padding)?;
        validate_range("canvas.padding_inner", self.canvas.padding_inner, 0.0, max_padding)?;
        validate_range("style.stroke_width", self.style.stroke_width, 0.0, 100.0)?;

        validate_range("cloud.padding", self.cloud.padding, 0.0, 100.0)?;
        validate_range(
            "cloud.vertical_probability",
            self.cloud.vertical_probability,
            0.0,
            1.0,
        )?;
        validate_range("cloud.font_factor", self.cloud.font_factor, 0.0, 1_000.0)?;

        validate_non_empty_string("export.font_family", &self.export.font_family)?;
        validate_range("export.font_weight", self.export.font_weight, 1, 1000)?;
        validate_non_empty_string("export.filename", &self.export.filename)?;
        validate_file_extensions("export.filename", &[self.export.filename.clone()], &["png"])?;

        Ok(())
    }
}

impl ConfigProvider for RenderConfig {
    fn funding_source(&self) -> &str {
        &self.source.funding
    }

    fn words_source(&self) -> &str {
        &self.source.words
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn canvas(&self) -> &CanvasSettings {
        &self.canvas
    }

    fn style(&self) -> &StyleSettings {
        &self.style
    }

    fn cloud(&self) -> &CloudSettings {
        &self.cloud
    }

    fn export(&self) -> &ExportSettings {
        &self.export
    }

    fn text(&self) -> &TextSettings {
        &self.text
    }

    fn save_svg(&self) -> bool {
        self.output.save_svg
    }
}

impl Validate for RenderConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
