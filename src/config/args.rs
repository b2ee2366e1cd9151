use super::toml_config::RenderConfig;
use crate::utils::error::Result;
use crate::utils::logger::LogFormat;
use crate::utils::validation::{validate_required_field, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "funding-treemap")]
#[command(about = "Render a department funding treemap with per-department word clouds")]
pub struct CliConfig {
    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    pub config: Option<String>,

    /// Funding table (CSV with department,funding columns), path or http(s) URL
    #[arg(long)]
    pub funding: Option<String>,

    /// Word counts per department (JSON), path or http(s) URL
    #[arg(long)]
    pub words: Option<String>,

    #[arg(long)]
    pub output_path: Option<String>,

    #[arg(long)]
    pub width: Option<f64>,

    #[arg(long)]
    pub height: Option<f64>,

    /// Band left of and above the treemap holding the title and description
    #[arg(long)]
    pub gutter: Option<f64>,

    /// Seed for word rotation and placement
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub font_family: Option<String>,

    /// Extra font file or directory to load (repeatable)
    #[arg(long = "font-dir")]
    pub font_dirs: Vec<String>,

    /// Download Treemap as PNG
    #[arg(long)]
    pub export: bool,

    /// Also write the rendered scene as treemap.svg
    #[arg(long)]
    pub save_svg: bool,

    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 合併 TOML 檔案與命令列參數，命令列優先
    pub fn resolve(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                RenderConfig::from_file(path)?
            }
            None => {
                validate_required_field("--funding", &self.funding)?;
                validate_required_field("--words", &self.words)?;
                RenderConfig::default()
            }
        };

        if let Some(funding) = &self.funding {
            config.source.funding = funding.clone();
        }
        if let Some(words) = &self.words {
            config.source.words = words.clone();
        }
        if let Some(output_path) = &self.output_path {
            config.output.path = output_path.clone();
        }
        if let Some(width) = self.width {
            config.canvas.width = width;
        }
        if let Some(height) = self.height {
            config.canvas.height = height;
        }
        if let Some(gutter) = self.gutter {
            config.canvas.gutter = gutter;
        }
        if let Some(seed) = self.seed {
            config.cloud.seed = seed;
        }
        if let Some(family) = &self.font_family {
            config.export.font_family = family.clone();
        }
        config.export.font_dirs.extend(self.font_dirs.iter().cloned());
        config.output.save_svg |= self.save_svg;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::RenderError;

    fn base_cli() -> CliConfig {
        CliConfig::parse_from(["funding-treemap"])
    }

    #[test]
    fn test_sources_required_without_config_file() {
        let cli = base_cli();
        assert!(matches!(
            cli.resolve(),
            Err(RenderError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = CliConfig::parse_from([
            "funding-treemap",
            "--funding",
            "data/funding.csv",
            "--words",
            "data/words.json",
            "--width",
            "900",
            "--height",
            "1200",
            "--gutter",
            "0",
            "--seed",
            "11",
            "--font-dir",
            "fonts",
            "--export",
        ]);

        let config = cli.resolve().unwrap();
        assert!(cli.export);
        assert_eq!(config.source.funding, "data/funding.csv");
        assert_eq!(config.canvas.scene_width(), 900.0);
        assert_eq!(config.canvas.scene_height(), 1200.0);
        assert_eq!(config.cloud.seed, 11);
        assert_eq!(config.export.font_dirs, vec!["fonts".to_string()]);
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let cli = CliConfig::parse_from([
            "funding-treemap",
            "--funding",
            "funding.txt",
            "--words",
            "words.json",
        ]);
        assert!(matches!(
            cli.resolve(),
            Err(RenderError::InvalidConfigValueError { .. })
        ));
    }
}
