//! Loaded fonts and text measurement.
//!
//! [`FontSet`] plays the role of the document's loaded font set: the
//! exporter resolves its font family here, and the word cloud packer measures
//! words with the same face so placements match the rasterized output.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use fontdue::{Font, FontSettings};
use resvg::usvg::fontdb::{self, Database};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f64,
    /// Height above the baseline.
    pub ascent: f64,
    /// Depth below the baseline, positive.
    pub descent: f64,
}

pub trait TextMeasure: Send + Sync {
    fn measure(&self, text: &str, size_px: f64) -> TextExtent;
}

/// Em-based estimate used when the configured face is not available.
#[derive(Debug, Clone, Copy)]
pub struct ApproxMeasure {
    pub advance_em: f64,
    pub ascent_em: f64,
    pub descent_em: f64,
}

impl Default for ApproxMeasure {
    fn default() -> Self {
        Self {
            advance_em: 0.6,
            ascent_em: 0.8,
            descent_em: 0.2,
        }
    }
}

impl TextMeasure for ApproxMeasure {
    fn measure(&self, text: &str, size_px: f64) -> TextExtent {
        let chars = text.chars().filter(|ch| !ch.is_control()).count() as f64;
        TextExtent {
            width: chars * self.advance_em * size_px,
            ascent: self.ascent_em * size_px,
            descent: self.descent_em * size_px,
        }
    }
}

/// Per-glyph advance widths from fontdue.
pub struct FontdueMeasure {
    font: Font,
}

impl FontdueMeasure {
    pub fn from_bytes(data: &[u8], collection_index: u32) -> Option<Self> {
        let settings = FontSettings {
            collection_index,
            ..FontSettings::default()
        };
        match Font::from_bytes(data, settings) {
            Ok(font) => Some(Self { font }),
            Err(e) => {
                tracing::warn!("fontdue could not parse font: {}", e);
                None
            }
        }
    }
}

impl TextMeasure for FontdueMeasure {
    fn measure(&self, text: &str, size_px: f64) -> TextExtent {
        let px = size_px as f32;
        let width: f32 = text
            .chars()
            .filter(|ch| !ch.is_control())
            .map(|ch| self.font.metrics(ch, px).advance_width)
            .sum();
        let (ascent, descent) = self
            .font
            .horizontal_line_metrics(px)
            .map(|m| (m.ascent, -m.descent))
            .unwrap_or((px * 0.8, px * 0.2));
        TextExtent {
            width: f64::from(width),
            ascent: f64::from(ascent),
            descent: f64::from(descent),
        }
    }
}

/// An embeddable face resolved from the font set.
#[derive(Debug, Clone)]
pub struct FontFace {
    pub family: String,
    pub style: &'static str,
    pub weight: u16,
    pub stretch: &'static str,
    pub mime: &'static str,
    pub data: Arc<Vec<u8>>,
    pub index: u32,
}

impl FontFace {
    /// `@font-face` rule with the face inlined as a data URL.
    pub fn font_face_css(&self) -> String {
        format!(
            "@font-face {{\n  font-family: '{}';\n  src: url(data:{};base64,{});\n  font-style: {};\n  font-weight: {};\n  unicode-range: U+0-10FFFF;\n  font-stretch: {};\n}}",
            self.family,
            self.mime,
            STANDARD.encode(self.data.as_slice()),
            self.style,
            self.weight,
            self.stretch,
        )
    }
}

#[derive(Clone)]
pub struct FontSet {
    db: Arc<Database>,
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSet").field("faces", &self.db.len()).finish()
    }
}

impl Default for FontSet {
    fn default() -> Self {
        Self::new(Database::new())
    }
}

impl FontSet {
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    /// System fonts (optional) plus every file or directory in `extra`.
    pub fn load(system_fonts: bool, extra: &[String]) -> Self {
        let mut db = Database::new();
        if system_fonts {
            db.load_system_fonts();
        }
        for location in extra {
            let path = Path::new(location);
            if path.is_dir() {
                db.load_fonts_dir(path);
            } else if let Err(e) = db.load_font_file(path) {
                tracing::warn!("⚠️ Could not load font '{}': {}", location, e);
            }
        }
        tracing::debug!("Font set holds {} faces", db.len());
        Self::new(db)
    }

    pub fn database(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    pub fn families(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .db
            .faces()
            .flat_map(|face| face.families.iter().map(|(name, _)| name.clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// First face whose family name equals `family` exactly, preferring the
    /// regular upright style.
    pub fn find_face(&self, family: &str) -> Option<FontFace> {
        let mut matches: Vec<&fontdb::FaceInfo> = self
            .db
            .faces()
            .filter(|face| face.families.iter().any(|(name, _)| name == family))
            .collect();
        matches.sort_by_key(|face| {
            (
                face.style != fontdb::Style::Normal,
                face.weight.0.abs_diff(fontdb::Weight::NORMAL.0),
            )
        });
        let face = matches.first()?;

        let data = self
            .db
            .with_face_data(face.id, |data, _| data.to_vec())?;

        Some(FontFace {
            family: family.to_string(),
            style: style_name(face.style),
            weight: face.weight.0,
            stretch: stretch_name(face.stretch),
            mime: mime_for(&face.source),
            data: Arc::new(data),
            index: face.index,
        })
    }

    /// Measurement backed by `family`, falling back to an em estimate.
    pub fn measure_for(&self, family: &str) -> Arc<dyn TextMeasure> {
        if let Some(measure) = self
            .find_face(family)
            .and_then(|face| FontdueMeasure::from_bytes(&face.data, face.index))
        {
            return Arc::new(measure);
        }
        tracing::debug!("Measuring text with em estimate; \"{}\" not loaded", family);
        Arc::new(ApproxMeasure::default())
    }
}

fn style_name(style: fontdb::Style) -> &'static str {
    match style {
        fontdb::Style::Normal => "normal",
        fontdb::Style::Italic => "italic",
        fontdb::Style::Oblique => "oblique",
    }
}

fn stretch_name(stretch: fontdb::Stretch) -> &'static str {
    match stretch {
        fontdb::Stretch::UltraCondensed => "ultra-condensed",
        fontdb::Stretch::ExtraCondensed => "extra-condensed",
        fontdb::Stretch::Condensed => "condensed",
        fontdb::Stretch::SemiCondensed => "semi-condensed",
        fontdb::Stretch::Normal => "normal",
        fontdb::Stretch::SemiExpanded => "semi-expanded",
        fontdb::Stretch::Expanded => "expanded",
        fontdb::Stretch::ExtraExpanded => "extra-expanded",
        fontdb::Stretch::UltraExpanded => "ultra-expanded",
    }
}

fn mime_for(source: &fontdb::Source) -> &'static str {
    let extension = match source {
        fontdb::Source::File(path) => path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase),
        _ => None,
    };
    match extension.as_deref() {
        Some("otf") => "font/otf",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttc") | Some("otc") => "font/collection",
        _ => "font/ttf",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_measure_scales_with_size() {
        let measure = ApproxMeasure::default();
        let small = measure.measure("science", 10.0);
        let large = measure.measure("science", 20.0);

        assert!((small.width - 42.0).abs() < 1e-9);
        assert!((large.width - 2.0 * small.width).abs() < 1e-9);
        assert!((small.ascent + small.descent - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_font_set_has_no_faces() {
        let fonts = FontSet::new(Database::new());
        assert!(fonts.is_empty());
        assert!(fonts.families().is_empty());
        assert!(fonts.find_face("DM Sans").is_none());
    }

    #[test]
    fn test_measure_falls_back_without_font() {
        let fonts = FontSet::new(Database::new());
        let measure = fonts.measure_for("DM Sans");
        let extent = measure.measure("data", 10.0);
        assert!((extent.width - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_font_file_is_skipped() {
        let fonts = FontSet::load(false, &["/definitely/not/a/font.ttf".to_string()]);
        assert!(fonts.is_empty());
    }

    #[test]
    fn test_font_face_css_inlines_data() {
        let face = FontFace {
            family: "DM Sans".to_string(),
            style: "normal",
            weight: 300,
            stretch: "normal",
            mime: "font/ttf",
            data: Arc::new(b"abc".to_vec()),
            index: 0,
        };
        let css = face.font_face_css();
        assert!(css.contains("font-family: 'DM Sans';"));
        assert!(css.contains("src: url(data:font/ttf;base64,YWJj);"));
        assert!(css.contains("font-weight: 300;"));
    }
}
