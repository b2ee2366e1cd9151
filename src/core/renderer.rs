use crate::config::toml_config::{CanvasSettings, StyleSettings, TextSettings};
use crate::core::context::RenderContext;
use crate::core::fonts::TextMeasure;
use crate::core::scene::{SceneNode, Transform};
use crate::core::{Cell, PlacedWord};
use std::sync::Arc;

/// 標題區與畫布邊緣的距離
const HEADER_INSET: f64 = 12.0;
const LINE_HEIGHT: f64 = 1.4;

/// Draws cells, the header text and word clouds into a [`RenderContext`].
pub struct SceneRenderer {
    canvas: CanvasSettings,
    style: StyleSettings,
    text: TextSettings,
    font_family: String,
    measure: Arc<dyn TextMeasure>,
}

impl SceneRenderer {
    pub fn new(
        canvas: CanvasSettings,
        style: StyleSettings,
        text: TextSettings,
        font_family: impl Into<String>,
        measure: Arc<dyn TextMeasure>,
    ) -> Self {
        Self {
            canvas,
            style,
            text,
            font_family: font_family.into(),
            measure,
        }
    }

    /// Treemap body offset inside the scene.
    pub fn body_offset(&self) -> (f64, f64) {
        (self.canvas.gutter / 2.0, self.canvas.gutter)
    }

    pub fn render_cells(&self, ctx: &mut RenderContext, cells: &[Cell]) {
        let scene = ctx.scene_mut();
        scene.push(SceneNode::Style(format!(
            "text {{ font-family: \"{}\", sans-serif; }}",
            self.font_family
        )));
        if let Some(background) = &self.style.background {
            let (width, height) = (scene.width, scene.height);
            scene.push(SceneNode::Rect {
                class: Some("background".to_string()),
                x: 0.0,
                y: 0.0,
                width,
                height,
                fill: background.clone(),
                stroke: None,
                stroke_width: 0.0,
            });
        }

        let (dx, dy) = self.body_offset();
        for cell in cells {
            tracing::info!("🎨 {} → {}", cell.department, cell.color);

            let offset = Transform::Translate(dx + cell.x0, dy + cell.y0);
            let mut group = SceneNode::group("cell", Some(offset));
            if let SceneNode::Group { children, .. } = &mut group {
                children.push(SceneNode::Rect {
                    class: Some("treemap-block".to_string()),
                    x: 0.0,
                    y: 0.0,
                    width: cell.width(),
                    height: cell.height(),
                    fill: self.style.fill.clone(),
                    stroke: Some(self.style.stroke.clone()),
                    stroke_width: self.style.stroke_width,
                });
            }
            let id = ctx.scene_mut().push(group);
            ctx.register_cell(cell.index, id);
        }
        tracing::debug!("Rendered {} cells", cells.len());
    }

    /// Title and description in the band above the treemap body.
    pub fn render_header(&self, ctx: &mut RenderContext) {
        let band = self.canvas.gutter;
        if band <= 0.0 {
            tracing::debug!("No gutter, header skipped");
            return;
        }

        let (left, _) = self.body_offset();
        let max_width = (ctx.scene().width - 2.0 * left).max(0.0);
        let limit = band - HEADER_INSET;
        let mut group = SceneNode::group("header", None);
        let SceneNode::Group { children, .. } = &mut group else {
            return;
        };

        let mut baseline = HEADER_INSET;
        let mut emit = |content: String, size: f64, class: &str, baseline: &mut f64| -> bool {
            let extent = self.measure.measure(&content, size);
            let next = *baseline + extent.ascent;
            if next + extent.descent > limit {
                return false;
            }
            children.push(SceneNode::Text {
                class: Some(class.to_string()),
                x: left,
                y: next,
                transform: None,
                anchor: None,
                fill: self.text.color.clone(),
                font_size: size,
                content,
            });
            *baseline = next + extent.descent + size * (LINE_HEIGHT - 1.0);
            true
        };

        let mut fits = true;
        let measure = self.measure.as_ref();
        for line in wrap_text(measure, &self.text.title, self.text.title_size, max_width) {
            fits = emit(line, self.text.title_size, "treemap-title", &mut baseline);
            if !fits {
                break;
            }
        }
        'paragraphs: for paragraph in &self.text.paragraphs {
            if !fits {
                break;
            }
            baseline += self.text.body_size * 0.5;
            for line in wrap_text(measure, paragraph, self.text.body_size, max_width) {
                if !emit(line, self.text.body_size, "treemap-label", &mut baseline) {
                    tracing::debug!("Header truncated to fit {}px band", band);
                    break 'paragraphs;
                }
            }
        }

        ctx.scene_mut().push(group);
    }

    /// Appends one cell's words, centered on the cell, in the cell's color.
    pub fn draw_words(&self, ctx: &mut RenderContext, cell: &Cell, words: &[PlacedWord]) -> bool {
        let Some(id) = ctx.cell_group(cell.index) else {
            tracing::warn!("⚠️ No group for cell {} ({})", cell.index, cell.department);
            return false;
        };

        let texts = words
            .iter()
            .map(|word| SceneNode::Text {
                class: Some("treemap-text".to_string()),
                x: 0.0,
                y: 0.0,
                transform: Some(Transform::TranslateRotate(
                    word.x,
                    word.y,
                    word.rotation.degrees(),
                )),
                anchor: Some("middle"),
                fill: cell.color.clone(),
                font_size: word.size_px,
                content: word.text.clone(),
            })
            .collect();
        let cloud = SceneNode::Group {
            class: Some("cloud".to_string()),
            transform: Some(Transform::Translate(cell.width() / 2.0, cell.height() / 2.0)),
            children: texts,
        };
        ctx.scene_mut().append_child(id, &[], cloud)
    }
}

/// Greedy word wrap; a single word wider than `max_width` gets its own line.
pub fn wrap_text(
    measure: &dyn TextMeasure,
    text: &str,
    size_px: f64,
    max_width: f64,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if !current.is_empty() && measure.measure(&candidate, size_px).width > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
