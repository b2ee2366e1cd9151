use crate::config::toml_config::ExportSettings;
use crate::core::context::RenderContext;
use crate::core::fonts::{FontFace, FontSet};
use crate::core::scene::SceneNode;
use crate::core::Storage;
use crate::utils::error::{RenderError, Result};
use resvg::usvg;
use std::sync::Arc;
use tokio::sync::Mutex;

const SVG_MIME: &str = "image/svg+xml;charset=utf-8";

/// Rasterizes a render context's scene to PNG and hands it to storage.
pub struct PngExporter<S: Storage> {
    storage: S,
    fonts: FontSet,
    settings: ExportSettings,
    output_dir: String,
    lock: Mutex<()>,
}

impl<S: Storage> PngExporter<S> {
    pub fn new(
        storage: S,
        fonts: FontSet,
        settings: ExportSettings,
        output_dir: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            fonts,
            settings,
            output_dir: output_dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Storage key the PNG is written under.
    pub fn target_path(&self) -> String {
        output_key(&self.output_dir, &self.settings.filename)
    }

    /// Exports the current scene. Returns where the file was written.
    pub async fn download(&self, ctx: &RenderContext) -> Result<String> {
        // 同時觸發的匯出依序執行
        let _guard = self.lock.lock().await;

        let family = self.settings.font_family.as_str();
        let Some(face) = self.fonts.find_face(family) else {
            let error = RenderError::FontNotFound {
                family: family.to_string(),
            };
            tracing::error!("❌ {}", error);
            return Err(error);
        };
        tracing::debug!("Embedding font \"{}\" ({} bytes)", face.family, face.data.len());

        let mut scene = ctx.scene().clone();
        scene.insert_first(SceneNode::Style(self.export_css(&face)));
        let (width, height) = (scene.width, scene.height);
        let svg = scene.to_svg();

        let handle = ctx.blobs().create_object_url(svg.into_bytes(), SVG_MIME);
        let svg_bytes = handle.data().ok_or_else(|| RenderError::ExportError {
            message: format!("{} was revoked before decoding", handle.as_str()),
        })?;

        let fontdb = self.fonts.database();
        let png = tokio::task::spawn_blocking(move || rasterize(&svg_bytes, fontdb, width, height))
            .await
            .map_err(|e| RenderError::ExportError {
                message: format!("rasterize task failed: {}", e),
            })??;
        drop(handle);

        let path = self.target_path();
        self.storage.write_file(&path, &png).await?;
        let resolved = self.storage.resolve(&path);
        tracing::info!("💾 Saved {} ({}x{}, {} bytes)", resolved, width, height, png.len());
        Ok(resolved)
    }

    fn export_css(&self, face: &FontFace) -> String {
        format!(
            "{}\ntext, .treemap-title, .treemap-label, .treemap-text {{ font-family: \"{}\", serif; font-weight: {}; }}",
            face.font_face_css(),
            self.settings.font_family,
            self.settings.font_weight
        )
    }
}

/// `dir/name`, or just `name` when `dir` is empty.
pub fn output_key(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

fn rasterize(
    svg: &[u8],
    fontdb: Arc<usvg::fontdb::Database>,
    width: f64,
    height: f64,
) -> Result<Vec<u8>> {
    let mut options = usvg::Options::default();
    options.fontdb = fontdb;

    let tree = usvg::Tree::from_data(svg, &options).map_err(|e| RenderError::ExportError {
        message: format!("could not decode SVG: {}", e),
    })?;

    let (w, h) = (width.ceil() as u32, height.ceil() as u32);
    let mut pixmap = tiny_skia::Pixmap::new(w, h).ok_or_else(|| RenderError::ExportError {
        message: format!("could not allocate a {}x{} canvas", w, h),
    })?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    pixmap.encode_png().map_err(|e| RenderError::ExportError {
        message: format!("could not encode PNG: {}", e),
    })
}
