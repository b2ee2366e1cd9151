use crate::core::context::RenderContext;
use crate::core::export::{output_key, PngExporter};
use crate::core::fonts::FontSet;
use crate::core::hierarchy::{build_hierarchy, sort_by_value, sum};
use crate::core::loader::DataLoader;
use crate::core::renderer::SceneRenderer;
use crate::core::treemap::TreemapLayout;
use crate::core::wordcloud::SpiralPacker;
use crate::core::{
    Cell, CloudRequest, ConfigProvider, LayoutEngine, PlacedWord, RenderReport, Storage,
    TreemapOptions, WordCloudPacker, WordFrequencyTable,
};
use crate::domain::ports::{FontSizeScale, RotationSelector};
use crate::utils::error::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;

pub const SVG_FILENAME: &str = "treemap.svg";

/// Runs load → hierarchy → layout → scene → word clouds, and exports on demand.
pub struct RenderEngine<S: Storage + Clone, C: ConfigProvider> {
    storage: S,
    config: C,
    fonts: FontSet,
    layout: Box<dyn LayoutEngine>,
    packer: Option<Arc<dyn WordCloudPacker>>,
    exporter: PngExporter<S>,
}

impl<S: Storage + Clone, C: ConfigProvider> RenderEngine<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let export = config.export();
        let fonts = FontSet::load(export.system_fonts, &export.font_dirs);
        Self::with_fonts(storage, config, fonts)
    }

    pub fn with_fonts(storage: S, config: C, fonts: FontSet) -> Self {
        let exporter = PngExporter::new(
            storage.clone(),
            fonts.clone(),
            config.export().clone(),
            config.output_path(),
        );
        Self {
            layout: Box::new(TreemapLayout::new(config.canvas().tiling)),
            storage,
            config,
            fonts,
            packer: None,
            exporter,
        }
    }

    pub fn with_layout_engine(mut self, layout: Box<dyn LayoutEngine>) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_packer(mut self, packer: Arc<dyn WordCloudPacker>) -> Self {
        self.packer = Some(packer);
        self
    }

    /// Renders the scene and, when `export` is set, writes the PNG.
    pub async fn run(&self, export: bool) -> Result<RenderReport> {
        let (ctx, mut report) = self.render().await?;
        if export {
            report.png_path = Some(self.export(&ctx).await?);
        }
        Ok(report)
    }

    pub async fn render(&self) -> Result<(RenderContext, RenderReport)> {
        tracing::info!("🚀 Starting treemap render");

        let loader = DataLoader::new(self.storage.clone());
        let data = loader
            .load(self.config.funding_source(), self.config.words_source())
            .await?;

        let mut root = build_hierarchy(&data.records);
        let total_funding = sum(&mut root);
        sort_by_value(&mut root);
        tracing::info!(
            "🌳 Hierarchy built: {} departments, total funding {}",
            root.children.len(),
            total_funding
        );

        let canvas = self.config.canvas();
        let options = TreemapOptions {
            width: canvas.width,
            height: canvas.height,
            padding_outer: canvas.padding_outer,
            padding_inner: canvas.padding_inner,
        };
        let cells = self.layout.layout(&root, &options)?;
        tracing::info!("📐 {} layout produced {} cells", self.layout.name(), cells.len());

        let cloud = self.config.cloud();
        let mut ctx = RenderContext::new(canvas.scene_width(), canvas.scene_height(), cloud.seed);
        let family = &self.config.export().font_family;
        let renderer = SceneRenderer::new(
            canvas.clone(),
            self.config.style().clone(),
            self.config.text().clone(),
            family.clone(),
            self.fonts.measure_for(family),
        );
        renderer.render_cells(&mut ctx, &cells);
        renderer.render_header(&mut ctx);

        let (clouds_drawn, words_placed) = if cloud.enabled {
            self.draw_clouds(&mut ctx, &renderer, &cells, &data.words).await
        } else {
            tracing::info!("Word clouds disabled");
            (0, 0)
        };

        let svg_path = if self.config.save_svg() {
            let path = output_key(self.config.output_path(), SVG_FILENAME);
            self.storage
                .write_file(&path, ctx.scene().to_svg().as_bytes())
                .await?;
            let resolved = self.storage.resolve(&path);
            tracing::info!("💾 Saved {}", resolved);
            Some(resolved)
        } else {
            None
        };

        let report = RenderReport {
            departments: root.children.len(),
            total_funding,
            cells: cells.len(),
            clouds_drawn,
            words_placed,
            svg_path,
            png_path: None,
            finished_at: chrono::Utc::now(),
        };
        tracing::info!(
            "✅ Render finished: {} cells, {} clouds, {} words",
            report.cells,
            report.clouds_drawn,
            report.words_placed
        );
        Ok((ctx, report))
    }

    /// Packs every cell concurrently; a failing cell is logged and left empty.
    async fn draw_clouds(
        &self,
        ctx: &mut RenderContext,
        renderer: &SceneRenderer,
        cells: &[Cell],
        table: &WordFrequencyTable,
    ) -> (usize, usize) {
        let settings = self.config.cloud();
        let packer = self.packer.clone().unwrap_or_else(|| {
            Arc::new(SpiralPacker::new(
                self.fonts.measure_for(&self.config.export().font_family),
            ))
        });

        let mut tasks = JoinSet::new();
        for cell in cells {
            let Some(counts) = table.words_for(&cell.department) else {
                tracing::debug!("No word table for {}, cloud skipped", cell.department);
                continue;
            };
            let request = CloudRequest {
                department: cell.department.clone(),
                words: counts.iter().map(|(w, c)| (w.clone(), *c)).collect(),
                width: cell.width(),
                height: cell.height(),
                padding: settings.padding,
                font_size: FontSizeScale {
                    exponent: settings.font_exponent,
                    factor: settings.font_factor,
                },
                rotation: RotationSelector {
                    vertical_probability: settings.vertical_probability,
                },
                seed: ctx.cell_seed(cell.index),
            };
            let packer = Arc::clone(&packer);
            let index = cell.index;
            tasks.spawn(async move { (index, packer.pack(request).await) });
        }

        let mut results: BTreeMap<usize, Vec<PlacedWord>> = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(words))) => {
                    results.insert(index, words);
                }
                Ok((index, Err(e))) => {
                    tracing::warn!("⚠️ Word cloud for cell {} failed: {}", index, e);
                }
                Err(e) => {
                    tracing::warn!("⚠️ Word cloud task aborted: {}", e);
                }
            }
        }

        let mut clouds = 0;
        let mut words_placed = 0;
        for cell in cells {
            let Some(words) = results.remove(&cell.index) else {
                continue;
            };
            tracing::debug!("☁️ {}: placed {} words", cell.department, words.len());
            if renderer.draw_words(ctx, cell, &words) {
                clouds += 1;
                words_placed += words.len();
            }
        }
        (clouds, words_placed)
    }

    /// Writes the PNG for a rendered context. Overlapping calls run one at a time.
    pub async fn export(&self, ctx: &RenderContext) -> Result<String> {
        self.exporter.download(ctx).await
    }
}
