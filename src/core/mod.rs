pub mod context;
pub mod export;
pub mod fonts;
pub mod hierarchy;
pub mod loader;
pub mod palette;
pub mod prepare;
pub mod render;
pub mod renderer;
pub mod scene;
pub mod treemap;
pub mod wordcloud;

pub use crate::domain::model::{
    Cell, FundingRecord, HierarchyNode, PlacedWord, RenderReport, Rotation, WordFrequencyTable,
};
pub use crate::domain::ports::{
    CloudRequest, ConfigProvider, LayoutEngine, Storage, TreemapOptions, WordCloudPacker,
};
pub use crate::utils::error::Result;
