use crate::core::scene::{NodeId, Scene};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Everything one render pass owns: its scene, the cell groups inside it and
/// the temporary resources created while exporting.
#[derive(Debug)]
pub struct RenderContext {
    scene: Scene,
    cell_groups: HashMap<usize, NodeId>,
    blobs: BlobStore,
    seed: u64,
}

impl RenderContext {
    pub fn new(width: f64, height: f64, seed: u64) -> Self {
        Self {
            scene: Scene::new(width, height),
            cell_groups: HashMap::new(),
            blobs: BlobStore::default(),
            seed,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn register_cell(&mut self, cell_index: usize, group: NodeId) {
        self.cell_groups.insert(cell_index, group);
    }

    pub fn cell_group(&self, cell_index: usize) -> Option<NodeId> {
        self.cell_groups.get(&cell_index).copied()
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Seed for one cell's word cloud, independent of packing order.
    pub fn cell_seed(&self, cell_index: usize) -> u64 {
        // splitmix64 混合，避免相鄰格子的亂數序列相關
        let mut z = self
            .seed
            .wrapping_add((cell_index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

#[derive(Debug)]
struct Blob {
    mime: String,
    data: Arc<Vec<u8>>,
}

/// In-memory registry of temporary resources addressed by `blob:` URLs.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    entries: Arc<Mutex<HashMap<String, Blob>>>,
    next_id: Arc<AtomicU64>,
}

impl BlobStore {
    pub fn create_object_url(&self, data: Vec<u8>, mime: &str) -> ObjectUrl {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("blob:funding-treemap/{}", id);
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                url.clone(),
                Blob {
                    mime: mime.to_string(),
                    data: Arc::new(data),
                },
            );
        }
        tracing::debug!("Created object URL {} ({})", url, mime);
        ObjectUrl {
            url,
            store: self.clone(),
        }
    }

    pub fn fetch(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        let entries = self.entries.lock().ok()?;
        entries.get(url).map(|blob| Arc::clone(&blob.data))
    }

    pub fn mime_type(&self, url: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.get(url).map(|blob| blob.mime.clone())
    }

    pub fn revoke(&self, url: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.remove(url).is_some() {
                tracing::debug!("Revoked object URL {}", url);
            }
        }
    }

    /// Number of handles that have not been revoked yet.
    pub fn live_handles(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

/// A `blob:` URL, revoked when dropped.
#[derive(Debug)]
pub struct ObjectUrl {
    url: String,
    store: BlobStore,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn data(&self) -> Option<Arc<Vec<u8>>> {
        self.store.fetch(&self.url)
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.store.revoke(&self.url);
    }
}
