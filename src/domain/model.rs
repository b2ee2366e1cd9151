use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the funding table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRecord {
    pub department: String,
    /// Always finite and > 0 after loading; see [`crate::core::loader::coerce_funding`].
    pub funding: f64,
}

/// department -> word -> count
pub type WordCounts = BTreeMap<String, u64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordFrequencyTable {
    pub departments: BTreeMap<String, WordCounts>,
}

impl WordFrequencyTable {
    /// Word table for a department, `None` when absent or empty.
    pub fn words_for(&self, department: &str) -> Option<&WordCounts> {
        self.departments
            .get(department)
            .filter(|words| !words.is_empty())
    }

    pub fn len(&self) -> usize {
        self.departments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    /// `None` for the root.
    pub record: Option<FundingRecord>,
    pub children: Vec<HierarchyNode>,
    /// Sum of funding over the subtree, filled by `sum()`.
    pub value: f64,
}

impl HierarchyNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Leaves in depth-first order (the sorted order once `sort_by_value` ran).
    pub fn leaves(&self) -> Vec<&HierarchyNode> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a HierarchyNode>) {
        if self.is_leaf() {
            out.push(self);
            return;
        }
        for child in &self.children {
            child.collect_leaves(out);
        }
    }

    pub fn department(&self) -> Option<&str> {
        self.record.as_ref().map(|r| r.department.as_str())
    }
}

/// A positioned treemap rectangle for one leaf.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub department: String,
    pub value: f64,
    /// Position in the sorted leaf sequence.
    pub index: usize,
    pub color: String,
}

impl Cell {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn overlaps(&self, other: &Cell) -> bool {
        const EPS: f64 = 1e-9;
        self.x0 < other.x1 - EPS
            && other.x0 < self.x1 - EPS
            && self.y0 < other.y1 - EPS
            && other.y0 < self.y1 - EPS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Horizontal,
    Vertical,
}

impl Rotation {
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::Horizontal => 0,
            Rotation::Vertical => 90,
        }
    }
}

/// A word placed by the packer. `x`/`y` is the text anchor (middle of the
/// baseline) relative to the cell center.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedWord {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub rotation: Rotation,
    pub size_px: f64,
}

/// Summary returned by a render pass.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub departments: usize,
    pub total_funding: f64,
    pub cells: usize,
    pub clouds_drawn: usize,
    pub words_placed: usize,
    pub svg_path: Option<String>,
    pub png_path: Option<String>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}
