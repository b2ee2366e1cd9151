use crate::config::toml_config::Tiling;
use crate::core::palette::color_for;
use crate::core::{Cell, HierarchyNode, LayoutEngine, TreemapOptions};
use crate::utils::error::{RenderError, Result};

/// Golden ratio, the target aspect ratio for squarified rows.
const PHI: f64 = 1.618_033_988_749_895;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rect {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Rect {
    /// Shrinks by `p` on every side, collapsing to the midline instead of inverting.
    fn inset(self, p: f64) -> Rect {
        let (mut x0, mut y0, mut x1, mut y1) = (self.x0 + p, self.y0 + p, self.x1 - p, self.y1 - p);
        if x1 < x0 {
            x0 = (x0 + x1) / 2.0;
            x1 = x0;
        }
        if y1 < y0 {
            y0 = (y0 + y1) / 2.0;
            y1 = y0;
        }
        Rect { x0, y0, x1, y1 }
    }
}

/// Treemap layout with configurable tiling. Squarify is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreemapLayout {
    pub tiling: Tiling,
}

impl TreemapLayout {
    pub fn new(tiling: Tiling) -> Self {
        Self { tiling }
    }

    fn position(
        &self,
        node: &HierarchyNode,
        rect: Rect,
        depth: usize,
        options: &TreemapOptions,
        out: &mut Vec<(Rect, usize)>,
    ) {
        let own = if depth == 0 {
            rect
        } else {
            rect.inset(options.padding_inner / 2.0)
        };

        if node.is_leaf() {
            out.push((own, depth));
            return;
        }

        let half = options.padding_inner / 2.0;
        let inner = own.inset(options.padding_outer - half);
        let values: Vec<f64> = node.children.iter().map(|c| c.value).collect();
        let tiles = self.tile(&values, node.value, inner, depth);

        for (child, tile) in node.children.iter().zip(tiles) {
            self.position(child, tile, depth + 1, options, out);
        }
    }

    fn tile(&self, values: &[f64], total: f64, rect: Rect, depth: usize) -> Vec<Rect> {
        match self.tiling {
            Tiling::Squarify => squarify(values, total, rect, PHI),
            Tiling::Slice => slice(values, total, rect),
            Tiling::Dice => dice(values, total, rect),
            Tiling::SliceDice if depth % 2 == 1 => slice(values, total, rect),
            Tiling::SliceDice => dice(values, total, rect),
        }
    }
}

impl LayoutEngine for TreemapLayout {
    fn name(&self) -> &'static str {
        match self.tiling {
            Tiling::Squarify => "squarify",
            Tiling::Slice => "slice",
            Tiling::Dice => "dice",
            Tiling::SliceDice => "slice-dice",
        }
    }

    fn layout(&self, root: &HierarchyNode, options: &TreemapOptions) -> Result<Vec<Cell>> {
        if !(options.width > 0.0 && options.height > 0.0) {
            return Err(RenderError::LayoutError {
                message: format!("canvas {}x{} has no area", options.width, options.height),
            });
        }
        if 2.0 * options.padding_outer >= options.width.min(options.height) {
            return Err(RenderError::LayoutError {
                message: format!(
                    "outer padding {} leaves no room in a {}x{} canvas",
                    options.padding_outer, options.width, options.height
                ),
            });
        }

        let mut positioned = Vec::new();
        let canvas = Rect {
            x0: 0.0,
            y0: 0.0,
            x1: options.width,
            y1: options.height,
        };
        self.position(root, canvas, 0, options, &mut positioned);

        // 顏色依排序位置決定，被內距壓扁的格子也佔一個位置
        let cells = root
            .leaves()
            .into_iter()
            .zip(positioned)
            .enumerate()
            .filter_map(|(index, (leaf, (rect, _)))| {
                let department = leaf.department()?;
                let visible = rect.x1 > rect.x0 && rect.y1 > rect.y0;
                visible.then_some((index, department, leaf.value, rect))
            })
            .map(|(index, department, value, rect)| Cell {
                x0: rect.x0,
                y0: rect.y0,
                x1: rect.x1,
                y1: rect.y1,
                department: department.to_string(),
                value,
                index,
                color: color_for(index).to_string(),
            })
            .collect();

        Ok(cells)
    }
}

/// Children stacked top to bottom, heights proportional to value.
fn slice(values: &[f64], total: f64, rect: Rect) -> Vec<Rect> {
    let k = if total > 0.0 { (rect.y1 - rect.y0) / total } else { 0.0 };
    let mut y = rect.y0;
    values
        .iter()
        .map(|value| {
            let y0 = y;
            y += value * k;
            Rect { x0: rect.x0, y0, x1: rect.x1, y1: y }
        })
        .collect()
}

/// Children laid left to right, widths proportional to value.
fn dice(values: &[f64], total: f64, rect: Rect) -> Vec<Rect> {
    let k = if total > 0.0 { (rect.x1 - rect.x0) / total } else { 0.0 };
    let mut x = rect.x0;
    values
        .iter()
        .map(|value| {
            let x0 = x;
            x += value * k;
            Rect { x0, y0: rect.y0, x1: x, y1: rect.y1 }
        })
        .collect()
}

/// Squarified tiling (Bruls, Huizing, van Wijk) with a target aspect ratio.
/// Rows grow while the worst aspect ratio in the row does not get worse.
fn squarify(values: &[f64], total: f64, rect: Rect, ratio: f64) -> Vec<Rect> {
    let n = values.len();
    let mut out = Vec::with_capacity(n);
    let (mut x0, mut y0, x1, y1) = (rect.x0, rect.y0, rect.x1, rect.y1);
    let mut remaining = total;
    let (mut i0, mut i1) = (0, 0);

    while i0 < n {
        let dx = x1 - x0;
        let dy = y1 - y0;

        // 跳過值為零的節點，找到下一個非空節點
        let mut sum_value;
        loop {
            sum_value = values[i1];
            i1 += 1;
            if sum_value != 0.0 || i1 >= n {
                break;
            }
        }
        let mut min_value = sum_value;
        let mut max_value = sum_value;
        let alpha = (dy / dx).max(dx / dy) / (remaining * ratio);
        let mut beta = sum_value * sum_value * alpha;
        let mut min_ratio = (max_value / beta).max(beta / min_value);

        while i1 < n {
            let node_value = values[i1];
            sum_value += node_value;
            min_value = min_value.min(node_value);
            max_value = max_value.max(node_value);
            beta = sum_value * sum_value * alpha;
            let new_ratio = (max_value / beta).max(beta / min_value);
            if new_ratio > min_ratio {
                sum_value -= node_value;
                break;
            }
            min_ratio = new_ratio;
            i1 += 1;
        }

        let row = &values[i0..i1];
        if dx < dy {
            let row_y1 = if remaining > 0.0 { y0 + dy * sum_value / remaining } else { y1 };
            out.extend(dice(row, sum_value, Rect { x0, y0, x1, y1: row_y1 }));
            y0 = row_y1;
        } else {
            let row_x1 = if remaining > 0.0 { x0 + dx * sum_value / remaining } else { x1 };
            out.extend(slice(row, sum_value, Rect { x0, y0, x1: row_x1, y1 }));
            x0 = row_x1;
        }
        remaining -= sum_value;
        i0 = i1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hierarchy::build_hierarchy;
    use crate::core::FundingRecord;

    fn records(values: &[f64]) -> Vec<FundingRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| FundingRecord {
                department: format!("Department {}", i),
                funding: *v,
            })
            .collect()
    }

    fn options(width: f64, height: f64, padding_outer: f64) -> TreemapOptions {
        TreemapOptions {
            width,
            height,
            padding_outer,
            padding_inner: 0.0,
        }
    }

    fn assert_tiles(cells: &[Cell], opts: &TreemapOptions) {
        for (i, a) in cells.iter().enumerate() {
            assert!(a.x1 > a.x0 && a.y1 > a.y0, "degenerate cell {:?}", a);
            assert!(a.x0 >= opts.padding_outer - 1e-9);
            assert!(a.y0 >= opts.padding_outer - 1e-9);
            assert!(a.x1 <= opts.width - opts.padding_outer + 1e-9);
            assert!(a.y1 <= opts.height - opts.padding_outer + 1e-9);
            for b in &cells[i + 1..] {
                assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }
        let area: f64 = cells.iter().map(Cell::area).sum();
        let expected =
            (opts.width - 2.0 * opts.padding_outer) * (opts.height - 2.0 * opts.padding_outer);
        assert!((area - expected).abs() < 1e-6 * expected, "{} != {}", area, expected);
    }

    #[test]
    fn test_squarify_tiles_padded_canvas() {
        let root = build_hierarchy(&records(&[60.0, 25.0, 10.0, 3.0, 1.0, 1.0, 7.0, 13.0]));
        let opts = options(900.0, 1200.0, 5.0);
        let cells = TreemapLayout::default().layout(&root, &opts).unwrap();

        assert_eq!(cells.len(), 8);
        assert_tiles(&cells, &opts);
    }

    #[test]
    fn test_every_tiling_satisfies_contract() {
        let root = build_hierarchy(&records(&[5.0, 4.0, 3.0, 2.0, 1.0]));
        let opts = options(600.0, 900.0, 5.0);
        for tiling in [Tiling::Squarify, Tiling::Slice, Tiling::Dice, Tiling::SliceDice] {
            let cells = TreemapLayout::new(tiling).layout(&root, &opts).unwrap();
            assert_eq!(cells.len(), 5, "{:?}", tiling);
            assert_tiles(&cells, &opts);
        }
    }

    #[test]
    fn test_area_proportional_to_value() {
        let root = build_hierarchy(&records(&[100.0, 1.0]));
        let opts = options(600.0, 900.0, 5.0);
        let cells = TreemapLayout::default().layout(&root, &opts).unwrap();

        let available = 590.0 * 890.0;
        assert!((cells[0].area() / available - 100.0 / 101.0).abs() < 1e-9);
        assert!((cells[1].area() / available - 1.0 / 101.0).abs() < 1e-9);
    }

    #[test]
    fn test_cells_carry_sorted_index_and_color() {
        let values: Vec<f64> = (1..=20).map(f64::from).collect();
        let root = build_hierarchy(&records(&values));
        let cells = TreemapLayout::default()
            .layout(&root, &options(600.0, 900.0, 5.0))
            .unwrap();

        assert_eq!(cells[0].department, "Department 19");
        for cell in &cells {
            assert_eq!(cell.color, color_for(cell.index));
        }
        assert_eq!(cells[16].color, cells[0].color);
    }

    #[test]
    fn test_collapsed_leaf_keeps_later_colors() {
        // 依序排列但不重新排序，讓被壓扁的格子夾在中間
        let children: Vec<HierarchyNode> = records(&[1000.0, 0.01, 300.0, 200.0])
            .into_iter()
            .map(|record| HierarchyNode {
                value: record.funding,
                record: Some(record),
                children: Vec::new(),
            })
            .collect();
        let root = HierarchyNode {
            value: children.iter().map(|c| c.value).sum(),
            record: None,
            children,
        };
        let opts = TreemapOptions {
            width: 600.0,
            height: 900.0,
            padding_outer: 5.0,
            padding_inner: 10.0,
        };
        let cells = TreemapLayout::default().layout(&root, &opts).unwrap();

        let departments: Vec<&str> = cells.iter().map(|c| c.department.as_str()).collect();
        assert_eq!(departments, ["Department 0", "Department 2", "Department 3"]);
        let indices: Vec<usize> = cells.iter().map(|c| c.index).collect();
        assert_eq!(indices, [0, 2, 3]);
        assert_eq!(cells[1].color, color_for(2));
        assert_eq!(cells[2].color, color_for(3));
    }

    #[test]
    fn test_layout_is_deterministic() {
        let root = build_hierarchy(&records(&[9.0, 7.0, 7.0, 2.0]));
        let opts = options(600.0, 900.0, 5.0);
        let first = TreemapLayout::default().layout(&root, &opts).unwrap();
        let second = TreemapLayout::default().layout(&root, &opts).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_department_fills_canvas() {
        let root = build_hierarchy(&records(&[42.0]));
        let opts = options(100.0, 50.0, 5.0);
        let cells = TreemapLayout::default().layout(&root, &opts).unwrap();

        assert_eq!(cells.len(), 1);
        let corners = [cells[0].x0, cells[0].y0, cells[0].x1, cells[0].y1];
        for (actual, expected) in corners.iter().zip([5.0, 5.0, 95.0, 45.0]) {
            assert!((actual - expected).abs() < 1e-9, "{:?}", corners);
        }
    }

    #[test]
    fn test_rejects_padding_larger_than_canvas() {
        let root = build_hierarchy(&records(&[1.0]));
        let result = TreemapLayout::default().layout(&root, &options(8.0, 8.0, 5.0));
        assert!(matches!(result, Err(RenderError::LayoutError { .. })));
    }

    #[test]
    fn test_empty_hierarchy_has_no_cells() {
        let root = build_hierarchy(&[]);
        let cells = TreemapLayout::default()
            .layout(&root, &options(100.0, 100.0, 5.0))
            .unwrap();
        assert!(cells.is_empty());
    }
}
