use crate::core::{FundingRecord, HierarchyNode};

/// Builds the single-root tree: one leaf per record, values summed bottom-up,
/// children sorted by descending value.
pub fn build_hierarchy(records: &[FundingRecord]) -> HierarchyNode {
    let children = records
        .iter()
        .map(|record| HierarchyNode {
            record: Some(record.clone()),
            children: Vec::new(),
            value: 0.0,
        })
        .collect();

    let mut root = HierarchyNode {
        record: None,
        children,
        value: 0.0,
    };
    sum(&mut root);
    sort_by_value(&mut root);
    root
}

/// Sets every node's value to the funding of its subtree and returns it.
pub fn sum(node: &mut HierarchyNode) -> f64 {
    let own = node.record.as_ref().map_or(0.0, |r| r.funding);
    let children: f64 = node.children.iter_mut().map(sum).sum();
    node.value = own + children;
    node.value
}

/// Descending by value at every level. Stable, so equal values keep input order.
pub fn sort_by_value(node: &mut HierarchyNode) {
    node.children.sort_by(|a, b| b.value.total_cmp(&a.value));
    for child in &mut node.children {
        sort_by_value(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(department: &str, funding: f64) -> FundingRecord {
        FundingRecord {
            department: department.to_string(),
            funding,
        }
    }

    #[test]
    fn test_root_value_is_sum_of_leaves() {
        let records = vec![record("A", 100.0), record("B", 1.0), record("C", 42.5)];
        let root = build_hierarchy(&records);

        assert_eq!(root.value, 143.5);
        let leaf_sum: f64 = root.leaves().iter().map(|leaf| leaf.value).sum();
        assert_eq!(leaf_sum, root.value);
    }

    #[test]
    fn test_children_sorted_descending() {
        let records = vec![record("small", 1.0), record("large", 50.0), record("mid", 10.0)];
        let root = build_hierarchy(&records);

        let order: Vec<&str> = root.leaves().iter().filter_map(|l| l.department()).collect();
        assert_eq!(order, vec!["large", "mid", "small"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let records = vec![record("first", 5.0), record("second", 5.0), record("third", 5.0)];
        let root = build_hierarchy(&records);

        let order: Vec<&str> = root.leaves().iter().filter_map(|l| l.department()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty_input_builds_empty_root() {
        let root = build_hierarchy(&[]);
        assert_eq!(root.value, 0.0);
        assert!(root.is_leaf());
        assert!(root.department().is_none());
    }
}
