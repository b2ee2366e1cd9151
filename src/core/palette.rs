/// The twelve "Set3" colors followed by the first four "Set2" colors.
pub const PALETTE: [&str; 16] = [
    "#8dd3c7", "#ffffb3", "#bebada", "#fb8072", "#80b1d3", "#fdb462", "#b3de69", "#fccde5",
    "#d9d9d9", "#bc80bd", "#ccebc5", "#ffed6f", "#66c2a5", "#fc8d62", "#8da0cb", "#e78ac3",
];

/// Color for the leaf at `index` in the sorted sequence; cycles after 16.
pub fn color_for(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}
