//! In-memory vector scene and its SVG serialization.
//!
//! The renderer appends nodes to a [`Scene`]; the exporter clones it, adds a
//! style block and serializes the clone. Output is deterministic: the same
//! scene always serializes to the same bytes.

use std::fmt::Write as _;

/// Index of a top-level node or group in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Translate(f64, f64),
    TranslateRotate(f64, f64, i32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    Group {
        class: Option<String>,
        transform: Option<Transform>,
        children: Vec<SceneNode>,
    },
    Rect {
        class: Option<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: String,
        stroke: Option<String>,
        stroke_width: f64,
    },
    Text {
        class: Option<String>,
        x: f64,
        y: f64,
        transform: Option<Transform>,
        anchor: Option<&'static str>,
        fill: String,
        font_size: f64,
        content: String,
    },
    Style(String),
}

impl SceneNode {
    pub fn group(class: &str, transform: Option<Transform>) -> Self {
        SceneNode::Group {
            class: Some(class.to_string()),
            transform,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, itself included.
    pub fn count(&self) -> usize {
        match self {
            SceneNode::Group { children, .. } => {
                1 + children.iter().map(Self::count).sum::<usize>()
            }
            _ => 1,
        }
    }

    fn write_svg(&self, out: &mut String) {
        match self {
            SceneNode::Group {
                class,
                transform,
                children,
            } => {
                out.push_str("<g");
                write_class(out, class);
                write_transform(out, transform);
                out.push('>');
                for child in children {
                    child.write_svg(out);
                }
                out.push_str("</g>");
            }
            SceneNode::Rect {
                class,
                x,
                y,
                width,
                height,
                fill,
                stroke,
                stroke_width,
            } => {
                out.push_str("<rect");
                write_class(out, class);
                let _ = write!(
                    out,
                    " x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\"",
                    fmt_num(*x),
                    fmt_num(*y),
                    fmt_num(*width),
                    fmt_num(*height),
                    escape_xml(fill)
                );
                if let Some(stroke) = stroke {
                    let _ = write!(
                        out,
                        " stroke=\"{}\" stroke-width=\"{}\"",
                        escape_xml(stroke),
                        fmt_num(*stroke_width)
                    );
                }
                out.push_str("/>");
            }
            SceneNode::Text {
                class,
                x,
                y,
                transform,
                anchor,
                fill,
                font_size,
                content,
            } => {
                out.push_str("<text");
                write_class(out, class);
                if *x != 0.0 || *y != 0.0 {
                    let _ = write!(out, " x=\"{}\" y=\"{}\"", fmt_num(*x), fmt_num(*y));
                }
                write_transform(out, transform);
                if let Some(anchor) = anchor {
                    let _ = write!(out, " text-anchor=\"{}\"", anchor);
                }
                let _ = write!(
                    out,
                    " style=\"fill: {}; font-size: {}px;\">{}</text>",
                    escape_xml(fill),
                    fmt_num(*font_size),
                    escape_xml(content)
                );
            }
            SceneNode::Style(css) => {
                let _ = write!(out, "<style><![CDATA[{}]]></style>", css);
            }
        }
    }
}

/// The vector canvas a render pass draws into.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, node: SceneNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Adds `node` as the first child of the document.
    pub fn insert_first(&mut self, node: SceneNode) {
        self.nodes.insert(0, node);
    }

    /// Appends to the group at `parent`, descending along `path` (child indices).
    pub fn append_child(&mut self, parent: NodeId, path: &[usize], node: SceneNode) -> bool {
        let Some(mut target) = self.nodes.get_mut(parent.0) else {
            return false;
        };
        for &idx in path {
            let current = target;
            target = match current {
                SceneNode::Group { children, .. } => match children.get_mut(idx) {
                    Some(child) => child,
                    None => return false,
                },
                _ => return false,
            };
        }
        match target {
            SceneNode::Group { children, .. } => {
                children.push(node);
                true
            }
            _ => false,
        }
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(SceneNode::count).sum()
    }

    /// Standalone SVG document.
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let width = fmt_num(self.width);
        let height = fmt_num(self.height);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
        );
        for node in &self.nodes {
            node.write_svg(&mut svg);
        }
        svg.push_str("</svg>");
        svg
    }
}

fn write_class(out: &mut String, class: &Option<String>) {
    if let Some(class) = class {
        let _ = write!(out, " class=\"{}\"", escape_xml(class));
    }
}

fn write_transform(out: &mut String, transform: &Option<Transform>) {
    match transform {
        Some(Transform::Translate(x, y)) => {
            let _ = write!(out, " transform=\"translate({},{})\"", fmt_num(*x), fmt_num(*y));
        }
        Some(Transform::TranslateRotate(x, y, deg)) => {
            let _ = write!(
                out,
                " transform=\"translate({},{}) rotate({})\"",
                fmt_num(*x),
                fmt_num(*y),
                deg
            );
        }
        None => {}
    }
}

/// Up to three decimals, trailing zeros dropped.
pub fn fmt_num(value: f64) -> String {
    let formatted = format!("{:.3}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
