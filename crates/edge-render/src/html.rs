//! Markup for evaluated trees.

use edge_core::{escape_attr, escape_text, is_markup_name, MountedNode};
use edge_executor::{wrap_pending, SuspenseBoundaryTracker};

/// Elements that have no closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Writes HTML for a `MountedNode` tree.
///
/// Without a tracker, boundaries render as marked pending regions holding
/// their fallback. With a tracker, settled boundaries are stitched inline
/// with no markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlWriter<'a> {
    resolved: Option<&'a SuspenseBoundaryTracker>,
}

impl<'a> HtmlWriter<'a> {
    /// Writer for streamed output.
    pub fn pending() -> Self {
        Self { resolved: None }
    }

    /// Writer that inlines settled boundary content.
    pub fn stitched(tracker: &'a SuspenseBoundaryTracker) -> Self {
        Self {
            resolved: Some(tracker),
        }
    }

    /// Render a tree to a string.
    pub fn render(&self, node: &MountedNode) -> String {
        let mut out = String::new();
        self.write(node, &mut out);
        out
    }

    fn write(&self, node: &MountedNode, out: &mut String) {
        match node {
            MountedNode::Text { text, .. } => out.push_str(&escape_text(text)),
            MountedNode::Element {
                tag,
                attrs,
                children,
                ..
            } => {
                // Unusable tag names lose their wrapper but keep their children.
                if !is_markup_name(tag) {
                    self.write_all(children, out);
                    return;
                }
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs.iter().filter(|(name, _)| is_markup_name(name)) {
                    out.push_str(&format!(r#" {}="{}""#, name, escape_attr(value)));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                self.write_all(children, out);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            MountedNode::Fragment { children, .. } | MountedNode::Client { children, .. } => {
                self.write_all(children, out)
            }
            MountedNode::Boundary { id, fallback } => match self.resolved {
                None => out.push_str(&wrap_pending(*id, &self.render(fallback))),
                Some(tracker) => match tracker.get(*id) {
                    Some(boundary) if !boundary.is_pending() => {
                        if let Some(content) = &boundary.content {
                            self.write(content, out);
                        }
                    }
                    _ => self.write(fallback, out),
                },
            },
        }
    }

    fn write_all(&self, children: &[MountedNode], out: &mut String) {
        for child in children {
            self.write(child, out);
        }
    }
}
