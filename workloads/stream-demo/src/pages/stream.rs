//! Shell-first page with one delayed boundary.

use edge_sdk::edge_core::{ComponentNode, RenderContext, SeoTag};

use super::deferred;

/// `/stream`: a boundary that resolves after the shell, then a footer.
pub fn stream_page(_: &RenderContext) -> anyhow::Result<ComponentNode> {
    let content = ComponentNode::element("div").attr("c", "5").child("done");
    Ok(ComponentNode::element("div")
        .child(ComponentNode::head(SeoTag::title("Stream")))
        .child(ComponentNode::suspense("loading...", deferred(2, content)))
        .child(ComponentNode::element("footer").child("footer!"))
        .into())
}
