//! Head metadata declared before and after a suspense delay.

use edge_sdk::edge_core::{ComponentNode, RenderContext, SeoTag};

use super::deferred;

/// `/seo`: document attributes up front, one meta tag only after a delay.
///
/// Bots see both meta tags. Streamed responses flush the head with the
/// shell, so the delayed tag is dropped.
pub fn seo_page(_: &RenderContext) -> anyhow::Result<ComponentNode> {
    let delayed = ComponentNode::fragment(vec![
        ComponentNode::head(SeoTag::meta_property("type", "website")),
        ComponentNode::element("p").child("Metadata loaded").into(),
    ]);

    Ok(ComponentNode::fragment(vec![
        ComponentNode::head(SeoTag::html_attr("lang", "ja")),
        ComponentNode::head(SeoTag::body_attr("data-test", "true")),
        ComponentNode::head(SeoTag::title("SEO")),
        ComponentNode::head(SeoTag::meta_property("og:url", "example.com")),
        ComponentNode::element("h1").child("SEO").into(),
        ComponentNode::suspense("...", deferred(2, delayed)).into(),
    ]))
}
