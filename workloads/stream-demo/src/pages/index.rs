//! Landing page with boundaries that finish out of declaration order.

use edge_sdk::edge_core::{ClientModule, ComponentNode, ErrorFallback, RenderContext, SeoTag};

use super::{deferred, settle_after};

/// `/`: a slow and a fast boundary, a client link, and a boundary that fails.
pub fn index_page(ctx: &RenderContext) -> anyhow::Result<ComponentNode> {
    let pathname = ctx.pathname.clone();

    let link = ComponentNode::client(ClientModule::new("./Link.client"))
        .prop("href", "/stream")
        .child("Go to /stream");

    let recommendations = async {
        settle_after(1).await;
        Err::<ComponentNode, _>(anyhow::anyhow!("recommendations unavailable"))
    };

    Ok(ComponentNode::element("main")
        .child(ComponentNode::head(SeoTag::title("Stream Demo")))
        .child(ComponentNode::head(SeoTag::meta_name(
            "description",
            "Streaming server-component demo",
        )))
        .child(ComponentNode::element("h1").child("Stream Demo"))
        .child(ComponentNode::element("p").child(format!("Rendered for {}", pathname)))
        .child(ComponentNode::suspense("Loading slow section...", deferred(4, "slow section")))
        .child(ComponentNode::suspense("Loading fast section...", deferred(1, link)))
        .child(
            ComponentNode::suspense("Loading recommendations...", recommendations)
                .on_error(ErrorFallback::ShowError),
        )
        .into())
}
