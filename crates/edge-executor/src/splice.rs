//! Out-of-order splice markup.
//!
//! A pending boundary is written inline as a marked fallback region. When the
//! boundary resolves, its content arrives later in a hidden segment together
//! with a call that moves the segment into the region, replacing the fallback.

use edge_core::NodeId;

/// Name of the client-side splice function.
pub const SPLICE_FN: &str = "$RC";

/// Closes a pending region.
pub const PENDING_CLOSE: &str = "<!--/$-->";

/// Definition of the splice function.
///
/// Removes everything between the boundary template and its closing comment,
/// moves the segment's children into that position, then drops the template
/// and the empty segment.
const SPLICE_RUNTIME: &str = r#"<script>function $RC(b,s){var t=document.getElementById(b),c=document.getElementById(s);if(!t||!c)return;var p=t.parentNode,n=t.nextSibling,d=0;while(n){var x=n.nextSibling;if(n.nodeType===8){if(n.data==="/$"){if(d===0)break;d--}else if(n.data==="$?")d++}p.removeChild(n);n=x}while(c.firstChild)p.insertBefore(c.firstChild,n);var o=t.previousSibling;if(o&&o.nodeType===8)o.data="$";p.removeChild(t);c.parentNode.removeChild(c)}</script>"#;

/// Element id of a boundary's template.
pub fn template_id(id: NodeId) -> String {
    format!("B:{}", id)
}

/// Element id of a boundary's hidden segment.
pub fn segment_id(id: NodeId) -> String {
    format!("S:{}", id)
}

/// Opening of a pending region: marker comment plus template carrying the id.
pub fn pending_open(id: NodeId) -> String {
    format!(r#"<!--$?--><template id="{}"></template>"#, template_id(id))
}

/// A complete pending region around rendered fallback markup.
pub fn wrap_pending(id: NodeId, fallback_html: &str) -> String {
    format!("{}{}{}", pending_open(id), fallback_html, PENDING_CLOSE)
}

/// Resolved content, hidden until spliced.
pub fn hidden_segment(id: NodeId, html: &str) -> String {
    format!(r#"<div hidden id="{}">{}</div>"#, segment_id(id), html)
}

/// Call that splices a segment into its region.
pub fn splice_call(id: NodeId) -> String {
    format!(
        r#"<script>{}("{}","{}")</script>"#,
        SPLICE_FN,
        template_id(id),
        segment_id(id)
    )
}

/// The splice function definition.
pub fn splice_runtime() -> &'static str {
    SPLICE_RUNTIME
}

/// Markup delivering one resolved boundary.
///
/// `define_runtime` must be true for the first resolution of a response only.
pub fn resolution_markup(id: NodeId, html: &str, define_runtime: bool) -> String {
    let mut out = String::new();
    if define_runtime {
        out.push_str(SPLICE_RUNTIME);
    }
    out.push_str(&hidden_segment(id, html));
    out.push_str(&splice_call(id));
    out
}
