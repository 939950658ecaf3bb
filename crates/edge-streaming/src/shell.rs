//! Document shell.

use edge_core::{escape_attr, escape_text, DocumentConfig, FlightConfig};

use crate::seo::SeoTagSet;

/// The HTML document wrapped around the rendered tree.
///
/// The opening part carries the finalized head and declares the
/// side-channel array, so it must be written before any push statement.
#[derive(Debug, Clone)]
pub struct DocumentShell {
    /// Include doctype declaration.
    pub doctype: bool,
    /// `<html lang>` used when no component declares one.
    pub lang: String,
    /// Title used when no component declares one.
    pub default_title: Option<String>,
    /// Id of the container the tree renders into.
    pub root_id: String,
    /// Name of the side-channel array.
    pub flight_global: String,
}

impl DocumentShell {
    /// Create a shell from configuration.
    pub fn new(document: &DocumentConfig, flight: &FlightConfig) -> Self {
        Self {
            doctype: true,
            lang: document.lang.clone(),
            default_title: document.default_title.clone(),
            root_id: document.root_id.clone(),
            flight_global: flight.global.clone(),
        }
    }

    /// Side-channel initializer: an empty array declared before any push.
    pub fn flight_initializer(&self) -> String {
        format!("<script>var {}=[];</script>", self.flight_global)
    }

    /// Render everything up to and including the root container's opening tag.
    pub fn render_opening(&self, tags: &SeoTagSet) -> String {
        let mut html = String::new();

        if self.doctype {
            html.push_str("<!DOCTYPE html>\n");
        }

        html.push_str("<html");
        if tags.get("html:lang").is_none() {
            html.push_str(&format!(r#" lang="{}""#, escape_attr(&self.lang)));
        }
        html.push_str(&tags.render_html_attrs());
        html.push_str(">\n<head>\n<meta charset=\"utf-8\" />\n");

        if !tags.has_title() {
            if let Some(title) = &self.default_title {
                html.push_str(&format!("<title>{}</title>\n", escape_text(title)));
            }
        }
        html.push_str(&tags.render_head());
        html.push_str(&self.flight_initializer());
        html.push_str("\n</head>\n");

        html.push_str("<body");
        html.push_str(&tags.render_body_attrs());
        html.push_str(">\n");
        html.push_str(&format!(r#"<div id="{}">"#, escape_attr(&self.root_id)));

        html
    }

    /// Render the closing part of the document.
    pub fn render_closing(&self) -> String {
        "</div>\n</body>\n</html>".to_string()
    }

    /// A standalone error page.
    pub fn render_error(&self, status: u16, message: &str) -> String {
        let mut html = String::new();
        if self.doctype {
            html.push_str("<!DOCTYPE html>\n");
        }
        html.push_str(&format!(
            "<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\" />\n<title>Error {}</title>\n</head>\n<body>\n<h1>Something went wrong</h1>\n<p class=\"render-error\">{}</p>\n</body>\n</html>",
            escape_attr(&self.lang),
            status,
            escape_text(message)
        ));
        html
    }
}

impl Default for DocumentShell {
    fn default() -> Self {
        Self::new(&DocumentConfig::default(), &FlightConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_core::SeoTag;

    #[test]
    fn test_opening_declares_flight_array_in_head() {
        let shell = DocumentShell::default();
        let html = shell.render_opening(&SeoTagSet::new());

        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(html.contains("<script>var __flight=[];</script>"));
        assert!(html.find("var __flight").unwrap() < html.find("</head>").unwrap());
        assert!(html.ends_with(r#"<div id="root">"#));
    }

    #[test]
    fn test_declared_attrs_override_default_lang() {
        let shell = DocumentShell::default();
        let mut tags = SeoTagSet::new();
        tags.insert(SeoTag::html_attr("lang", "ja"));
        tags.insert(SeoTag::body_attr("data-test", "true"));

        let html = shell.render_opening(&tags);
        assert!(html.contains(r#"<html lang="ja">"#));
        assert!(html.contains(r#"<body data-test="true">"#));
        assert!(!html.contains(r#"lang="en""#));
    }

    #[test]
    fn test_default_title_only_without_declared_title() {
        let mut shell = DocumentShell::default();
        shell.default_title = Some("Store".into());

        let html = shell.render_opening(&SeoTagSet::new());
        assert!(html.contains("<title>Store</title>"));

        let mut tags = SeoTagSet::new();
        tags.insert(SeoTag::title("Product"));
        let html = shell.render_opening(&tags);
        assert!(html.contains("<title>Product</title>"));
        assert!(!html.contains("<title>Store</title>"));
    }

    #[test]
    fn test_custom_global_name() {
        let flight = FlightConfig {
            global: "__rsc".into(),
        };
        let shell = DocumentShell::new(&DocumentConfig::default(), &flight);
        assert_eq!(shell.flight_initializer(), "<script>var __rsc=[];</script>");
    }

    #[test]
    fn test_error_page_escapes_message() {
        let html = DocumentShell::default().render_error(500, "<boom>");
        assert!(html.contains("Error 500"));
        assert!(html.contains("&lt;boom&gt;"));
    }
}
