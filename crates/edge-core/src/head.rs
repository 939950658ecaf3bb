//! Head tag declarations.

use crate::escape::escape_attr;
use crate::escape::escape_text;
use crate::escape::is_markup_name;

/// Which attribute identifies a `<meta>` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaAttr {
    /// `<meta name="...">`.
    Name,
    /// `<meta property="...">` (Open Graph).
    Property,
}

impl MetaAttr {
    /// Attribute name as written in markup.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Property => "property",
        }
    }
}

/// A tag declared by a component for the document head.
///
/// `HtmlAttr` and `BodyAttr` land on the `<html>` and `<body>` elements
/// rather than inside `<head>`, but they are finalized together with the
/// rest of the metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeoTag {
    /// `<title>`.
    Title(String),
    /// `<meta>` keyed by `name` or `property`.
    Meta {
        attr: MetaAttr,
        key: String,
        content: String,
    },
    /// `<link>` keyed by `rel`.
    Link { rel: String, href: String },
    /// Attribute on `<html>`.
    HtmlAttr { name: String, value: String },
    /// Attribute on `<body>`.
    BodyAttr { name: String, value: String },
}

impl SeoTag {
    /// Create a title tag.
    pub fn title(title: impl Into<String>) -> Self {
        Self::Title(title.into())
    }

    /// Create a `<meta name=.. content=..>` tag.
    pub fn meta_name(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Meta {
            attr: MetaAttr::Name,
            key: name.into(),
            content: content.into(),
        }
    }

    /// Create a `<meta property=.. content=..>` tag.
    pub fn meta_property(property: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Meta {
            attr: MetaAttr::Property,
            key: property.into(),
            content: content.into(),
        }
    }

    /// Create a `<link rel=.. href=..>` tag.
    pub fn link(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self::Link {
            rel: rel.into(),
            href: href.into(),
        }
    }

    /// Set an attribute on `<html>`.
    pub fn html_attr(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::HtmlAttr {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Set an attribute on `<body>`.
    pub fn body_attr(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::BodyAttr {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Logical identity of the tag. Two declarations with the same key
    /// replace each other.
    pub fn key(&self) -> String {
        match self {
            Self::Title(_) => "title".to_string(),
            Self::Meta { attr, key, .. } => format!("meta:{}:{}", attr.as_str(), key),
            Self::Link { rel, .. } => format!("link:{}", rel),
            Self::HtmlAttr { name, .. } => format!("html:{}", name),
            Self::BodyAttr { name, .. } => format!("body:{}", name),
        }
    }

    /// Whether this tag renders inside `<head>`.
    pub fn is_head_element(&self) -> bool {
        !matches!(self, Self::HtmlAttr { .. } | Self::BodyAttr { .. })
    }

    /// Render a head element. Attribute tags render as ` name="value"`.
    pub fn render(&self) -> String {
        match self {
            Self::Title(title) => format!("<title>{}</title>", escape_text(title)),
            Self::Meta { attr, key, content } => format!(
                r#"<meta {}="{}" content="{}" />"#,
                attr.as_str(),
                escape_attr(key),
                escape_attr(content)
            ),
            Self::Link { rel, href } => format!(
                r#"<link rel="{}" href="{}" />"#,
                escape_attr(rel),
                escape_attr(href)
            ),
            Self::HtmlAttr { name, value } | Self::BodyAttr { name, value } => {
                if !is_markup_name(name) {
                    return String::new();
                }
                format!(r#" {}="{}""#, name, escape_attr(value))
            }
        }
    }
}
