//! Deferred head metadata.

use edge_core::{RenderError, SeoTag};

/// Ordered head tags, last declaration wins per tag key.
///
/// Positions follow first declaration; a redeclaration replaces the value
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeoTagSet {
    tags: Vec<SeoTag>,
}

impl SeoTagSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tag.
    pub fn insert(&mut self, tag: SeoTag) {
        let key = tag.key();
        match self.tags.iter_mut().find(|t| t.key() == key) {
            Some(existing) => *existing = tag,
            None => self.tags.push(tag),
        }
    }

    /// Look up a tag by key.
    pub fn get(&self, key: &str) -> Option<&SeoTag> {
        self.tags.iter().find(|t| t.key() == key)
    }

    /// All tags in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &SeoTag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Whether a title was declared.
    pub fn has_title(&self) -> bool {
        self.get("title").is_some()
    }

    /// Render the elements that go inside `<head>`, one per line.
    pub fn render_head(&self) -> String {
        let mut html = String::new();
        for tag in self.tags.iter().filter(|t| t.is_head_element()) {
            html.push_str(&tag.render());
            html.push('\n');
        }
        html
    }

    /// Render declared `<html>` attributes.
    pub fn render_html_attrs(&self) -> String {
        self.tags
            .iter()
            .filter(|t| matches!(t, SeoTag::HtmlAttr { .. }))
            .map(SeoTag::render)
            .collect()
    }

    /// Render declared `<body>` attributes.
    pub fn render_body_attrs(&self) -> String {
        self.tags
            .iter()
            .filter(|t| matches!(t, SeoTag::BodyAttr { .. }))
            .map(SeoTag::render)
            .collect()
    }
}

/// Collects head tags until the moment they are serialized.
///
/// `finalize` freezes the set. Declarations after that point are not
/// applied; they are counted so the caller can report them.
#[derive(Debug, Default)]
pub struct SeoInjector {
    tags: SeoTagSet,
    finalized: bool,
    late_declarations: usize,
}

impl SeoInjector {
    /// Create an empty injector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a tag. Returns `false` if the set is already frozen.
    pub fn declare(&mut self, tag: SeoTag) -> bool {
        if self.finalized {
            self.late_declarations += 1;
            return false;
        }
        self.tags.insert(tag);
        true
    }

    /// Freeze and return the tag set.
    pub fn finalize(&mut self) -> Result<SeoTagSet, RenderError> {
        if self.finalized {
            return Err(RenderError::AlreadyFinalized);
        }
        self.finalized = true;
        Ok(self.tags.clone())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Declarations dropped because they arrived after `finalize`.
    pub fn late_declarations(&self) -> usize {
        self.late_declarations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins_keeps_position() {
        let mut set = SeoTagSet::new();
        set.insert(SeoTag::title("First"));
        set.insert(SeoTag::meta_name("description", "a"));
        set.insert(SeoTag::title("Second"));

        let tags: Vec<_> = set.iter().cloned().collect();
        assert_eq!(
            tags,
            vec![SeoTag::title("Second"), SeoTag::meta_name("description", "a")]
        );
    }

    #[test]
    fn test_render_separates_head_and_attrs() {
        let mut set = SeoTagSet::new();
        set.insert(SeoTag::html_attr("lang", "ja"));
        set.insert(SeoTag::body_attr("data-test", "true"));
        set.insert(SeoTag::meta_property("og:url", "example.com"));

        assert_eq!(set.render_html_attrs(), r#" lang="ja""#);
        assert_eq!(set.render_body_attrs(), r#" data-test="true""#);
        assert_eq!(
            set.render_head(),
            "<meta property=\"og:url\" content=\"example.com\" />\n"
        );
    }

    #[test]
    fn test_finalize_twice_fails() {
        let mut seo = SeoInjector::new();
        seo.declare(SeoTag::title("Home"));
        let set = seo.finalize().unwrap();
        assert!(set.has_title());
        assert_eq!(seo.finalize(), Err(RenderError::AlreadyFinalized));
    }

    #[test]
    fn test_late_declarations_are_not_retroactive() {
        let mut seo = SeoInjector::new();
        assert!(seo.declare(SeoTag::meta_property("og:url", "example.com")));
        let frozen = seo.finalize().unwrap();

        assert!(!seo.declare(SeoTag::meta_property("type", "website")));
        assert_eq!(seo.late_declarations(), 1);
        assert!(frozen.get("meta:property:type").is_none());
        assert_eq!(frozen.len(), 1);
    }
}
