//! Render request input.

use std::fmt;

use crate::context::{split_path_and_query, Headers, QueryParams, RenderContext};
use crate::error::RenderError;
use crate::mode::ResponseFormat;
use crate::node::ComponentNode;

/// Builds the root of the component tree for one request.
pub type RootFactory = Box<dyn FnOnce(&RenderContext) -> anyhow::Result<ComponentNode>>;

/// Input for one render. Created per HTTP request and consumed by the renderer.
pub struct RenderRequest {
    /// Target pathname.
    pub pathname: String,
    /// Query string parameters.
    pub query: QueryParams,
    /// HTTP headers.
    pub headers: Headers,
    /// Body format.
    pub format: ResponseFormat,
    /// Root component factory.
    pub root: RootFactory,
}

impl RenderRequest {
    /// Create a request for a pathname.
    pub fn new<F>(pathname: impl Into<String>, root: F) -> Self
    where
        F: FnOnce(&RenderContext) -> anyhow::Result<ComponentNode> + 'static,
    {
        Self {
            pathname: pathname.into(),
            query: QueryParams::new(),
            headers: Headers::new(),
            format: ResponseFormat::Document,
            root: Box::new(root),
        }
    }

    /// Create a request from `"/path?query"`.
    pub fn from_path_and_query<F>(path_with_query: &str, root: F) -> Self
    where
        F: FnOnce(&RenderContext) -> anyhow::Result<ComponentNode> + 'static,
    {
        let (pathname, query) = split_path_and_query(path_with_query);
        let mut request = Self::new(pathname, root);
        request.query = query;
        request
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace all headers.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Set the response format.
    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    /// Check the request before rendering.
    pub fn validate(&self) -> Result<(), RenderError> {
        if !self.pathname.starts_with('/') {
            return Err(RenderError::InvalidRequest(format!(
                "pathname must start with '/': {:?}",
                self.pathname
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for RenderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderRequest")
            .field("pathname", &self.pathname)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(_: &RenderContext) -> anyhow::Result<ComponentNode> {
        Ok(ComponentNode::text("hi"))
    }

    #[test]
    fn test_from_path_and_query() {
        let req = RenderRequest::from_path_and_query("/stream?_bot", root);
        assert_eq!(req.pathname, "/stream");
        assert!(req.query.contains_key("_bot"));
    }

    #[test]
    fn test_validate_rejects_relative_path() {
        assert!(RenderRequest::new("/ok", root).validate().is_ok());
        let err = RenderRequest::new("nope", root).validate().unwrap_err();
        assert!(matches!(err, RenderError::InvalidRequest(_)));
    }

    #[test]
    fn test_builder() {
        let req = RenderRequest::new("/", root)
            .with_query("page", "2")
            .with_header("User-Agent", "curl")
            .with_format(ResponseFormat::Flight);
        assert_eq!(req.query["page"], "2");
        assert_eq!(req.headers["User-Agent"], "curl");
        assert_eq!(req.format, ResponseFormat::Flight);
        assert!(format!("{:?}", req).contains("RenderRequest"));
    }
}
