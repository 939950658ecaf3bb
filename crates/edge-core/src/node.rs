//! Component tree types.
//!
//! Applications describe a page as a `ComponentNode` tree. Suspense
//! boundaries carry the future that produces their content. The renderer
//! evaluates that tree into `MountedNode`s, assigning every node a stable
//! `NodeId` in document order; the id is what the side channel uses to
//! cross-reference boundaries.

use std::fmt;
use std::future::Future;

use futures::future::LocalBoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::head::SeoTag;

/// Identifier of an evaluated node, unique within one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out request-scoped ids in allocation order.
///
/// Node ids and side-channel row ids share this sequence so that every
/// row of one response has a distinct id.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    /// Create an allocator starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id.
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next
    }
}

/// A client component module (rendered on the server, hydrated on the client).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientModule {
    /// Module path, e.g. `./Link.client`.
    pub path: String,
    /// Export name, e.g. `default`.
    pub export: String,
}

impl ClientModule {
    /// Reference the default export of a module.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            export: "default".to_string(),
        }
    }

    /// Reference a named export.
    pub fn with_export(mut self, export: impl Into<String>) -> Self {
        self.export = export.into();
        self
    }
}

/// Future producing a suspense boundary's content.
pub type BoundaryFuture = LocalBoxFuture<'static, anyhow::Result<ComponentNode>>;

/// What a boundary shows when its content fails.
pub enum ErrorFallback {
    /// Render this tree in place of the content.
    Render(Box<ComponentNode>),
    /// Render a generic error message containing the failure text.
    ShowError,
    /// Render nothing.
    Skip,
}

impl fmt::Debug for ErrorFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render(node) => f.debug_tuple("Render").field(node).finish(),
            Self::ShowError => write!(f, "ShowError"),
            Self::Skip => write!(f, "Skip"),
        }
    }
}

/// An HTML element.
#[derive(Debug)]
pub struct ElementNode {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<ComponentNode>,
}

impl ElementNode {
    /// Add an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Append a child.
    pub fn child(mut self, child: impl Into<ComponentNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several children.
    pub fn children(mut self, children: impl IntoIterator<Item = ComponentNode>) -> Self {
        self.children.extend(children);
        self
    }
}

/// A subtree whose content resolves asynchronously.
pub struct SuspenseNode {
    pub fallback: Box<ComponentNode>,
    pub content: BoundaryFuture,
    /// `None` means a failure escapes the boundary and fails the render.
    pub on_error: Option<ErrorFallback>,
}

impl SuspenseNode {
    /// Set the tree rendered when the content fails.
    pub fn error_fallback(mut self, node: impl Into<ComponentNode>) -> Self {
        self.on_error = Some(ErrorFallback::Render(Box::new(node.into())));
        self
    }

    /// Set the error fallback policy.
    pub fn on_error(mut self, fallback: ErrorFallback) -> Self {
        self.on_error = Some(fallback);
        self
    }
}

impl fmt::Debug for SuspenseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspenseNode")
            .field("fallback", &self.fallback)
            .field("on_error", &self.on_error)
            .finish_non_exhaustive()
    }
}

/// A client component reference with server-rendered children.
#[derive(Debug)]
pub struct ClientNode {
    pub module: ClientModule,
    pub props: Map<String, Value>,
    pub children: Vec<ComponentNode>,
}

impl ClientNode {
    /// Add a prop.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Append a server-rendered child.
    pub fn child(mut self, child: impl Into<ComponentNode>) -> Self {
        self.children.push(child.into());
        self
    }
}

/// A node of the authoring tree.
#[derive(Debug)]
pub enum ComponentNode {
    Element(ElementNode),
    Text(String),
    Fragment(Vec<ComponentNode>),
    Suspense(SuspenseNode),
    Client(ClientNode),
    /// Head metadata declared at this point of the tree. Renders no markup.
    Head(SeoTag),
}

impl ComponentNode {
    /// Start an element.
    pub fn element(tag: impl Into<String>) -> ElementNode {
        ElementNode {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a fragment.
    pub fn fragment(children: impl IntoIterator<Item = ComponentNode>) -> Self {
        Self::Fragment(children.into_iter().collect())
    }

    /// Create a suspense boundary around async content.
    pub fn suspense<F>(fallback: impl Into<ComponentNode>, content: F) -> SuspenseNode
    where
        F: Future<Output = anyhow::Result<ComponentNode>> + 'static,
    {
        SuspenseNode {
            fallback: Box::new(fallback.into()),
            content: Box::pin(content),
            on_error: None,
        }
    }

    /// Reference a client component.
    pub fn client(module: ClientModule) -> ClientNode {
        ClientNode {
            module,
            props: Map::new(),
            children: Vec::new(),
        }
    }

    /// Declare a head tag.
    pub fn head(tag: SeoTag) -> Self {
        Self::Head(tag)
    }

    /// The kind of node, if it produces a node in the evaluated tree.
    pub fn kind(&self) -> Option<NodeKind> {
        match self {
            Self::Element(_) => Some(NodeKind::Element),
            Self::Text(_) => Some(NodeKind::Text),
            Self::Fragment(_) => Some(NodeKind::Fragment),
            Self::Suspense(_) => Some(NodeKind::SuspenseBoundary),
            Self::Client(_) => Some(NodeKind::Client),
            Self::Head(_) => None,
        }
    }
}

impl From<ElementNode> for ComponentNode {
    fn from(node: ElementNode) -> Self {
        Self::Element(node)
    }
}

impl From<SuspenseNode> for ComponentNode {
    fn from(node: SuspenseNode) -> Self {
        Self::Suspense(node)
    }
}

impl From<ClientNode> for ComponentNode {
    fn from(node: ClientNode) -> Self {
        Self::Client(node)
    }
}

impl From<&str> for ComponentNode {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ComponentNode {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<SeoTag> for ComponentNode {
    fn from(tag: SeoTag) -> Self {
        Self::Head(tag)
    }
}

/// Kind of an evaluated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    SuspenseBoundary,
    Text,
    Fragment,
    Client,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Element => "element",
            Self::SuspenseBoundary => "suspense-boundary",
            Self::Text => "text",
            Self::Fragment => "fragment",
            Self::Client => "client",
        }
    }
}

/// An evaluated node. `Boundary` marks content that is pending at the
/// time of evaluation; its resolution is tracked separately by id.
#[derive(Debug, Clone, PartialEq)]
pub enum MountedNode {
    Element {
        id: NodeId,
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<MountedNode>,
    },
    Text {
        id: NodeId,
        text: String,
    },
    Fragment {
        id: NodeId,
        children: Vec<MountedNode>,
    },
    Boundary {
        id: NodeId,
        fallback: Box<MountedNode>,
    },
    Client {
        id: NodeId,
        module: ClientModule,
        props: Map<String, Value>,
        children: Vec<MountedNode>,
    },
}

impl MountedNode {
    /// Stable id of this node.
    pub fn id(&self) -> NodeId {
        match self {
            Self::Element { id, .. }
            | Self::Text { id, .. }
            | Self::Fragment { id, .. }
            | Self::Boundary { id, .. }
            | Self::Client { id, .. } => *id,
        }
    }

    /// Kind of this node.
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Element { .. } => NodeKind::Element,
            Self::Text { .. } => NodeKind::Text,
            Self::Fragment { .. } => NodeKind::Fragment,
            Self::Boundary { .. } => NodeKind::SuspenseBoundary,
            Self::Client { .. } => NodeKind::Client,
        }
    }

    /// Ids of pending boundaries inside this subtree, in document order.
    /// Fallback subtrees are not searched.
    pub fn pending_boundaries(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_boundaries(&mut out);
        out
    }

    fn collect_boundaries(&self, out: &mut Vec<NodeId>) {
        match self {
            Self::Boundary { id, .. } => out.push(*id),
            Self::Text { .. } => {}
            Self::Element { children, .. }
            | Self::Fragment { children, .. }
            | Self::Client { children, .. } => {
                for child in children {
                    child.collect_boundaries(out);
                }
            }
        }
    }
}
