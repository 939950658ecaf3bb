//! Component tree evaluation.

use std::fmt;

use edge_core::{
    BoundaryFuture, ComponentNode, ErrorFallback, IdAllocator, MountedNode, NodeId, SeoTag,
};
use edge_executor::SuspenseBoundary;

/// A boundary whose content is waiting to be awaited.
pub struct ScheduledBoundary {
    pub boundary: SuspenseBoundary,
    pub content: BoundaryFuture,
    pub on_error: Option<ErrorFallback>,
}

impl fmt::Debug for ScheduledBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledBoundary")
            .field("boundary", &self.boundary)
            .field("on_error", &self.on_error)
            .finish_non_exhaustive()
    }
}

/// Result of evaluating one subtree.
#[derive(Debug)]
pub struct Evaluation {
    /// The evaluated tree. Pending boundaries appear as `MountedNode::Boundary`.
    pub node: MountedNode,
    /// Boundaries entered, in document order.
    pub scheduled: Vec<ScheduledBoundary>,
    /// Head tags declared outside fallbacks, in evaluation order.
    pub head: Vec<SeoTag>,
    /// Head tags declared inside fallbacks. Only meaningful when the
    /// fallback is actually sent.
    pub fallback_head: Vec<SeoTag>,
    /// Boundaries found inside fallbacks. Only their fallbacks render.
    pub discarded: usize,
}

/// Evaluate the root of a request.
///
/// The root is wrapped in a fragment that takes the first id, so the root
/// row of the side channel never shares an id with a boundary.
pub fn evaluate_root(root: ComponentNode, ids: &mut IdAllocator) -> Evaluation {
    let mut evaluator = Evaluator::new(ids, None);
    let id = evaluator.ids.next_id();
    let children = evaluator.eval(root).into_iter().collect();
    evaluator.finish(MountedNode::Fragment { id, children })
}

/// Evaluate resolved boundary content. Boundaries inside it are children of
/// `parent`.
pub fn evaluate(node: ComponentNode, ids: &mut IdAllocator, parent: NodeId) -> Evaluation {
    let mut evaluator = Evaluator::new(ids, Some(parent));
    let mounted = evaluator.eval(node);
    let mounted = mounted.unwrap_or_else(|| MountedNode::Fragment {
        id: evaluator.ids.next_id(),
        children: Vec::new(),
    });
    evaluator.finish(mounted)
}

/// Walks a tree depth-first in document order.
struct Evaluator<'a> {
    ids: &'a mut IdAllocator,
    parent: Option<NodeId>,
    in_fallback: bool,
    scheduled: Vec<ScheduledBoundary>,
    head: Vec<SeoTag>,
    fallback_head: Vec<SeoTag>,
    discarded: usize,
}

impl<'a> Evaluator<'a> {
    fn new(ids: &'a mut IdAllocator, parent: Option<NodeId>) -> Self {
        Self {
            ids,
            parent,
            in_fallback: false,
            scheduled: Vec::new(),
            head: Vec::new(),
            fallback_head: Vec::new(),
            discarded: 0,
        }
    }

    fn finish(self, node: MountedNode) -> Evaluation {
        Evaluation {
            node,
            scheduled: self.scheduled,
            head: self.head,
            fallback_head: self.fallback_head,
            discarded: self.discarded,
        }
    }

    fn eval(&mut self, node: ComponentNode) -> Option<MountedNode> {
        match node {
            ComponentNode::Head(tag) => {
                if self.in_fallback {
                    self.fallback_head.push(tag);
                } else {
                    self.head.push(tag);
                }
                None
            }
            ComponentNode::Text(text) => Some(MountedNode::Text {
                id: self.ids.next_id(),
                text,
            }),
            ComponentNode::Element(el) => {
                let id = self.ids.next_id();
                let children = self.eval_children(el.children);
                Some(MountedNode::Element {
                    id,
                    tag: el.tag,
                    attrs: el.attrs,
                    children,
                })
            }
            ComponentNode::Fragment(children) => {
                let id = self.ids.next_id();
                let children = self.eval_children(children);
                Some(MountedNode::Fragment { id, children })
            }
            ComponentNode::Client(client) => {
                let id = self.ids.next_id();
                let children = self.eval_children(client.children);
                Some(MountedNode::Client {
                    id,
                    module: client.module,
                    props: client.props,
                    children,
                })
            }
            ComponentNode::Suspense(suspense) => {
                if self.in_fallback {
                    // Content of a boundary inside a fallback is never shown.
                    self.discarded += 1;
                    return self.eval(*suspense.fallback);
                }

                let id = self.ids.next_id();
                self.in_fallback = true;
                let fallback = self.eval(*suspense.fallback);
                self.in_fallback = false;
                let fallback = fallback.unwrap_or_else(|| MountedNode::Fragment {
                    id: self.ids.next_id(),
                    children: Vec::new(),
                });

                let mut boundary = SuspenseBoundary::new(id, fallback.clone());
                if let Some(parent) = self.parent {
                    boundary = boundary.with_parent(parent);
                }
                self.scheduled.push(ScheduledBoundary {
                    boundary,
                    content: suspense.content,
                    on_error: suspense.on_error,
                });

                Some(MountedNode::Boundary {
                    id,
                    fallback: Box::new(fallback),
                })
            }
        }
    }

    fn eval_children(&mut self, children: Vec<ComponentNode>) -> Vec<MountedNode> {
        children
            .into_iter()
            .filter_map(|child| self.eval(child))
            .collect()
    }
}
