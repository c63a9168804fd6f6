//! Tree walking
//!
//! Two walkers cover everything the scanner needs:
//!
//!     TreeWalker     Filtered pre-order iteration below a root, where the filter can accept a
//!                    node, skip it (but visit its children) or reject it with its subtree.
//!     linear_walk    Enter/leave events in document order starting at a node, continuing past
//!                    its subtree until the callback stops it.

use super::{html_trim, NodeExt};
use markup5ever_rcdom::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    Accept,
    Skip,
    Reject,
}

/// Pre-order walker over the descendants of `root`, starting after `current`.
pub struct TreeWalker<F>
where
    F: FnMut(&Handle) -> FilterResult,
{
    root: Handle,
    current: Handle,
    filter: F,
}

impl<F> TreeWalker<F>
where
    F: FnMut(&Handle) -> FilterResult,
{
    pub fn new(root: Handle, filter: F) -> Self {
        Self {
            current: root.clone(),
            root,
            filter,
        }
    }

    /// Continue the walk from `node` rather than from the root.
    pub fn starting_at(mut self, node: Handle) -> Self {
        self.current = node;
        self
    }
}

impl<F> Iterator for TreeWalker<F>
where
    F: FnMut(&Handle) -> FilterResult,
{
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        let mut node = self.current.clone();
        let mut result = FilterResult::Accept;
        loop {
            while result != FilterResult::Reject {
                let Some(child) = node.first_child() else {
                    break;
                };
                node = child;
                result = (self.filter)(&node);
                if result == FilterResult::Accept {
                    self.current = node.clone();
                    return Some(node);
                }
            }

            let mut temp = node.clone();
            loop {
                if temp.same_node(&self.root) {
                    return None;
                }
                if let Some(sibling) = temp.next_sibling() {
                    node = sibling;
                    break;
                }
                temp = temp.parent_node()?;
            }

            result = (self.filter)(&node);
            if result == FilterResult::Accept {
                self.current = node.clone();
                return Some(node);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEvent {
    Enter,
    Leave,
}

/// Walk forward from `node` emitting enter/leave events, as if reading the markup token by
/// token. Stops when `callback` returns true or the document ends; returns whether it was
/// stopped.
pub fn linear_walk<F>(node: &Handle, mut callback: F) -> bool
where
    F: FnMut(WalkEvent, &Handle) -> bool,
{
    let mut within = node.parent_node();
    let mut before = Some(node.clone());
    loop {
        if let Some(current) = before.take() {
            if callback(WalkEvent::Enter, &current) {
                return true;
            }
            before = current.first_child();
            within = Some(current);
        } else if let Some(current) = within.take() {
            if callback(WalkEvent::Leave, &current) {
                return true;
            }
            before = current.next_sibling();
            within = current.parent_node();
        } else {
            return false;
        }
    }
}

/// Like [`linear_walk`], but backwards through the document.
pub fn linear_walk_backwards<F>(node: &Handle, mut callback: F) -> bool
where
    F: FnMut(WalkEvent, &Handle) -> bool,
{
    let mut within = node.parent_node();
    let mut before = Some(node.clone());
    loop {
        if let Some(current) = before.take() {
            if callback(WalkEvent::Enter, &current) {
                return true;
            }
            before = current.last_child();
            within = Some(current);
        } else if let Some(current) = within.take() {
            if callback(WalkEvent::Leave, &current) {
                return true;
            }
            before = current.previous_sibling();
            within = current.parent_node();
        } else {
            return false;
        }
    }
}

/// The next leaf after `node` (ignoring `node`'s own subtree unless it is `root`) that is a
/// non-whitespace text node or an element without children.
pub fn next_interesting_leaf(node: &Handle, root: &Handle) -> Option<Handle> {
    let skip_own = !node.same_node(root);
    let start = node.clone();
    let filter = move |n: &Handle| {
        if skip_own {
            let child_of_start = n.parent_node().map(|p| p.same_node(&start)).unwrap_or(false);
            if n.same_node(&start) || child_of_start {
                return FilterResult::Reject;
            }
        }
        let interesting = (n.is_text() && !html_trim(&n.text_content()).is_empty())
            || (n.is_element() && n.first_child().is_none());
        if interesting {
            FilterResult::Accept
        } else {
            FilterResult::Skip
        }
    };
    TreeWalker::new(root.clone(), filter)
        .starting_at(node.clone())
        .next()
}
