//! DOM access over html5ever's reference-counted tree
//!
//! The scanner, the range helpers and the annotation pass all work on a
//! `markup5ever_rcdom` tree. [`NodeExt`] gathers the handful of DOM operations they need
//! (navigation, attribute access, text extraction, insertion) behind one trait so the rest of
//! the crate reads like DOM code rather than like `RefCell` plumbing.
//!
//! Text offsets are counted in `char`s everywhere in this crate.
//!
//! Submodules:
//!
//!     range   Boundary points, ranges, comparison and content extraction
//!     walk    Tree walkers (filtered pre-order and linear enter/leave walks)

pub mod range;
pub mod walk;

use crate::error::{ParserError, ParserResult};
use html5ever::serialize::{SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{ns, serialize, Attribute, LocalName, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Attribute carrying the serialized item record.
pub const COMMENT_DATA_ATTR: &str = "data-mw-comment";
/// Attribute of the zero-width span opening an item's range.
pub const COMMENT_START_ATTR: &str = "data-mw-comment-start";
/// Attribute of the zero-width span closing an item's range.
pub const COMMENT_END_ATTR: &str = "data-mw-comment-end";
/// Class of the wrapper holding a comment's reply affordances.
pub const REPLY_BUTTONS_CLASS: &str = "dt-init-replylink-buttons";

// Elements which can't have element children (some may still hold text).
const NO_ELEMENT_CHILDREN: &[&str] = &[
    // void
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
    // raw text
    "script", "style",
    // escapable raw text
    "textarea", "title",
    // parsed as text when scripting is enabled
    "noscript",
];

static SOL_TRANSPARENT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)mw:PageProp/(?:Category|redirect|Language)(?:$|\s)")
        .expect("static regex")
});

/// DOM-style accessors for rcdom handles.
pub trait NodeExt {
    fn parent_node(&self) -> Option<Handle>;
    fn child_nodes(&self) -> Vec<Handle>;
    fn child_at(&self, index: usize) -> Option<Handle>;
    fn first_child(&self) -> Option<Handle>;
    fn last_child(&self) -> Option<Handle>;
    /// Position of this node in its parent's child list.
    fn child_index(&self) -> Option<usize>;
    fn previous_sibling(&self) -> Option<Handle>;
    fn next_sibling(&self) -> Option<Handle>;

    fn is_element(&self) -> bool;
    fn is_text(&self) -> bool;
    fn is_comment(&self) -> bool;
    /// Lower-case local name for elements.
    fn tag_name(&self) -> Option<&str>;
    fn has_tag(&self, tags: &[&str]) -> bool;
    fn attr(&self, name: &str) -> Option<String>;
    fn has_attr(&self, name: &str) -> bool;
    fn has_class(&self, class: &str) -> bool;

    /// Concatenated text of all descendant text nodes (the node's own data for text and
    /// comment nodes).
    fn text_content(&self) -> String;
    /// DOM "length": characters for character data, child count otherwise.
    fn node_length(&self) -> usize;

    fn same_node(&self, other: &Handle) -> bool;
    /// Inclusive ancestor check.
    fn contains_node(&self, other: &Handle) -> bool;
    /// Nearest inclusive ancestor element with one of the given tags.
    fn closest_element(&self, tags: &[&str]) -> Option<Handle>;
    /// Descendant elements with the given tag, in document order.
    fn elements_by_tag(&self, tag: &str) -> Vec<Handle>;

    fn set_attr(&self, name: &str, value: &str);
    fn insert_child(&self, index: usize, child: Handle);
    fn append_child(&self, child: Handle);
    fn insert_after(&self, node: Handle);
    fn detach(&self);
    /// Split a text node at `offset`, returning the new node holding the tail.
    fn split_text(&self, offset: usize) -> Option<Handle>;
}

impl NodeExt for Handle {
    fn parent_node(&self) -> Option<Handle> {
        let weak = self.parent.take()?;
        let parent = weak.upgrade();
        self.parent.set(Some(weak));
        parent
    }

    fn child_nodes(&self) -> Vec<Handle> {
        self.children.borrow().clone()
    }

    fn child_at(&self, index: usize) -> Option<Handle> {
        self.children.borrow().get(index).cloned()
    }

    fn first_child(&self) -> Option<Handle> {
        self.children.borrow().first().cloned()
    }

    fn last_child(&self) -> Option<Handle> {
        self.children.borrow().last().cloned()
    }

    fn child_index(&self) -> Option<usize> {
        let parent = self.parent_node()?;
        let index = parent
            .children
            .borrow()
            .iter()
            .position(|child| Rc::ptr_eq(child, self));
        index
    }

    fn previous_sibling(&self) -> Option<Handle> {
        let index = self.child_index()?;
        if index == 0 {
            return None;
        }
        self.parent_node()?.child_at(index - 1)
    }

    fn next_sibling(&self) -> Option<Handle> {
        let index = self.child_index()?;
        self.parent_node()?.child_at(index + 1)
    }

    fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element { .. })
    }

    fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text { .. })
    }

    fn is_comment(&self) -> bool {
        matches!(self.data, NodeData::Comment { .. })
    }

    fn tag_name(&self) -> Option<&str> {
        match &self.data {
            NodeData::Element { name, .. } => Some(&*name.local),
            _ => None,
        }
    }

    fn has_tag(&self, tags: &[&str]) -> bool {
        self.tag_name()
            .map(|tag| tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
            .unwrap_or(false)
    }

    fn attr(&self, name: &str) -> Option<String> {
        match &self.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .find(|attr| &*attr.name.local == name)
                .map(|attr| attr.value.to_string()),
            _ => None,
        }
    }

    fn has_attr(&self, name: &str) -> bool {
        match &self.data {
            NodeData::Element { attrs, .. } => {
                attrs.borrow().iter().any(|attr| &*attr.name.local == name)
            }
            _ => false,
        }
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|value| value.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    fn text_content(&self) -> String {
        match &self.data {
            NodeData::Text { contents } => contents.borrow().to_string(),
            NodeData::Comment { contents } => contents.to_string(),
            _ => {
                let mut text = String::new();
                collect_text(self, &mut text);
                text
            }
        }
    }

    fn node_length(&self) -> usize {
        match &self.data {
            NodeData::Text { contents } => contents.borrow().chars().count(),
            NodeData::Comment { contents } => contents.chars().count(),
            _ => self.children.borrow().len(),
        }
    }

    fn same_node(&self, other: &Handle) -> bool {
        Rc::ptr_eq(self, other)
    }

    fn contains_node(&self, other: &Handle) -> bool {
        let mut node = Some(other.clone());
        while let Some(current) = node {
            if Rc::ptr_eq(&current, self) {
                return true;
            }
            node = current.parent_node();
        }
        false
    }

    fn closest_element(&self, tags: &[&str]) -> Option<Handle> {
        let mut node = Some(self.clone());
        while let Some(current) = node {
            if current.has_tag(tags) {
                return Some(current);
            }
            node = current.parent_node();
        }
        None
    }

    fn elements_by_tag(&self, tag: &str) -> Vec<Handle> {
        descendants(self)
            .into_iter()
            .filter(|node| node.has_tag(&[tag]))
            .collect()
    }

    fn set_attr(&self, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &self.data {
            let mut attrs = attrs.borrow_mut();
            match attrs.iter_mut().find(|attr| &*attr.name.local == name) {
                Some(attr) => attr.value = value.to_string().into(),
                None => attrs.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(name)),
                    value: value.to_string().into(),
                }),
            }
        }
    }

    fn insert_child(&self, index: usize, child: Handle) {
        child.detach();
        child.parent.set(Some(Rc::downgrade(self)));
        let mut children = self.children.borrow_mut();
        let index = index.min(children.len());
        children.insert(index, child);
    }

    fn append_child(&self, child: Handle) {
        let len = self.children.borrow().len();
        self.insert_child(len, child);
    }

    fn insert_after(&self, node: Handle) {
        if let (Some(parent), Some(index)) = (self.parent_node(), self.child_index()) {
            parent.insert_child(index + 1, node);
        }
    }

    fn detach(&self) {
        if let Some(parent) = self.parent_node() {
            parent
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(child, self));
        }
        self.parent.set(None);
    }

    fn split_text(&self, offset: usize) -> Option<Handle> {
        let NodeData::Text { contents } = &self.data else {
            return None;
        };
        let text = contents.borrow().to_string();
        let at = char_to_byte(&text, offset);
        let tail = create_text(&text[at..]);
        *contents.borrow_mut() = text[..at].to_string().into();
        self.insert_after(tail.clone());
        Some(tail)
    }
}

fn collect_text(node: &Handle, out: &mut String) {
    for child in node.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            NodeData::Element { .. } => collect_text(child, out),
            _ => {}
        }
    }
}

/// Byte index of the `offset`-th char, clamped to the end of the string.
pub fn char_to_byte(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

/// All descendants of `node` in document order, excluding `node` itself.
pub fn descendants(node: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    let mut stack: Vec<Handle> = node.children.borrow().iter().rev().cloned().collect();
    while let Some(current) = stack.pop() {
        stack.extend(current.children.borrow().iter().rev().cloned());
        out.push(current);
    }
    out
}

/// Number of enclosing list items (`li`/`dd`) between `node` and `root`.
pub fn indent_level(node: &Handle, root: &Handle) -> usize {
    let mut indent = 0;
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if n.same_node(root) {
            break;
        }
        if n.has_tag(&["li", "dd"]) {
            indent += 1;
        }
        current = n.parent_node();
    }
    indent
}

/// Trim ASCII whitespace as defined by the HTML standard.
pub fn html_trim(text: &str) -> &str {
    text.trim_matches(|c| matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' '))
}

pub fn cant_have_element_children(node: &Handle) -> bool {
    node.is_comment() || node.has_tag(NO_ELEMENT_CHILDREN)
}

/// Line breaks, rules and outdent templates separate comments rather than belong to them.
pub fn is_comment_separator(node: &Handle) -> bool {
    node.is_element() && (node.has_tag(&["br", "hr"]) || node.has_class("outdent-template"))
}

/// Nodes Parsoid treats as invisible: comments, metadata and empty tracking transclusions.
pub fn is_rendering_transparent(node: &Handle) -> bool {
    if node.is_comment() {
        return true;
    }
    if !node.is_element() {
        return false;
    }
    if node.has_tag(&["meta"]) {
        return true;
    }
    if node.has_tag(&["link"]) {
        return SOL_TRANSPARENT_LINK.is_match(&node.attr("rel").unwrap_or_default());
    }
    if node.has_tag(&["span"]) && has_typeof(node, "mw:Transclusion") {
        let empty = inner_html(node)
            .map(|html| html_trim(&html).is_empty())
            .unwrap_or(false);
        let grouped_with_next = node
            .next_sibling()
            .filter(|next| next.is_element())
            .map(|next| next.attr("about") == node.attr("about"))
            .unwrap_or(false);
        return empty && !grouped_with_next;
    }
    false
}

/// Marker and affordance nodes inserted by the annotation pass.
pub fn is_our_generated_node(node: &Handle) -> bool {
    node.is_element()
        && (node.has_class(REPLY_BUTTONS_CLASS)
            || node.has_attr(COMMENT_DATA_ATTR)
            || node.has_attr(COMMENT_START_ATTR)
            || node.has_attr(COMMENT_END_ATTR))
}

/// Leaf nodes that count as comment content: visible text, or elements that can't hold
/// element children (images, line breaks and similar).
pub fn is_comment_content(node: &Handle) -> bool {
    (node.is_text() && !html_trim(&node.text_content()).is_empty())
        || cant_have_element_children(node)
}

pub(crate) fn has_typeof(node: &Handle, value: &str) -> bool {
    node.attr("typeof")
        .map(|t| t.split(' ').any(|part| part == value))
        .unwrap_or(false)
}

/// Create a detached HTML element.
pub fn create_element(tag: &str, attrs: &[(&str, &str)]) -> Handle {
    let attributes = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: value.to_string().into(),
        })
        .collect();

    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: QualName::new(None, ns!(html), LocalName::from(tag)),
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

pub fn create_text(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        },
    })
}

pub fn create_comment(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Comment {
            contents: text.to_string().into(),
        },
    })
}

/// Copy a node without its children.
pub fn shallow_clone(node: &Handle) -> Handle {
    let data = match &node.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            name,
            attrs,
            mathml_annotation_xml_integration_point,
            ..
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            }
        }
    };
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data,
    })
}

pub fn deep_clone(node: &Handle) -> Handle {
    let copy = shallow_clone(node);
    for child in node.children.borrow().iter() {
        copy.append_child(deep_clone(child));
    }
    copy
}

/// Parse a full HTML document (fragments get the usual html/head/body wrapping).
pub fn parse_html(html: &str) -> RcDom {
    html5ever::parse_document(RcDom::default(), Default::default()).one(html)
}

/// Locate the element comments are detected in: the element with the given id, or `<body>`.
pub fn find_container(dom: &RcDom, id: Option<&str>) -> ParserResult<Handle> {
    let found = descendants(&dom.document).into_iter().find(|node| match id {
        Some(id) => node.is_element() && node.attr("id").as_deref() == Some(id),
        None => node.has_tag(&["body"]),
    });
    found.ok_or_else(|| ParserError::MissingContainer(id.unwrap_or("body").to_string()))
}

/// Parse `html` and take out its container, detached from the document.
///
/// Dropping an `RcDom` clears the child lists of every node in it, even of nodes still
/// referenced elsewhere, so a container that outlives its document must be detached first.
pub fn parse_container(html: &str, id: Option<&str>) -> ParserResult<Handle> {
    let dom = parse_html(html);
    let container = find_container(&dom, id)?;
    container.detach();
    Ok(container)
}

/// Topmost ancestor of `node` (the document, or the root of a detached subtree).
pub fn tree_root(node: &Handle) -> Handle {
    let mut root = node.clone();
    while let Some(parent) = root.parent_node() {
        root = parent;
    }
    root
}

/// Serialize the children of `node`.
pub fn inner_html(node: &Handle) -> ParserResult<String> {
    serialize_with(node, TraversalScope::ChildrenOnly(None))
}

/// Serialize `node` itself, including its children.
pub fn outer_html(node: &Handle) -> ParserResult<String> {
    if matches!(node.data, NodeData::Document) {
        return inner_html(node);
    }
    serialize_with(node, TraversalScope::IncludeNode)
}

fn serialize_with(node: &Handle, scope: TraversalScope) -> ParserResult<String> {
    let mut output = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: scope,
        ..Default::default()
    };
    serialize(&mut output, &SerializableHandle::from(node.clone()), opts)
        .map_err(|e| ParserError::Serialization(e.to_string()))?;
    String::from_utf8(output).map_err(|e| ParserError::Serialization(e.to_string()))
}
