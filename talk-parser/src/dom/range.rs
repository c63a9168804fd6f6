//! Boundary points and ranges over the rcdom tree
//!
//! Ranges here are plain data: a pair of (node, offset) boundary points. Unlike live DOM ranges
//! they do not follow mutations, so code that mutates the tree must order its insertions so that
//! boundaries computed beforehand stay valid (see the annotation pass in `talk-tools`).
//!
//! Offsets follow DOM conventions: for text and comment nodes they count characters, for every
//! other node they count children.
//!
//! Boundary comparison uses tree paths. A boundary `(node, offset)` is keyed by the child
//! indices leading from the document to `node`, followed by `offset`; comparing keys
//! lexicographically (a strict prefix sorts first) gives document order.

use super::walk::{linear_walk, WalkEvent};
use super::{
    cant_have_element_children, deep_clone, is_comment_content, is_comment_separator,
    is_our_generated_node, is_rendering_transparent, outer_html, shallow_clone, NodeExt,
};
use crate::dom::create_text;
use crate::error::{ParserError, ParserResult};
use markup5ever_rcdom::Handle;
use std::cmp::Ordering;
use std::fmt;

#[derive(Clone)]
pub struct BoundaryPoint {
    pub node: Handle,
    pub offset: usize,
}

impl BoundaryPoint {
    pub fn new(node: Handle, offset: usize) -> Self {
        Self { node, offset }
    }

    /// The point just before `node` in its parent.
    pub fn before(node: &Handle) -> Option<Self> {
        Some(Self::new(node.parent_node()?, node.child_index()?))
    }

    /// The point just after `node` in its parent.
    pub fn after(node: &Handle) -> Option<Self> {
        Some(Self::new(node.parent_node()?, node.child_index()? + 1))
    }

    pub fn same_as(&self, other: &BoundaryPoint) -> bool {
        self.node.same_node(&other.node) && self.offset == other.offset
    }

    fn key(&self) -> Vec<usize> {
        let mut key = tree_path(&self.node);
        key.push(self.offset);
        key
    }
}

impl fmt::Debug for BoundaryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.node.tag_name() {
            Some(tag) => tag.to_string(),
            None if self.node.is_text() => "#text".to_string(),
            None if self.node.is_comment() => "#comment".to_string(),
            None => "#node".to_string(),
        };
        write!(f, "{}@{}", name, self.offset)
    }
}

/// Compare two boundary points in document order.
pub fn compare_points(a: &BoundaryPoint, b: &BoundaryPoint) -> Ordering {
    if a.node.same_node(&b.node) {
        return a.offset.cmp(&b.offset);
    }
    a.key().cmp(&b.key())
}

/// Child indices from the top of the tree down to `node`.
pub fn tree_path(node: &Handle) -> Vec<usize> {
    let mut path = Vec::new();
    let mut current = node.clone();
    while let Some(parent) = current.parent_node() {
        path.push(current.child_index().unwrap_or(0));
        current = parent;
    }
    path.reverse();
    path
}

#[derive(Clone, Debug)]
pub struct DomRange {
    pub start: BoundaryPoint,
    pub end: BoundaryPoint,
}

/// How range A relates to range B.
///
/// ```text
///          [    equal    ]
///          |[ contained ]|
///        [ |  contains   | ]
///  [overlap|start]       |
///          |     [overlap|end]
/// [before] |             |
///          |             | [after]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRelation {
    Equal,
    Contains,
    Contained,
    Before,
    After,
    OverlapStart,
    OverlapEnd,
}

impl DomRange {
    pub fn new(start: BoundaryPoint, end: BoundaryPoint) -> Self {
        Self { start, end }
    }

    /// Collapsed range at a single point.
    pub fn collapsed(point: BoundaryPoint) -> Self {
        Self {
            start: point.clone(),
            end: point,
        }
    }

    /// Range spanning the whole of `node` from outside.
    pub fn around(node: &Handle) -> Option<Self> {
        Some(Self::new(
            BoundaryPoint::before(node)?,
            BoundaryPoint::after(node)?,
        ))
    }

    /// Range spanning the contents of `node`.
    pub fn contents_of(node: &Handle) -> Self {
        Self::new(
            BoundaryPoint::new(node.clone(), 0),
            BoundaryPoint::new(node.clone(), node.node_length()),
        )
    }

    pub fn is_collapsed(&self) -> bool {
        self.start.same_as(&self.end)
    }

    /// Deepest node containing both boundaries.
    pub fn common_ancestor(&self) -> Handle {
        let mut ancestor = self.start.node.clone();
        loop {
            if ancestor.contains_node(&self.end.node) {
                return ancestor;
            }
            match ancestor.parent_node() {
                Some(parent) => ancestor = parent,
                None => return ancestor,
            }
        }
    }

    /// Children of the common ancestor that contain part of this range.
    pub fn covered_siblings(&self) -> Vec<Handle> {
        let ancestor = self.common_ancestor();
        let siblings = ancestor.child_nodes();
        if siblings.is_empty() {
            return Vec::new();
        }

        let start = if ancestor.same_node(&self.start.node) {
            self.start.offset
        } else {
            siblings
                .iter()
                .position(|s| s.contains_node(&self.start.node))
                .unwrap_or(0)
        };
        let end = if ancestor.same_node(&self.end.node) {
            match self.end.offset.checked_sub(1) {
                Some(end) => end,
                None => return Vec::new(),
            }
        } else {
            siblings
                .iter()
                .rposition(|s| s.contains_node(&self.end.node))
                .unwrap_or(siblings.len() - 1)
        };

        if start > end || start >= siblings.len() {
            return Vec::new();
        }
        siblings[start..=end.min(siblings.len() - 1)].to_vec()
    }

    /// The nodes that contain this range and nothing else, climbing to the outermost such
    /// node below `root` when a single sibling covers it exactly.
    pub fn fully_covered_siblings(&self, root: &Handle) -> Option<Vec<Handle>> {
        let mut siblings = self.covered_siblings();
        let first = siblings.first()?.clone();
        let last = siblings.last()?.clone();
        let covering = DomRange::new(BoundaryPoint::before(&first)?, BoundaryPoint::after(&last)?);
        if covering.compare(self) != RangeRelation::Equal {
            return None;
        }
        while let Some(parent) = siblings[0].parent_node() {
            if parent.same_node(root) {
                break;
            }
            match DomRange::around(&parent) {
                Some(around) if around.compare(self) == RangeRelation::Equal => {
                    siblings = vec![parent];
                }
                _ => break,
            }
        }
        Some(siblings)
    }

    /// The single element wrapping exactly this range, if there is one.
    pub fn fully_covered_wrapper(&self, root: &Handle) -> Option<Handle> {
        let siblings = self.fully_covered_siblings(root)?;
        match siblings.as_slice() {
            [only] if only.is_element() => Some(only.clone()),
            _ => None,
        }
    }

    /// Compare this range (A) with `other` (B), treating boundaries that only differ by
    /// separators, rendering-transparent nodes or our own markers as equal.
    pub fn compare(&self, other: &DomRange) -> RangeRelation {
        let mut start_to_start = compare_points(&self.start, &other.start);
        let start_to_end = compare_points(&self.start, &other.end);
        let end_to_start = compare_points(&self.end, &other.start);
        let mut end_to_end = compare_points(&self.end, &other.end);

        if (start_to_start == Ordering::Less && almost_equal_boundaries(self, other, Edge::Start))
            || (start_to_start == Ordering::Greater
                && almost_equal_boundaries(other, self, Edge::Start))
        {
            start_to_start = Ordering::Equal;
        }
        if (end_to_end == Ordering::Less && almost_equal_boundaries(self, other, Edge::End))
            || (end_to_end == Ordering::Greater && almost_equal_boundaries(other, self, Edge::End))
        {
            end_to_end = Ordering::Equal;
        }

        use Ordering::*;
        match (start_to_start, end_to_end) {
            (Equal, Equal) => RangeRelation::Equal,
            (Less | Equal, Greater | Equal) => RangeRelation::Contains,
            (Greater | Equal, Less | Equal) => RangeRelation::Contained,
            _ if start_to_end != Less => RangeRelation::After,
            _ if end_to_start != Greater => RangeRelation::Before,
            (Greater, _) => RangeRelation::OverlapStart,
            _ => RangeRelation::OverlapEnd,
        }
    }

    fn first_node(&self) -> Handle {
        if self.start.node.node_length() > 0 && !self.start.node.is_text() {
            if let Some(child) = self.start.node.child_at(self.start.offset) {
                return child;
            }
        }
        self.start.node.clone()
    }

    fn last_node(&self) -> Handle {
        if self.end.node.node_length() > 0 && !self.end.node.is_text() {
            if let Some(child) = self
                .end
                .offset
                .checked_sub(1)
                .and_then(|index| self.end.node.child_at(index))
            {
                return child;
            }
        }
        self.end.node.clone()
    }

    /// Detached copies of everything inside the range, partially selected nodes trimmed.
    pub fn clone_contents(&self) -> Vec<Handle> {
        if self.start.node.same_node(&self.end.node)
            && (self.start.node.is_text() || self.start.node.is_comment())
        {
            let text = slice_chars(&self.start.node.text_content(), self.start.offset, self.end.offset);
            return vec![create_text(&text)];
        }
        let ancestor = self.common_ancestor();
        clone_children(&ancestor, Some(&self.start), Some(&self.end))
    }

    /// Text content of the range.
    pub fn text(&self) -> String {
        self.clone_contents()
            .iter()
            .map(|node| node.text_content())
            .collect()
    }

    /// Serialized HTML of the range.
    pub fn html(&self) -> ParserResult<String> {
        let mut html = String::new();
        for node in self.clone_contents() {
            html.push_str(&outer_html(&node)?);
        }
        Ok(html)
    }

    /// Move boundaries that sit inside nodes unable to hold elements (void, raw text and
    /// comment nodes) outward until markers can be inserted at them.
    pub fn widen_out_of_childless(&self) -> DomRange {
        let mut range = self.clone();
        while cant_have_element_children(&range.start.node) {
            match BoundaryPoint::before(&range.start.node) {
                Some(point) => range.start = point,
                None => break,
            }
        }
        while cant_have_element_children(&range.end.node) {
            match BoundaryPoint::after(&range.end.node) {
                Some(point) => range.end = point,
                None => break,
            }
        }
        range
    }
}

/// Insert `node` at `point`, splitting a text node when the point falls inside one.
pub fn insert_node(point: &BoundaryPoint, node: Handle) -> ParserResult<()> {
    if point.node.is_text() {
        let parent = point
            .node
            .parent_node()
            .ok_or_else(|| ParserError::UnresolvableBoundary("detached text node".to_string()))?;
        let index = point.node.child_index().unwrap_or(0);
        let length = point.node.node_length();
        if point.offset == 0 {
            parent.insert_child(index, node);
        } else if point.offset >= length {
            parent.insert_child(index + 1, node);
        } else {
            point.node.split_text(point.offset);
            parent.insert_child(index + 1, node);
        }
        return Ok(());
    }
    if cant_have_element_children(&point.node) {
        return Err(ParserError::UnresolvableBoundary(format!(
            "cannot insert into {:?}",
            point
        )));
    }
    point.node.insert_child(point.offset, node);
    Ok(())
}

/// Render a boundary as a `/`-separated path of child indices from `root`, ending with the
/// offset (e.g. `"1/0/3"`).
pub fn offset_path(root: &Handle, point: &BoundaryPoint) -> ParserResult<String> {
    let mut parts = vec![point.offset.to_string()];
    let mut node = point.node.clone();
    while !node.same_node(root) {
        let index = node.child_index().ok_or_else(|| {
            ParserError::UnresolvableBoundary(format!("{:?} is outside the container", point))
        })?;
        parts.push(index.to_string());
        node = node.parent_node().ok_or_else(|| {
            ParserError::UnresolvableBoundary(format!("{:?} is outside the container", point))
        })?;
    }
    parts.reverse();
    Ok(parts.join("/"))
}

/// Inverse of [`offset_path`].
pub fn resolve_offset_path(root: &Handle, path: &str) -> ParserResult<BoundaryPoint> {
    let invalid = || ParserError::UnresolvableBoundary(format!("bad offset path `{}`", path));
    let indices = path
        .split('/')
        .map(|part| part.parse::<usize>().map_err(|_| invalid()))
        .collect::<ParserResult<Vec<_>>>()?;
    let (offset, steps) = indices.split_last().ok_or_else(invalid)?;
    let mut node = root.clone();
    for index in steps {
        node = node.child_at(*index).ok_or_else(invalid)?;
    }
    if *offset > node.node_length() {
        return Err(invalid());
    }
    Ok(BoundaryPoint::new(node, *offset))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Edge {
    Start,
    End,
}

/// Whether boundary `edge` of A (which precedes the same boundary of B) only differs from B's
/// by uninteresting nodes.
fn almost_equal_boundaries(a: &DomRange, b: &DomRange, edge: Edge) -> bool {
    let from = match edge {
        Edge::End => a.last_node(),
        Edge::Start => a.first_node(),
    };
    let to = match edge {
        Edge::End => b.last_node(),
        Edge::Start => b.first_node(),
    };
    let target_event = match edge {
        Edge::End => WalkEvent::Leave,
        Edge::Start => WalkEvent::Enter,
    };

    let mut skip: Option<Handle> = if edge == Edge::End { Some(from.clone()) } else { None };
    let mut found_content = false;
    linear_walk(&from, |event, node| {
        if node.same_node(&to) && event == target_event {
            return true;
        }
        if let Some(skipped) = &skip {
            if node.same_node(skipped) && event == WalkEvent::Leave {
                skip = None;
            }
            return false;
        }
        if event == WalkEvent::Enter {
            if is_comment_separator(node) || is_rendering_transparent(node) || is_our_generated_node(node) {
                skip = Some(node.clone());
            } else if is_comment_content(node) {
                found_content = true;
                return true;
            }
        }
        false
    });
    !found_content
}

fn slice_chars(text: &str, start: usize, end: usize) -> String {
    text.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

/// Clone the part of `parent`'s children lying between the optional boundaries.
fn clone_children(
    parent: &Handle,
    start: Option<&BoundaryPoint>,
    end: Option<&BoundaryPoint>,
) -> Vec<Handle> {
    if parent.is_text() || parent.is_comment() {
        let text = parent.text_content();
        let from = start.filter(|s| s.node.same_node(parent)).map(|s| s.offset).unwrap_or(0);
        let to = end
            .filter(|e| e.node.same_node(parent))
            .map(|e| e.offset)
            .unwrap_or_else(|| parent.node_length());
        return vec![create_text(&slice_chars(&text, from, to))];
    }

    let children = parent.child_nodes();
    let first = match start {
        Some(s) if s.node.same_node(parent) => s.offset,
        Some(s) => match children.iter().position(|c| c.contains_node(&s.node)) {
            Some(index) => index,
            None => return Vec::new(),
        },
        None => 0,
    };
    let last = match end {
        Some(e) if e.node.same_node(parent) => e.offset,
        Some(e) => match children.iter().position(|c| c.contains_node(&e.node)) {
            Some(index) => index + 1,
            None => return Vec::new(),
        },
        None => children.len(),
    };

    let mut out = Vec::new();
    for child in children.iter().take(last.min(children.len())).skip(first) {
        let inner_start = start.filter(|s| !s.node.same_node(parent) && child.contains_node(&s.node));
        let inner_end = end.filter(|e| !e.node.same_node(parent) && child.contains_node(&e.node));
        if inner_start.is_none() && inner_end.is_none() {
            out.push(deep_clone(child));
        } else if child.is_text() || child.is_comment() {
            out.extend(clone_children(child, inner_start, inner_end));
        } else {
            let copy = shallow_clone(child);
            for grandchild in clone_children(child, inner_start, inner_end) {
                copy.append_child(grandchild);
            }
            out.push(copy);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{create_element, inner_html, parse_container};

    fn body(html: &str) -> Handle {
        parse_container(html, None).unwrap()
    }

    #[test]
    fn orders_boundaries_by_tree_position() {
        let body = body("<p>a<b>b</b>c</p><p>d</p>");
        let p1 = body.child_at(0).unwrap();
        let p2 = body.child_at(1).unwrap();
        let b = p1.child_at(1).unwrap();

        let before_b = BoundaryPoint::new(p1.clone(), 1);
        let inside_b = BoundaryPoint::new(b.clone(), 0);
        let after_b = BoundaryPoint::new(p1.clone(), 2);
        let in_p2 = BoundaryPoint::new(p2, 0);

        assert_eq!(compare_points(&before_b, &inside_b), Ordering::Less);
        assert_eq!(compare_points(&inside_b, &after_b), Ordering::Less);
        assert_eq!(compare_points(&after_b, &in_p2), Ordering::Less);
        assert_eq!(compare_points(&in_p2, &before_b), Ordering::Greater);
    }

    #[test]
    fn offset_paths_resolve_back() {
        let body = body("<p>a<b>bold</b></p>");
        let bold_text = body.child_at(0).unwrap().child_at(1).unwrap().child_at(0).unwrap();
        let point = BoundaryPoint::new(bold_text.clone(), 2);
        let path = offset_path(&body, &point).unwrap();
        assert_eq!(path, "0/1/0/2");
        let resolved = resolve_offset_path(&body, &path).unwrap();
        assert!(resolved.same_as(&point));
        assert!(resolve_offset_path(&body, "0/7/1").is_err());
    }

    #[test]
    fn extracts_partial_text_and_html() {
        let body = body("<p>Hello <b>bold</b> world</p>");
        let p = body.child_at(0).unwrap();
        let hello = p.child_at(0).unwrap();
        let world = p.child_at(2).unwrap();
        let range = DomRange::new(BoundaryPoint::new(hello, 2), BoundaryPoint::new(world, 2));
        assert_eq!(range.text(), "llo bold w");
        assert_eq!(range.html().unwrap(), "llo <b>bold</b> w");
    }

    #[test]
    fn inserting_inside_text_splits_it() {
        let body = body("<p>abcdef</p>");
        let p = body.child_at(0).unwrap();
        let text = p.child_at(0).unwrap();
        insert_node(&BoundaryPoint::new(text, 3), create_element("span", &[])).unwrap();
        assert_eq!(inner_html(&p).unwrap(), "abc<span></span>def");
    }

    #[test]
    fn ranges_differing_by_separators_compare_equal() {
        let body = body("<p>text</p><p><br></p>");
        let p = body.child_at(0).unwrap();
        let exact = DomRange::around(&p).unwrap();
        let with_break = DomRange::new(
            BoundaryPoint::new(body.clone(), 0),
            BoundaryPoint::new(body.clone(), 2),
        );
        assert_eq!(exact.compare(&exact), RangeRelation::Equal);
        assert_eq!(with_break.compare(&exact), RangeRelation::Equal);
        assert_eq!(exact.compare(&with_break), RangeRelation::Equal);
    }

    #[test]
    fn ranges_with_more_content_contain() {
        let body = body("<p>text</p><p>more</p>");
        let p = body.child_at(0).unwrap();
        let exact = DomRange::around(&p).unwrap();
        let both = DomRange::new(
            BoundaryPoint::new(body.clone(), 0),
            BoundaryPoint::new(body.clone(), 2),
        );
        assert_eq!(both.compare(&exact), RangeRelation::Contains);
        assert_eq!(exact.compare(&both), RangeRelation::Contained);
        let second = DomRange::around(&body.child_at(1).unwrap()).unwrap();
        assert_eq!(exact.compare(&second), RangeRelation::Before);
        assert_eq!(second.compare(&exact), RangeRelation::After);
    }

    #[test]
    fn finds_fully_covering_wrapper() {
        let body = body("<ul><li>only <a>link</a></li></ul>");
        let li = body.child_at(0).unwrap().child_at(0).unwrap();
        let range = DomRange::contents_of(&li);
        let wrapper = range.fully_covered_wrapper(&body).unwrap();
        assert_eq!(wrapper.tag_name(), Some("ul"));
    }

    #[test]
    fn widens_boundaries_out_of_void_elements() {
        let body = body("<p>a<img>b</p>");
        let p = body.child_at(0).unwrap();
        let img = p.child_at(1).unwrap();
        let range = DomRange::new(BoundaryPoint::new(img.clone(), 0), BoundaryPoint::new(img, 0));
        let widened = range.widen_out_of_childless();
        assert!(widened.start.same_as(&BoundaryPoint::new(p.clone(), 1)));
        assert!(widened.end.same_as(&BoundaryPoint::new(p, 2)));
    }
}
