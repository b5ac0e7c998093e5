//! Owned markup tree with sibling/parent navigation.
//!
//! Article bodies arrive as HTML. The classifier only needs a handful of
//! navigation capabilities (previous/next sibling, parent, children, text),
//! so it is written against the [`MarkupNode`] trait instead of a particular
//! HTML library. [`parse_html`] builds a [`MarkupTree`] from `scraper`'s DOM
//! once; everything after that walks the owned tree.

use scraper::{ElementRef, Html};

/// Navigation capabilities over one node of a markup tree.
///
/// Sibling and child accessors include text nodes, mirroring how the markup
/// was written. The `*_element_*` helpers skip them.
pub trait MarkupNode<'a>: Copy + 'a {
    fn parent(self) -> Option<Self>;
    fn previous_sibling(self) -> Option<Self>;
    fn next_sibling(self) -> Option<Self>;
    fn children(self) -> Vec<Self>;
    /// Tag name for elements, `None` for text nodes.
    fn tag(self) -> Option<&'a str>;
    fn attr(self, name: &str) -> Option<&'a str>;
    /// Own text for text nodes, concatenated descendant text for elements.
    fn text(self) -> String;

    fn is_element(self) -> bool {
        self.tag().is_some()
    }

    fn has_class(self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Siblings before this node, nearest first.
    fn previous_siblings(self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut cur = self.previous_sibling();
        while let Some(node) = cur {
            out.push(node);
            cur = node.previous_sibling();
        }
        out
    }

    fn next_element_sibling(self) -> Option<Self> {
        let mut cur = self.next_sibling();
        while let Some(node) = cur {
            if node.is_element() {
                return Some(node);
            }
            cur = node.next_sibling();
        }
        None
    }

    /// All descendants in document order, excluding `self`.
    fn descendants(self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut stack: Vec<Self> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children().into_iter().rev());
        }
        out
    }

    /// Descendant elements with the given tag name, in document order.
    fn find_all(self, tag: &str) -> Vec<Self> {
        self.descendants()
            .into_iter()
            .filter(|n| n.tag().is_some_and(|t| t.eq_ignore_ascii_case(tag)))
            .collect()
    }

    /// Descendant elements carrying the given class, in document order.
    fn find_all_with_class(self, class: &str) -> Vec<Self> {
        self.descendants()
            .into_iter()
            .filter(|n| n.has_class(class))
            .collect()
    }

    /// The single string this node reduces to.
    ///
    /// A text node is its own string; an element with exactly one child
    /// reduces to that child's string; anything else has none.
    fn string(self) -> Option<String> {
        if !self.is_element() {
            return Some(self.text());
        }
        match self.children().as_slice() {
            [only] => only.string(),
            _ => None,
        }
    }
}

/// Index of a node inside its [`MarkupTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed markup tree.
#[derive(Debug, Clone, Default)]
pub struct MarkupTree {
    slots: Vec<Slot>,
}

impl MarkupTree {
    /// Add an element under `parent` (or as a root) and return its id.
    pub fn push_element(&mut self, parent: Option<NodeId>, name: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.push(
            parent,
            NodeData::Element {
                name: name.to_ascii_lowercase(),
                attrs,
            },
        )
    }

    /// Add a text node under `parent` and return its id.
    pub fn push_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(Some(parent), NodeData::Text(text.to_string()))
    }

    fn push(&mut self, parent: Option<NodeId>, data: NodeData) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            data,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.slots[parent.0].children.push(id);
        }
        id
    }

    /// The first node added, which [`parse_html`] uses as the document root.
    pub fn root(&self) -> Option<Node<'_>> {
        (!self.slots.is_empty()).then_some(Node { tree: self, id: NodeId(0) })
    }

    fn node(&self, id: NodeId) -> Node<'_> {
        Node { tree: self, id }
    }
}

/// Borrowed handle to one node of a [`MarkupTree`].
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    tree: &'a MarkupTree,
    id: NodeId,
}

impl<'a> Node<'a> {
    fn slot(self) -> &'a Slot {
        &self.tree.slots[self.id.0]
    }

    fn sibling(self, step: isize) -> Option<Node<'a>> {
        let parent = self.slot().parent?;
        let siblings = &self.tree.slots[parent.0].children;
        let pos = siblings.iter().position(|&c| c == self.id)?;
        let target = pos.checked_add_signed(step)?;
        siblings.get(target).map(|&id| self.tree.node(id))
    }

    fn collect_text(self, out: &mut String) {
        match &self.slot().data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element { .. } => {
                for child in self.children() {
                    child.collect_text(out);
                }
            }
        }
    }
}

impl<'a> MarkupNode<'a> for Node<'a> {
    fn parent(self) -> Option<Self> {
        self.slot().parent.map(|id| self.tree.node(id))
    }

    fn previous_sibling(self) -> Option<Self> {
        self.sibling(-1)
    }

    fn next_sibling(self) -> Option<Self> {
        self.sibling(1)
    }

    fn children(self) -> Vec<Self> {
        self.slot().children.iter().map(|&id| self.tree.node(id)).collect()
    }

    fn tag(self) -> Option<&'a str> {
        match &self.slot().data {
            NodeData::Element { name, .. } => Some(name.as_str()),
            NodeData::Text(_) => None,
        }
    }

    fn attr(self, name: &str) -> Option<&'a str> {
        match &self.slot().data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    fn text(self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }
}

/// Parse an HTML document or fragment into an owned tree rooted at `<html>`.
pub fn parse_html(markup: &str) -> MarkupTree {
    let document = Html::parse_document(markup);
    let mut tree = MarkupTree::default();
    append_element(&mut tree, None, document.root_element());
    tree
}

fn append_element(tree: &mut MarkupTree, parent: Option<NodeId>, element: ElementRef<'_>) {
    let attrs = element
        .value()
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let id = tree.push_element(parent, element.value().name(), attrs);
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            append_element(tree, Some(id), child_element);
        } else if let Some(text) = child.value().as_text() {
            let text: &str = text;
            tree.push_text(id, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(tree: &MarkupTree) -> Node<'_> {
        tree.root().unwrap().find_all("body")[0]
    }

    #[test]
    fn test_parse_keeps_text_nodes_between_elements() {
        let tree = parse_html("<p>one<br>two</p>");
        let p = body(&tree).find_all("p")[0];
        let kids = p.children();
        assert_eq!(kids.len(), 3);
        assert_eq!(kids[0].text(), "one");
        assert_eq!(kids[1].tag(), Some("br"));
        assert_eq!(kids[2].text(), "two");
        assert_eq!(p.text(), "onetwo");
    }

    #[test]
    fn test_sibling_navigation() {
        let tree = parse_html("<div><h4>A</h4> text <p>B</p></div>");
        let div = body(&tree).find_all("div")[0];
        let h4 = div.find_all("h4")[0];
        let p = div.find_all("p")[0];
        assert_eq!(h4.next_element_sibling().unwrap().text(), "B");
        assert_eq!(p.previous_siblings()[1].text(), "A");
        assert_eq!(p.previous_sibling().unwrap().text(), " text ");
        assert!(h4.previous_sibling().is_none());
        assert_eq!(p.parent().unwrap().tag(), Some("div"));
        assert_eq!(p.previous_siblings().len(), 2);
    }

    #[test]
    fn test_find_all_in_document_order() {
        let tree = parse_html("<div><strong>1</strong><p><strong>2</strong></p></div><strong>3</strong>");
        let texts: Vec<String> = body(&tree).find_all("strong").into_iter().map(|n| n.text()).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_class_lookup() {
        let tree = parse_html(r#"<p class="big notice">x</p><p class="notices">y</p>"#);
        let found = body(&tree).find_all_with_class("notice");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text(), "x");
    }

    #[test]
    fn test_string_reduces_single_child_chains() {
        let tree = parse_html("<p><span><em>June 1 - June 10</em></span></p><p>a<b>b</b></p>");
        let ps = body(&tree).find_all("p");
        assert_eq!(ps[0].string().as_deref(), Some("June 1 - June 10"));
        assert_eq!(ps[1].string(), None);
    }

    #[test]
    fn test_attr_lookup() {
        let tree = parse_html(r#"<a href="/shop/webshop/detail/cash/42">Item</a>"#);
        let a = body(&tree).find_all("a")[0];
        assert_eq!(a.attr("href"), Some("/shop/webshop/detail/cash/42"));
        assert_eq!(a.attr("title"), None);
    }

    #[test]
    fn test_hand_built_tree() {
        let mut tree = MarkupTree::default();
        let root = tree.push_element(None, "DIV", vec![]);
        tree.push_text(root, "hello");
        let node = tree.root().unwrap();
        assert_eq!(node.tag(), Some("div"));
        assert_eq!(node.string().as_deref(), Some("hello"));
        assert_eq!(node.children().len(), 1);
    }
}
