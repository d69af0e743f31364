//! A small arena DOM used by the readability heuristic.
//!
//! Only [`DomTree::from_html`] knows about the HTML engine; everything that scores or
//! selects content works on node ids into this arena, so it can be exercised with
//! trees assembled by hand.

use scraper::{Html, Node};

/// Index of a node in its [`DomTree`].
pub type NodeId = usize;

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Elements whose boundaries separate words when flattening to text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section",
    "table", "td", "th", "tr", "ul",
];

/// Whether `tag` is a block-level container. Line breaks and rules do not count.
pub fn is_block(tag: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag) && !matches!(tag, "br" | "hr")
}

/// One step of an iterative walk; `Close` runs after every child of the node.
#[derive(Clone, Copy)]
enum Walk {
    Open(NodeId),
    Close(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The synthetic root that owns the document's top-level nodes.
    Root,
    Element { tag: String, attrs: Vec<(String, String)> },
    Text(String),
}

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct DomNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Arena tree with parent links.
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<DomNode>,
}

impl DomTree {
    /// An empty tree holding only the root.
    pub fn new() -> Self {
        Self { nodes: vec![DomNode { kind: NodeKind::Root, parent: None, children: Vec::new() }] }
    }

    /// Parse a full HTML document.
    ///
    /// Comments, doctypes and processing instructions are dropped. Tag and attribute
    /// names come out lowercase.
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut tree = Self::new();

        let mut stack = vec![(document.tree.root(), tree.root())];
        while let Some((node, parent)) = stack.pop() {
            let id = match node.value() {
                Node::Element(el) => {
                    let attrs = el.attrs().map(|(name, value)| (name.to_lowercase(), value.to_string())).collect();
                    tree.push(parent, NodeKind::Element { tag: el.name().to_lowercase(), attrs })
                }
                Node::Text(text) => {
                    let content: &str = text;
                    tree.push(parent, NodeKind::Text(content.to_string()));
                    continue;
                }
                Node::Document | Node::Fragment => parent,
                _ => continue,
            };

            let children: Vec<_> = node.children().collect();
            stack.extend(children.into_iter().rev().map(|child| (child, id)));
        }

        tree
    }

    pub fn root(&self) -> NodeId {
        0
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(DomNode { kind, parent: Some(parent), children: Vec::new() });
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Append an element under `parent`.
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs.iter().map(|(k, v)| (k.to_lowercase(), v.to_string())).collect();
        self.push(parent, NodeKind::Element { tag: tag.to_lowercase(), attrs })
    }

    /// Append a text node under `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeKind::Text(text.to_string()))
    }

    pub fn get(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id)
    }

    /// Tag name, for element nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element { attrs, .. } => attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Element children only.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).iter().copied().filter(|c| self.tag(*c).is_some())
    }

    /// All nodes below `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Elements with the given tag below `id`, in document order.
    pub fn find_all(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(id).into_iter().filter(|n| self.tag(*n) == Some(tag)).collect()
    }

    pub fn find_first(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(id).into_iter().find(|n| self.tag(*n) == Some(tag))
    }

    /// The `<body>` element, if the document has one.
    pub fn body(&self) -> Option<NodeId> {
        self.find_first(self.root(), "body")
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Text below `id`, with a space at block boundaries.
    ///
    /// Whitespace is not collapsed; callers that need canonical text do that.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![Walk::Open(id)];

        while let Some(step) = stack.pop() {
            let node = match step {
                Walk::Open(node) => node,
                Walk::Close(_) => {
                    out.push(' ');
                    continue;
                }
            };
            let Some(current) = self.nodes.get(node) else {
                continue;
            };

            match &current.kind {
                NodeKind::Text(t) => out.push_str(t),
                NodeKind::Element { tag, .. } if BLOCK_ELEMENTS.contains(&tag.as_str()) => {
                    out.push(' ');
                    stack.push(Walk::Close(node));
                    stack.extend(current.children.iter().rev().map(|c| Walk::Open(*c)));
                }
                _ => stack.extend(current.children.iter().rev().map(|c| Walk::Open(*c))),
            }
        }
        out
    }

    /// Number of non-whitespace characters of text below `id`.
    pub fn text_len(&self, id: NodeId) -> usize {
        self.text(id).split_whitespace().map(|w| w.chars().count()).sum::<usize>()
    }

    /// Serialize `id` and its subtree as HTML.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![Walk::Open(id)];

        while let Some(step) = stack.pop() {
            match step {
                Walk::Close(node) => {
                    if let Some(tag) = self.tag(node) {
                        out.push_str("</");
                        out.push_str(tag);
                        out.push('>');
                    }
                }
                Walk::Open(node) => {
                    let Some(current) = self.nodes.get(node) else {
                        continue;
                    };
                    match &current.kind {
                        NodeKind::Text(t) => out.push_str(&html_escape::encode_text(t)),
                        NodeKind::Root => stack.extend(current.children.iter().rev().map(|c| Walk::Open(*c))),
                        NodeKind::Element { tag, attrs } => {
                            out.push('<');
                            out.push_str(tag);
                            for (name, value) in attrs {
                                out.push(' ');
                                out.push_str(name);
                                out.push_str("=\"");
                                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                                out.push('"');
                            }
                            out.push('>');

                            if !VOID_ELEMENTS.contains(&tag.as_str()) {
                                stack.push(Walk::Close(node));
                                stack.extend(current.children.iter().rev().map(|c| Walk::Open(*c)));
                            }
                        }
                    }
                }
            }
        }
        out
    }

    /// Total node count, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds nothing but its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}
