//! Arena-backed element tree for the simulated page

use std::collections::BTreeMap;

use super::selector::Selector;

/// Index of a node in its [`Document`]
pub type NodeId = usize;

/// Element data, also used as a builder when rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct El {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    /// Own text, rendered before the children's text
    pub text: String,
    pub hidden: bool,
    pub disabled: bool,
}

impl El {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.extend(class.split_whitespace().map(str::to_string));
        self
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.insert(key.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Attribute lookup, including `id` and `class`
    pub fn get_attr(&self, key: &str) -> Option<String> {
        match key {
            "id" => self.id.clone(),
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ")),
            "class" => None,
            "hidden" if self.hidden => Some(String::new()),
            "disabled" if self.disabled => Some(String::new()),
            _ => self.attrs.get(key).cloned(),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// An enabled text-accepting control
    pub fn is_editable(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea") && !self.disabled
    }
}

#[derive(Debug, Clone)]
struct Node {
    el: El,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A rendered page
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document holding only the `html` root
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                el: El::new("html"),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    /// Append `el` as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, el: El) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            el,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn element(&self, id: NodeId) -> Option<&El> {
        self.nodes.get(id).map(|n| &n.el)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Nodes in document (pre-)order
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        order
    }

    /// All nodes matching `selector`, in document order
    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|&id| selector.matches(self, id))
            .collect()
    }

    /// Concatenated text of a node and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(node) = self.nodes.get(id) {
            out.push_str(&node.el.text);
            for &child in &node.children {
                self.collect_text(child, out);
            }
        }
    }

    /// Neither the node nor any ancestor is hidden
    pub fn is_displayed(&self, id: NodeId) -> bool {
        match self.element(id) {
            Some(el) if !el.hidden => self
                .ancestors(id)
                .all(|a| self.element(a).is_some_and(|el| !el.hidden)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_and_order() {
        let mut doc = Document::new();
        let ul = doc.append(doc.root(), El::new("ul"));
        let first = doc.append(ul, El::new("li").text("A"));
        doc.append(first, El::new("span").text("1"));
        let second = doc.append(ul, El::new("li").text("B"));

        assert_eq!(doc.text_content(ul), "A1B");
        let li = Selector::parse("li").unwrap();
        assert_eq!(doc.select(&li), vec![first, second]);
    }

    #[test]
    fn test_hidden_ancestor_hides_descendants() {
        let mut doc = Document::new();
        let section = doc.append(doc.root(), El::new("section").hidden(true));
        let p = doc.append(section, El::new("p").text("empty"));
        assert!(!doc.is_displayed(section));
        assert!(!doc.is_displayed(p));
        assert!(doc.is_displayed(doc.root()));
    }

    #[test]
    fn test_attr_lookup() {
        let el = El::new("INPUT")
            .id("x")
            .class("a b")
            .attr("Name", "task");
        assert_eq!(el.tag, "input");
        assert_eq!(el.get_attr("id").as_deref(), Some("x"));
        assert_eq!(el.get_attr("class").as_deref(), Some("a b"));
        assert_eq!(el.get_attr("name").as_deref(), Some("task"));
        assert!(el.has_class("b"));
        assert!(el.is_editable());
    }
}
