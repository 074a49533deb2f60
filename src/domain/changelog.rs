use crate::domain::release::{ActionRecord, ReleaseDescriptor};
use crate::error::{AppError, AppResult};

pub const CHANGES_NAMESPACE: &str = "http://maven.apache.org/changes/1.0.0";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const SCHEMA_LOCATION: &str =
    "http://maven.apache.org/changes/1.0.0 http://maven.apache.org/xsd/changes-1.0.0.xsd";

const DOCUMENT: &str = "document";
const PROPERTIES: &str = "properties";
const BODY: &str = "body";
const RELEASE: &str = "release";
const ACTION: &str = "action";

/// Index of a node inside a [`ChangelogDocument`]. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    fn with_optional_attribute(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with_attribute(key, value),
            None => self,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    Comment(String),
    Instruction(String),
    DocType(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    children: Vec<NodeId>,
}

/// In-memory changelog: a single root element plus any comments or
/// processing instructions surrounding it. Nodes are only ever appended.
#[derive(Debug, Clone)]
pub struct ChangelogDocument {
    nodes: Vec<NodeData>,
    root: NodeId,
    pub prolog: Vec<NodeKind>,
    pub epilog: Vec<NodeKind>,
}

impl ChangelogDocument {
    pub fn with_root(root: Element) -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Element(root),
                children: Vec::new(),
            }],
            root: NodeId(0),
            prolog: Vec::new(),
            epilog: Vec::new(),
        }
    }

    /// `<document>` with an empty `<properties>` and an empty `<body>`.
    pub fn skeleton() -> Self {
        let root = Element::new(DOCUMENT)
            .with_attribute("xmlns", CHANGES_NAMESPACE)
            .with_attribute("xmlns:xsi", XSI_NAMESPACE)
            .with_attribute("xsi:schemaLocation", SCHEMA_LOCATION);
        let mut document = Self::with_root(root);
        let root = document.root();
        document.append(root, NodeKind::Element(Element::new(PROPERTIES)));
        document.append(root, NodeKind::Element(Element::new(BODY)));
        document
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        self.element(id).and_then(|element| element.attribute(key))
    }

    /// Concatenated text content of the direct text children.
    pub fn text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|child| match self.kind(*child) {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn child_elements<'a>(
        &'a self,
        parent: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(parent)
            .iter()
            .copied()
            .filter(move |child| {
                self.element(*child)
                    .is_some_and(|element| element.name == name)
            })
    }

    pub fn body(&self) -> Option<NodeId> {
        self.child_elements(self.root, BODY).next()
    }

    /// Returns the `<body>` section, appending one to the root when missing.
    pub fn ensure_body(&mut self) -> AppResult<NodeId> {
        let root_name = self
            .element(self.root)
            .map(|element| element.name.as_str())
            .unwrap_or_default();
        if root_name != DOCUMENT {
            return Err(AppError::Storage(format!(
                "unexpected root element <{root_name}>, expected <{DOCUMENT}>"
            )));
        }

        match self.body() {
            Some(body) => Ok(body),
            None => Ok(self.append(self.root, NodeKind::Element(Element::new(BODY)))),
        }
    }

    #[cfg(test)]
    pub fn releases(&self) -> Vec<NodeId> {
        self.body()
            .map(|body| self.child_elements(body, RELEASE).collect())
            .unwrap_or_default()
    }

    pub fn find_release(&self, body: NodeId, version: &str) -> Option<NodeId> {
        self.child_elements(body, RELEASE)
            .find(|release| self.attribute(*release, "version") == Some(version))
    }

    pub fn append_release(&mut self, body: NodeId, release: &ReleaseDescriptor) -> NodeId {
        let element = Element::new(RELEASE)
            .with_attribute("date", release.date.as_str())
            .with_attribute("version", release.version.as_str())
            .with_attribute("description", release.description.as_str());
        self.append(body, NodeKind::Element(element))
    }

    pub fn actions(&self, release: NodeId) -> Vec<NodeId> {
        self.child_elements(release, ACTION).collect()
    }

    pub fn find_action(&self, release: NodeId, issue: &str) -> Option<NodeId> {
        self.child_elements(release, ACTION)
            .find(|action| self.attribute(*action, "issue") == Some(issue))
    }

    pub fn append_action(&mut self, release: NodeId, action: &ActionRecord) -> NodeId {
        let element = Element::new(ACTION)
            .with_optional_attribute("dev", action.developer.as_deref())
            .with_attribute("type", action.kind.as_str())
            .with_optional_attribute("due-to", action.due_to.as_deref())
            .with_optional_attribute("due-to-email", action.due_to_email.as_deref())
            .with_optional_attribute("issue", action.issue_ref.as_deref());
        let node = self.append(release, NodeKind::Element(element));
        if !action.summary.trim().is_empty() {
            self.append(node, NodeKind::Text(action.summary.clone()));
        }
        node
    }
}
