//! # Canonical Document Model
//!
//! The format-neutral tree every ACORD payload is decoded into before
//! validation, and every response is assembled as before encoding.
//!
//! ## Shape
//!
//! A [`Node`] has a name and exactly one [`NodeValue`]:
//!
//! - `Text`: a primitive value. Dates and times are also text here; the
//!   validator applies calendar typing from the schema.
//! - `Code`: the ACORD type-code idiom: a short coded qualifier (`tc`)
//!   paired with a human-readable value, e.g. `{tc: "1", value: "Success"}`.
//! - `Group`: ordered children with unique names.
//!
//! A node is therefore either a leaf or a container, never both. Repeated
//! sibling names are rejected at insertion ([`DocumentError::DuplicateChild`]).

use std::fmt;

use crate::error::DocumentError;

/// An ACORD type-code: coded qualifier plus display value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeCode {
    /// Short coded qualifier (the `tc` attribute in ACORD XML).
    pub tc: String,
    /// Human-readable value.
    pub value: String,
}

impl TypeCode {
    /// Create a type-code from its qualifier and display value.
    pub fn new(tc: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tc: tc.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (tc={})", self.value, self.tc)
    }
}

/// The content carried by a [`Node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    /// Primitive text value.
    Text(String),
    /// Type-code leaf.
    Code(TypeCode),
    /// Ordered, uniquely named children.
    Group(Vec<Node>),
}

impl NodeValue {
    /// Short label used in diagnostics ("text", "type-code", "object").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Code(_) => "type-code",
            Self::Group(_) => "object",
        }
    }
}

/// A named node in a [`CanonicalDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    value: NodeValue,
}

impl Node {
    /// Create a text leaf.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: NodeValue::Text(value.into()),
        }
    }

    /// Create a type-code leaf.
    pub fn code(name: impl Into<String>, code: TypeCode) -> Self {
        Self {
            name: name.into(),
            value: NodeValue::Code(code),
        }
    }

    /// Create an empty group.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: NodeValue::Group(Vec::new()),
        }
    }

    /// Create a group from children, rejecting duplicate names.
    pub fn group_of(
        name: impl Into<String>,
        children: impl IntoIterator<Item = Node>,
    ) -> Result<Self, DocumentError> {
        let mut group = Self::group(name);
        for child in children {
            group.push(child)?;
        }
        Ok(group)
    }

    /// Element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node's content.
    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    /// Text content, if this is a text leaf.
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Type-code content, if this is a type-code leaf.
    pub fn as_code(&self) -> Option<&TypeCode> {
        match &self.value {
            NodeValue::Code(c) => Some(c),
            _ => None,
        }
    }

    /// Whether this node is a group.
    pub fn is_group(&self) -> bool {
        matches!(self.value, NodeValue::Group(_))
    }

    /// Children in document order. Empty for leaves.
    pub fn children(&self) -> &[Node] {
        match &self.value {
            NodeValue::Group(children) => children,
            _ => &[],
        }
    }

    /// Look up a direct child by name.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children().iter().find(|c| c.name == name)
    }

    /// Append a child to this group.
    ///
    /// # Errors
    ///
    /// - [`DocumentError::NotAGroup`] if this node is a leaf.
    /// - [`DocumentError::DuplicateChild`] if a sibling already uses the name.
    pub fn push(&mut self, child: Node) -> Result<(), DocumentError> {
        match &mut self.value {
            NodeValue::Group(children) => {
                if children.iter().any(|c| c.name == child.name) {
                    return Err(DocumentError::DuplicateChild {
                        parent: self.name.clone(),
                        name: child.name,
                    });
                }
                children.push(child);
                Ok(())
            }
            _ => Err(DocumentError::NotAGroup(self.name.clone())),
        }
    }

    /// Builder-style [`push`](Self::push).
    pub fn with_child(mut self, child: Node) -> Result<Self, DocumentError> {
        self.push(child)?;
        Ok(self)
    }
}

/// A decoded ACORD payload: a single named root node.
///
/// Created per request and discarded once the response is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalDocument {
    root: Node,
}

impl CanonicalDocument {
    /// Wrap a root node.
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Consume the document, returning its root.
    pub fn into_root(self) -> Node {
        self.root
    }

    /// Resolve a dot-separated path from the root, root name included
    /// (e.g. `"ACORD.InsuranceSvcRq.RqUID"`).
    pub fn find(&self, path: &str) -> Option<&Node> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        if first != self.root.name {
            return None;
        }
        segments.try_fold(&self.root, |node, segment| node.child(segment))
    }
}

impl From<Node> for CanonicalDocument {
    fn from(root: Node) -> Self {
        Self::new(root)
    }
}
