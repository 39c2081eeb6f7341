//! Arena-backed XML document.
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`]. Nodes are
//! only ever appended, so a handle stays valid for as long as the document
//! value it came from. Parsing and serialization go through `xml-rs`.

use std::io::Write;

use thiserror::Error;
use xml::common::{Position, XmlVersion};
use xml::name::OwnedName;
use xml::reader::{ParserConfig, XmlEvent};
use xml::writer::{EmitterConfig, EventWriter, XmlEvent as WriteEvent};

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML parse error at {row}:{column}: {message}")]
    Parse {
        message: String,
        row: u64,
        column: u64,
    },
    #[error("XML write error: {0}")]
    Write(#[from] xml::writer::Error),
    #[error("serialized XML is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Stable handle to a node inside one [`XmlDocument`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
enum NodeKind {
    Document,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct XmlDocument {
    nodes: Vec<Node>,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDocument {
    /// Empty document holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                children: Vec::new(),
            }],
        }
    }

    /// The document node (parent of top-level comments and the root element).
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn append_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.push(
            parent,
            NodeKind::Element {
                name: name.to_owned(),
                attributes: Vec::new(),
            },
        )
    }

    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeKind::Comment(text.to_owned()))
    }

    /// Element name, `None` for non-element nodes.
    pub fn name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attribute(&self, node: NodeId, key: &str) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Set or overwrite an attribute. Ignored on non-element nodes.
    pub fn set_attribute(&mut self, node: NodeId, key: &str, value: impl ToString) {
        let Some(Node {
            kind: NodeKind::Element { attributes, .. },
            ..
        }) = self.nodes.get_mut(node.0)
        else {
            return;
        };
        let value = value.to_string();
        match attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => attributes.push((key.to_owned(), value)),
        }
    }

    /// Element children in document order.
    pub fn element_children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(parent.0)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(|id| matches!(self.nodes[id.0].kind, NodeKind::Element { .. }))
    }

    /// First element child called `name`.
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.element_children(parent)
            .find(|&id| self.name(id) == Some(name))
    }

    /// Concatenated direct text content.
    pub fn text(&self, node: NodeId) -> String {
        let Some(n) = self.nodes.get(node.0) else {
            return String::new();
        };
        n.children
            .iter()
            .filter_map(|id| match &self.nodes[id.0].kind {
                NodeKind::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace the direct text content of `node` with a single text child.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        let nodes = &self.nodes;
        let Some(n) = nodes.get(node.0) else {
            return;
        };
        let kept: Vec<NodeId> = n
            .children
            .iter()
            .copied()
            .filter(|id| !matches!(nodes[id.0].kind, NodeKind::Text(_)))
            .collect();
        self.nodes[node.0].children = kept;
        if !text.is_empty() {
            self.push(node, NodeKind::Text(text.to_owned()));
        }
    }

    /// Parse a document from text. Comments and text are kept verbatim,
    /// whitespace-only runs between markup are dropped.
    pub fn parse(src: &str) -> Result<Self, XmlError> {
        let reader = ParserConfig::new()
            .trim_whitespace(false)
            .ignore_comments(false)
            .cdata_to_characters(true)
            .create_reader(src.as_bytes());

        let mut doc = Self::new();
        let mut stack = vec![doc.root()];

        for event in reader {
            let event = event.map_err(|e| {
                let pos = e.position();
                XmlError::Parse {
                    message: e.to_string(),
                    row: pos.row + 1,
                    column: pos.column + 1,
                }
            })?;
            // The stack always holds the document node at the bottom.
            let parent = *stack.last().unwrap_or(&NodeId(0));
            match event {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    let id = doc.append_element(parent, &qualified(&name));
                    for attr in attributes {
                        doc.set_attribute(id, &qualified(&attr.name), attr.value);
                    }
                    stack.push(id);
                }
                XmlEvent::EndElement { .. } => {
                    stack.pop();
                }
                XmlEvent::Characters(text) => {
                    doc.push(parent, NodeKind::Text(text));
                }
                XmlEvent::Comment(text) => {
                    doc.append_comment(parent, &text);
                }
                XmlEvent::Whitespace(_) => {}
                _ => {}
            }
        }

        Ok(doc)
    }

    /// Serialize with an XML declaration, indenting nested elements by `indent`.
    pub fn to_xml_string(&self, indent: &'static str) -> Result<String, XmlError> {
        let mut out = Vec::new();
        {
            let mut writer = EmitterConfig::new()
                .perform_indent(true)
                .indent_string(indent)
                .autopad_comments(false)
                .create_writer(&mut out);
            // The declaration must precede top-level comments.
            writer.write(WriteEvent::StartDocument {
                version: XmlVersion::Version10,
                encoding: Some("UTF-8"),
                standalone: None,
            })?;
            for &child in &self.nodes[0].children {
                self.write_node(child, &mut writer)?;
            }
        }
        Ok(String::from_utf8(out)?)
    }

    fn write_node<W: Write>(&self, id: NodeId, writer: &mut EventWriter<W>) -> Result<(), XmlError> {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Document => {}
            NodeKind::Element { name, attributes } => {
                let mut start = WriteEvent::start_element(name.as_str());
                for (k, v) in attributes {
                    start = start.attr(k.as_str(), v.as_str());
                }
                writer.write(start)?;
                for &child in &node.children {
                    self.write_node(child, writer)?;
                }
                writer.write(WriteEvent::end_element())?;
            }
            NodeKind::Text(text) => writer.write(WriteEvent::characters(text))?,
            NodeKind::Comment(text) => writer.write(WriteEvent::comment(text))?,
        }
        Ok(())
    }
}

fn qualified(name: &OwnedName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{prefix}:{}", name.local_name),
        None => name.local_name.clone(),
    }
}
