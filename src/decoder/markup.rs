//! Strict element-tree parser for work-item payload markup.
//!
//! Builds just enough of a document model for the decoders: element names,
//! attributes and mixed content in document order. Anything that is not
//! well-formed (mismatched or unclosed tags, unknown entities, several roots,
//! text outside the root) is an error so the caller can switch to recovery.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("malformed markup at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("closing tag </{0}> has no matching opening tag")]
    UnexpectedClose(String),

    #[error("more than one root element")]
    MultipleRoots,

    #[error("text outside the root element")]
    StrayText,

    #[error("document has no root element")]
    Empty,
}

/// Content of an element, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub nodes: Vec<Node>,
}

impl Element {
    fn open(start: &BytesStart<'_>, position: u64) -> Result<Self, MarkupError> {
        let syntax = |message: String| MarkupError::Syntax { position, message };

        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| syntax(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| syntax(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            nodes: Vec::new(),
        })
    }

    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Name without a namespace prefix (`xs:schema` → `schema`).
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Direct child elements.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Direct child elements with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children().filter(move |el| el.name == name)
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children().find(|el| el.name == name)
    }

    /// All descendant elements with the given name, in document order.
    /// The element itself is not included.
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        let mut stack: Vec<&Element> = self.children().collect::<Vec<_>>();
        stack.reverse();
        while let Some(el) = stack.pop() {
            if el.name == name {
                found.push(el);
            }
            let mut children: Vec<&Element> = el.children().collect();
            children.reverse();
            stack.extend(children);
        }
        found
    }

    /// Concatenated text of this element and all its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Whether the element contains no child elements.
    pub fn is_leaf(&self) -> bool {
        self.children().next().is_none()
    }
}

/// Parse a complete document into its root element.
pub fn parse(input: &str) -> Result<Element, MarkupError> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event().map_err(|e| MarkupError::Syntax {
            position,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(start) => stack.push(Element::open(&start, position)?),
            Event::Empty(start) => {
                let el = Element::open(&start, position)?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::End(end) => {
                let el = stack.pop().ok_or_else(|| {
                    MarkupError::UnexpectedClose(String::from_utf8_lossy(end.name().as_ref()).into_owned())
                })?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| MarkupError::Syntax {
                        position,
                        message: e.to_string(),
                    })?
                    .into_owned();
                push_text(&mut stack, text)?;
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                push_text(&mut stack, text)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(MarkupError::Unclosed(open.name.clone()));
    }
    root.ok_or(MarkupError::Empty)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> Result<(), MarkupError> {
    if let Some(parent) = stack.last_mut() {
        parent.nodes.push(Node::Element(el));
        return Ok(());
    }
    if root.is_some() {
        return Err(MarkupError::MultipleRoots);
    }
    *root = Some(el);
    Ok(())
}

fn push_text(stack: &mut [Element], text: String) -> Result<(), MarkupError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.nodes.push(Node::Text(text));
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(MarkupError::StrayText),
    }
}
