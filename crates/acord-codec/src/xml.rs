//! # XML Representation
//!
//! Each node is an element of the same name. A type-code is an element
//! whose `tc` attribute carries the code and whose text is the display
//! value; attributes other than `tc` (namespace declarations and the like)
//! are ignored on input. Namespace prefixes on element names are dropped.
//!
//! Leaf text is kept exactly as written, surrounding whitespace included.
//! Whitespace between child elements is insignificant. Rejected as
//! malformed: non-UTF-8 input, mixed content, duplicate sibling elements,
//! more than one root, unclosed or mismatched elements, unknown entities.
//!
//! Output is compact and begins with `<?xml version="1.0" encoding="UTF-8"?>`.

use std::borrow::Cow;

use acord_core::{CanonicalDocument, Node, NodeValue, TypeCode, WireFormat};
use acord_schema::node::{is_element_name, is_xml_text};
use acord_schema::{SchemaNode, Shape};
use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

use crate::{root_hint, CodecError};

/// Attribute carrying a type-code qualifier.
pub const TYPE_CODE_ATTR: &str = "tc";

fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::malformed(WireFormat::Xml, reason)
}

/// An element being assembled.
struct Frame<'s> {
    name: String,
    tc: Option<String>,
    text: String,
    children: Vec<Node>,
    hint: Option<&'s SchemaNode>,
}

impl<'s> Frame<'s> {
    fn open(start: &BytesStart<'_>) -> Result<Self, CodecError> {
        let name = std::str::from_utf8(start.local_name().as_ref())
            .map_err(|e| malformed(e.to_string()))?
            .to_string();

        let mut tc = None;
        for attr in start.attributes() {
            let attr = attr.map_err(|e| malformed(format!("in <{name}>: {e}")))?;
            if attr.key.local_name().as_ref() == TYPE_CODE_ATTR.as_bytes() {
                let value = attr
                    .unescape_value()
                    .map_err(|e| malformed(format!("in <{name}>: {e}")))?;
                tc = Some(value.into_owned());
            }
        }

        Ok(Self {
            name,
            tc,
            text: String::new(),
            children: Vec::new(),
            hint: None,
        })
    }

    fn child_hint(&self, name: &str) -> Option<&'s SchemaNode> {
        self.hint.and_then(|h| h.field(name))
    }

    fn close(self) -> Result<Node, CodecError> {
        if !self.children.is_empty() {
            if !self.text.trim().is_empty() {
                return Err(malformed(format!(
                    "element <{}> mixes text with child elements",
                    self.name
                )));
            }
            if self.tc.is_some() {
                return Err(malformed(format!(
                    "element <{}> has a tc attribute and child elements",
                    self.name
                )));
            }
            let mut group = Node::group(self.name);
            for child in self.children {
                group.push(child).map_err(|e| malformed(e.to_string()))?;
            }
            return Ok(group);
        }

        if let Some(tc) = self.tc {
            return Ok(Node::code(self.name, TypeCode::new(tc, self.text)));
        }

        let expects_group = self
            .hint
            .is_some_and(|h| matches!(h.shape(), Shape::Object(_)));
        if expects_group && self.text.trim().is_empty() {
            Ok(Node::group(self.name))
        } else {
            Ok(Node::text(self.name, self.text))
        }
    }
}

/// Decode an XML document.
pub fn decode(bytes: &[u8], schema: Option<&SchemaNode>) -> Result<CanonicalDocument, CodecError> {
    let source = std::str::from_utf8(bytes).map_err(|e| malformed(format!("input is not UTF-8: {e}")))?;
    let mut reader = Reader::from_str(source);

    let mut stack: Vec<Frame<'_>> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            malformed(format!("at byte {}: {e}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => {
                let frame = open_frame(&start, &stack, root.is_some(), schema)?;
                stack.push(frame);
            }
            Event::Empty(start) => {
                let frame = open_frame(&start, &stack, root.is_some(), schema)?;
                attach(frame.close()?, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| malformed("closing tag without matching opening tag"))?;
                attach(frame.close()?, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| malformed(e.to_string()))?;
                append_text(&mut stack, &text)?;
            }
            Event::CData(data) => {
                let text = std::str::from_utf8(&data).map_err(|e| malformed(e.to_string()))?;
                append_text(&mut stack, text)?;
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!("element <{}> is never closed", open.name)));
    }
    root.map(CanonicalDocument::new)
        .ok_or_else(|| malformed("document has no root element"))
}

fn open_frame<'s>(
    start: &BytesStart<'_>,
    stack: &[Frame<'s>],
    have_root: bool,
    schema: Option<&'s SchemaNode>,
) -> Result<Frame<'s>, CodecError> {
    if stack.is_empty() && have_root {
        return Err(malformed("document has more than one root element"));
    }
    let mut frame = Frame::open(start)?;
    frame.hint = match stack.last() {
        Some(parent) => parent.child_hint(&frame.name),
        None => root_hint(schema, &frame.name),
    };
    Ok(frame)
}

fn attach(node: Node, stack: &mut [Frame<'_>], root: &mut Option<Node>) -> Result<(), CodecError> {
    match stack.last_mut() {
        Some(parent) => {
            if parent.children.iter().any(|c| c.name() == node.name()) {
                return Err(malformed(format!(
                    "duplicate element <{}> under <{}>: repeating groups are not supported",
                    node.name(),
                    parent.name
                )));
            }
            parent.children.push(node);
        }
        None => *root = Some(node),
    }
    Ok(())
}

fn append_text(stack: &mut [Frame<'_>], text: &str) -> Result<(), CodecError> {
    match stack.last_mut() {
        Some(frame) => frame.text.push_str(text),
        None if text.trim().is_empty() => {}
        None => return Err(malformed("text outside the root element")),
    }
    Ok(())
}

/// Encode a document as XML.
pub fn encode(doc: &CanonicalDocument) -> Result<Vec<u8>, CodecError> {
    check_representable(doc.root())?;

    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(encode_error)?;
    write_node(&mut writer, doc.root())?;
    Ok(writer.into_inner())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<(), CodecError> {
    let mut start = BytesStart::new(node.name());
    let (text, children): (Option<&str>, &[Node]) = match node.value() {
        NodeValue::Text(text) => (Some(text.as_str()), &[]),
        NodeValue::Code(code) => {
            start.push_attribute(Attribute {
                key: QName(TYPE_CODE_ATTR.as_bytes()),
                value: Cow::Owned(escape_attr(&code.tc).into_bytes()),
            });
            (Some(code.value.as_str()), &[])
        }
        NodeValue::Group(children) => (None, children),
    };

    let empty = children.is_empty() && text.map_or(true, str::is_empty);
    if empty {
        return writer.write_event(Event::Empty(start)).map_err(encode_error);
    }

    writer.write_event(Event::Start(start)).map_err(encode_error)?;
    if let Some(text) = text {
        writer
            .write_event(Event::Text(BytesText::from_escaped(escape_text(text))))
            .map_err(encode_error)?;
    }
    for child in children {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.name())))
        .map_err(encode_error)
}

/// Markup escaping plus a character reference for `\r`, which a parser
/// would otherwise fold into `\n`.
fn escape_text(text: &str) -> String {
    escape(text).replace('\r', "&#13;")
}

/// As [`escape_text`], and also `\t` and `\n`, which attribute-value
/// normalization would turn into spaces.
fn escape_attr(value: &str) -> String {
    escape(value)
        .replace('\t', "&#9;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
}

fn check_representable(node: &Node) -> Result<(), CodecError> {
    let unrepresentable = |reason: String| CodecError::Unrepresentable {
        format: WireFormat::Xml,
        reason,
    };
    if !is_element_name(node.name()) {
        return Err(unrepresentable(format!(
            "{:?} is not a valid element name",
            node.name()
        )));
    }
    let values: Vec<&str> = match node.value() {
        NodeValue::Text(text) => vec![text.as_str()],
        NodeValue::Code(code) => vec![code.tc.as_str(), code.value.as_str()],
        NodeValue::Group(children) => {
            return children.iter().try_for_each(check_representable);
        }
    };
    match values.iter().find(|v| !is_xml_text(v)) {
        Some(_) => Err(unrepresentable(format!(
            "element <{}> contains characters not allowed in XML 1.0",
            node.name()
        ))),
        None => Ok(()),
    }
}

fn encode_error(e: impl std::fmt::Display) -> CodecError {
    CodecError::Encode {
        format: WireFormat::Xml,
        reason: e.to_string(),
    }
}
