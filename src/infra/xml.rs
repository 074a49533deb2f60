use std::fmt::Display;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;

use crate::domain::changelog::{ChangelogDocument, Element, NodeId, NodeKind};
use crate::error::{AppError, AppResult};

const INDENT_SIZE: usize = 2;

fn storage_error(context: &str, err: impl Display) -> AppError {
    AppError::Storage(format!("{context}: {err}"))
}

/// Parses a changelog document. Whitespace-only text between elements is dropped;
/// any other text is kept verbatim.
pub fn parse(source: &str) -> AppResult<ChangelogDocument> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);

    let mut document: Option<ChangelogDocument> = None;
    let mut open: Vec<NodeId> = Vec::new();
    let mut prolog = Vec::new();

    loop {
        let event = reader.read_event().map_err(|err| {
            storage_error(
                &format!("malformed changelog at byte {}", reader.buffer_position()),
                err,
            )
        })?;

        match event {
            Event::Start(start) => {
                let element = read_element(&start)?;
                let id = open_element(&mut document, &open, element, &mut prolog)?;
                open.push(id);
            }
            Event::Empty(start) => {
                let element = read_element(&start)?;
                open_element(&mut document, &open, element, &mut prolog)?;
            }
            Event::End(_) => {
                open.pop();
            }
            Event::Text(text) => {
                if text.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                let value = text
                    .unescape()
                    .map_err(|err| storage_error("invalid text content", err))?;
                append_leaf(&mut document, &open, NodeKind::Text(value.into_owned()))?;
            }
            Event::CData(data) => {
                let value = String::from_utf8_lossy(&data).into_owned();
                append_leaf(&mut document, &open, NodeKind::Text(value))?;
            }
            Event::Comment(comment) => {
                let value = String::from_utf8_lossy(&comment).into_owned();
                misc_node(&mut document, &open, &mut prolog, NodeKind::Comment(value));
            }
            Event::PI(instruction) => {
                let value = String::from_utf8_lossy(&instruction).into_owned();
                misc_node(&mut document, &open, &mut prolog, NodeKind::Instruction(value));
            }
            Event::DocType(doctype) => {
                let value = String::from_utf8_lossy(&doctype).trim().to_string();
                misc_node(&mut document, &open, &mut prolog, NodeKind::DocType(value));
            }
            Event::Eof => break,
            Event::Decl(_) => {}
        }
    }

    if !open.is_empty() {
        return Err(AppError::Storage(
            "malformed changelog: unexpected end of document".to_string(),
        ));
    }

    document.ok_or_else(|| AppError::Storage("malformed changelog: no root element".to_string()))
}

fn read_element(start: &BytesStart<'_>) -> AppResult<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| storage_error("invalid attribute", err))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| storage_error("invalid attribute value", err))?;
        element = element.with_attribute(key, value.into_owned());
    }
    Ok(element)
}

fn open_element(
    document: &mut Option<ChangelogDocument>,
    open: &[NodeId],
    element: Element,
    prolog: &mut Vec<NodeKind>,
) -> AppResult<NodeId> {
    match (document.as_mut(), open.last()) {
        (Some(document), Some(parent)) => Ok(document.append(*parent, NodeKind::Element(element))),
        (Some(_), None) => Err(AppError::Storage(format!(
            "malformed changelog: second root element <{}>",
            element.name
        ))),
        (None, _) => {
            let mut created = ChangelogDocument::with_root(element);
            created.prolog = std::mem::take(prolog);
            let root = created.root();
            *document = Some(created);
            Ok(root)
        }
    }
}

fn append_leaf(
    document: &mut Option<ChangelogDocument>,
    open: &[NodeId],
    kind: NodeKind,
) -> AppResult<()> {
    match (document.as_mut(), open.last()) {
        (Some(document), Some(parent)) => {
            document.append(*parent, kind);
            Ok(())
        }
        _ => Err(AppError::Storage(
            "malformed changelog: text outside the root element".to_string(),
        )),
    }
}

fn misc_node(
    document: &mut Option<ChangelogDocument>,
    open: &[NodeId],
    prolog: &mut Vec<NodeKind>,
    kind: NodeKind,
) {
    match (document.as_mut(), open.last()) {
        (Some(document), Some(parent)) => {
            document.append(*parent, kind);
        }
        (Some(document), None) => document.epilog.push(kind),
        (None, _) => prolog.push(kind),
    }
}

/// Pretty-prints the whole document, children in insertion order.
pub fn render(document: &ChangelogDocument) -> AppResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_SIZE);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|err| storage_error("failed to render changelog", err))?;

    for kind in &document.prolog {
        write_misc(&mut writer, kind)?;
    }
    write_node(&mut writer, document, document.root())?;
    for kind in &document.epilog {
        write_misc(&mut writer, kind)?;
    }

    let mut rendered = String::from_utf8(writer.into_inner())
        .map_err(|err| storage_error("rendered changelog is not UTF-8", err))?;
    rendered.push('\n');
    Ok(rendered)
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    document: &ChangelogDocument,
    id: NodeId,
) -> AppResult<()> {
    let NodeKind::Element(element) = document.kind(id) else {
        return write_misc(writer, document.kind(id));
    };

    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let children = document.children(id);
    if children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|err| storage_error("failed to render changelog", err));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|err| storage_error("failed to render changelog", err))?;
    for child in children {
        write_node(writer, document, *child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|err| storage_error("failed to render changelog", err))
}

fn write_misc(writer: &mut Writer<Vec<u8>>, kind: &NodeKind) -> AppResult<()> {
    let event = match kind {
        NodeKind::Text(text) => Event::Text(BytesText::new(text)),
        NodeKind::Comment(comment) => Event::Comment(BytesText::from_escaped(comment.as_str())),
        NodeKind::Instruction(content) => Event::PI(BytesPI::new(content.as_str())),
        NodeKind::DocType(doctype) => Event::DocType(BytesText::from_escaped(doctype.as_str())),
        NodeKind::Element(element) => {
            return Err(AppError::Storage(format!(
                "element <{}> outside the document tree",
                element.name
            )));
        }
    };
    writer
        .write_event(event)
        .map_err(|err| storage_error("failed to render changelog", err))
}
