use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::DecodeError;

/// Minimal owned element tree; the analysis documents are small enough to
/// hold in memory and are read by name lookups rather than streamed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn open(start: &BytesStart) -> Element {
    let attributes = start
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            (key, value)
        })
        .collect();
    Element {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        attributes,
        ..Default::default()
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Parses a document into its root element.
pub fn parse(document: &str) -> Result<Element, DecodeError> {
    let mut reader = Reader::from_str(document);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(open(&start)),
            Ok(Event::Empty(start)) => {
                let element = open(&start);
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| DecodeError::Xml("unbalanced closing tag".to_string()))?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(text)) => {
                if let Some(top) = stack.last_mut() {
                    match text.unescape() {
                        Ok(unescaped) => top.text.push_str(&unescaped),
                        Err(_) => top.text.push_str(&String::from_utf8_lossy(&text)),
                    }
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DecodeError::Xml(format!(
                    "{e} at byte {}",
                    reader.error_position()
                )))
            }
            Ok(_) => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(DecodeError::Xml(format!("<{}> is never closed", open.name)));
    }
    root.ok_or(DecodeError::MissingElement("root"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_tree_with_attributes_and_text() {
        let root = parse(
            r#"<?xml version="1.0"?><a x="1"><b>one &amp; two</b><c/><b>three</b></a>"#,
        )
        .unwrap();
        assert_eq!(root.name, "a");
        assert_eq!(root.attr("x"), Some("1"));
        assert_eq!(root.child("b").unwrap().text, "one & two");
        assert_eq!(root.children_named("b").count(), 2);
        assert!(root.child("c").unwrap().children.is_empty());
    }

    #[test]
    fn unclosed_document_is_rejected() {
        assert!(matches!(parse("<a><b></b>"), Err(DecodeError::Xml(_))));
    }

    #[test]
    fn mismatched_tags_are_rejected() {
        assert!(matches!(parse("<a><b></a>"), Err(DecodeError::Xml(_))));
    }

    #[test]
    fn document_without_elements_has_no_root() {
        assert!(matches!(
            parse("<?xml version=\"1.0\"?>"),
            Err(DecodeError::MissingElement("root"))
        ));
    }
}
