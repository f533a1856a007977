use std::collections::BTreeMap;
use std::str::FromStr;

use mws_core::{ScriptError, SourceLocation};
use roxmltree::{Document, Node, NodeType};

/// Owned element tree of one content file.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<XmlElement>,
    pub text: String,
    pub location: SourceLocation,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn required_attr(&self, name: &str) -> Result<&str, ScriptError> {
        self.attr(name).ok_or_else(|| {
            ScriptError::at(
                "CONTENT_MISSING_ATTRIBUTE",
                format!("<{}> requires attribute `{}`.", self.name, name),
                self.location,
            )
        })
    }

    /// Parses an optional attribute, falling back to `default` when absent.
    pub fn parse_attr<T: FromStr>(&self, name: &str, default: T) -> Result<T, ScriptError> {
        match self.attr(name) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|_| {
                ScriptError::at(
                    "CONTENT_INVALID_ATTRIBUTE",
                    format!("<{}> attribute `{}` has invalid value `{}`.", self.name, name, raw),
                    self.location,
                )
            }),
        }
    }

    pub fn elements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }
}

pub fn parse_xml_document(source: &str) -> Result<XmlElement, ScriptError> {
    let document = Document::parse(source)
        .map_err(|error| ScriptError::new("CONTENT_XML_PARSE_ERROR", error.to_string()))?;

    let Some(root) = document.root().children().find(|node| node.is_element()) else {
        return Err(ScriptError::new(
            "CONTENT_XML_PARSE_ERROR",
            "XML document must contain a root element.",
        ));
    };

    Ok(parse_element(&document, root))
}

fn parse_element(document: &Document<'_>, node: Node<'_, '_>) -> XmlElement {
    let mut attributes = BTreeMap::new();
    for attribute in node.attributes() {
        attributes.insert(attribute.name().to_string(), attribute.value().to_string());
    }

    let mut children = Vec::new();
    let mut text = String::new();
    for child in node.children() {
        match child.node_type() {
            NodeType::Element => children.push(parse_element(document, child)),
            NodeType::Text => text.push_str(child.text().unwrap_or_default()),
            _ => {}
        }
    }

    let position = document.text_pos_at(node.range().start);
    XmlElement {
        name: node.tag_name().name().to_string(),
        attributes,
        children,
        text,
        location: SourceLocation {
            line: position.row as usize,
            column: position.col as usize,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_tree_with_attributes_and_cdata_text() {
        let source = "<content>\n  <script name=\"foo\"><![CDATA[begin\nend]]></script>\n</content>";
        let root = parse_xml_document(source).expect("xml should parse");
        assert_eq!(root.name, "content");
        let script = root.elements("script").next().expect("script element");
        assert_eq!(script.attr("name"), Some("foo"));
        assert_eq!(script.text, "begin\nend");
        assert_eq!(script.location.line, 2);
    }

    #[test]
    fn attribute_helpers_report_missing_and_invalid_values() {
        let root = parse_xml_document(r#"<global name="x" value="abc"/>"#).expect("xml");
        assert_eq!(root.required_attr("name").expect("name"), "x");
        let missing = root.required_attr("type").expect_err("type is missing");
        assert_eq!(missing.code, "CONTENT_MISSING_ATTRIBUTE");
        let invalid = root.parse_attr::<f32>("value", 0.0).expect_err("not a number");
        assert_eq!(invalid.code, "CONTENT_INVALID_ATTRIBUTE");
        assert_eq!(root.parse_attr::<i32>("absent", 4).expect("default"), 4);
    }

    #[test]
    fn comments_are_skipped() {
        let root = parse_xml_document("<content><!-- note --><form id=\"1\" name=\"a\"/></content>")
            .expect("xml");
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn invalid_xml_is_a_parse_error() {
        let error = parse_xml_document("<content>").expect_err("unterminated");
        assert_eq!(error.code, "CONTENT_XML_PARSE_ERROR");
    }
}
