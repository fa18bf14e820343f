//! XML and HTML recognition.

use super::{Header, Recognizer, Source};
use crate::Result;
use regex::Regex;
use roxmltree::{Document, Node, ParsingOptions};
use std::collections::HashSet;
use std::sync::LazyLock;

static DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!DOCTYPE\s+([^\s>\[]+)").unwrap());

/// Parse an XML document, allowing an inline DTD as several exports carry one.
pub fn parse_document(text: &str) -> Result<Document<'_>> {
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    Ok(Document::parse_with_options(text, options)?)
}

/// Canonical `<!DOCTYPE NAME>` form of the document type declaration, if any.
pub fn doctype(text: &str) -> Option<String> {
    DOCTYPE
        .captures(text)
        .map(|caps| format!("<!DOCTYPE {}>", &caps[1]))
}

/// Child elements of `node` with the given tag name.
pub fn children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |child| child.is_element() && child.tag_name().name() == tag)
}

/// First child element with the given tag name.
pub fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

/// Text of the first child element with the given tag name.
pub fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    child(node, tag).and_then(|n| n.text())
}

/// All elements reached by following a slash separated path of tag names.
pub fn find_all<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Vec<Node<'a, 'input>> {
    let mut current = vec![node];
    for step in path.split('/').filter(|step| !step.is_empty()) {
        current = current
            .into_iter()
            .flat_map(|n| {
                n.children()
                    .filter(|c| c.is_element() && c.tag_name().name() == step)
                    .collect::<Vec<_>>()
            })
            .collect();
    }
    current
}

/// Recognizer for XML exports.
pub struct XmlRecognizer {
    text: String,
    root: Option<String>,
    doctype: Option<String>,
}

impl XmlRecognizer {
    pub fn open(source: &Source) -> Result<Self> {
        Ok(Self {
            text: source.read_text()?,
            root: None,
            doctype: None,
        })
    }
}

impl Recognizer for XmlRecognizer {
    fn is_format(&mut self) -> bool {
        let root = match parse_document(&self.text) {
            Ok(document) => document.root_element().tag_name().name().to_string(),
            Err(_) => return false,
        };
        self.root = Some(root);
        self.doctype = doctype(&self.text);
        true
    }

    fn check_header(&self, header: &Header, _only: bool) -> bool {
        let Header::Xml { doctype, root } = header else {
            return false;
        };
        if let Some(found) = &self.doctype {
            if Some(found.as_str()) != *doctype {
                return false;
            }
        }
        self.root.as_deref() == Some(*root)
    }
}

/// Slash separated tag paths of every element below `root`.
fn element_paths(root: Node<'_, '_>) -> HashSet<String> {
    let mut paths = HashSet::new();
    let mut pending: Vec<(Node<'_, '_>, String)> = root
        .children()
        .filter(Node::is_element)
        .map(|node| (node, node.tag_name().name().to_string()))
        .collect();
    while let Some((node, path)) = pending.pop() {
        for child in node.children().filter(Node::is_element) {
            pending.push((child, format!("{}/{}", path, child.tag_name().name())));
        }
        paths.insert(path);
    }
    paths
}

/// Recognizer for HTML exports that are well-formed XHTML.
pub struct HtmlRecognizer {
    text: String,
    /// Element paths below `<html>`, filled by `is_format`.
    paths: HashSet<String>,
}

impl HtmlRecognizer {
    pub fn open(source: &Source) -> Result<Self> {
        Ok(Self {
            text: source.read_text()?,
            paths: HashSet::new(),
        })
    }
}

impl Recognizer for HtmlRecognizer {
    fn is_format(&mut self) -> bool {
        let Ok(document) = parse_document(&self.text) else {
            return false;
        };
        let root = document.root_element();
        if root.tag_name().name() != "html" {
            return false;
        }
        self.paths = element_paths(root);
        true
    }

    fn check_header(&self, header: &Header, _only: bool) -> bool {
        let Header::Html(path) = header else {
            return false;
        };
        let path: Vec<&str> = path.split('/').filter(|step| !step.is_empty()).collect();
        self.paths.contains(&path.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEEPASSX: &str = "<!DOCTYPE KEEPASSX_DATABASE>\n<database>\n<group><title>Internet</title></group>\n</database>\n";

    fn xml(text: &str) -> XmlRecognizer {
        let mut recognizer = XmlRecognizer::open(&Source::memory(text.as_bytes().to_vec())).unwrap();
        assert!(recognizer.is_format());
        recognizer
    }

    #[test]
    fn test_doctype_must_match_when_present() {
        let recognizer = xml(KEEPASSX);
        let keepassx = Header::Xml {
            doctype: Some("<!DOCTYPE KEEPASSX_DATABASE>"),
            root: "database",
        };
        let other = Header::Xml {
            doctype: None,
            root: "database",
        };
        assert!(recognizer.check_header(&keepassx, false));
        assert!(!recognizer.check_header(&other, false));
    }

    #[test]
    fn test_root_tag() {
        let recognizer = xml("<?xml version=\"1.0\"?><KeePassFile><Root/></KeePassFile>");
        let header = Header::Xml {
            doctype: None,
            root: "KeePassFile",
        };
        assert!(recognizer.check_header(&header, false));
        let revelation = Header::Xml {
            doctype: None,
            root: "revelationdata",
        };
        assert!(!recognizer.check_header(&revelation, false));
    }

    #[test]
    fn test_invalid_xml() {
        let source = Source::memory(b"title,login\na,b\n".to_vec());
        let mut recognizer = XmlRecognizer::open(&source).unwrap();
        assert!(!recognizer.is_format());
    }

    #[test]
    fn test_html_path() {
        let text = "<html><body><div><div><textarea>[]</textarea></div></div></body></html>";
        let mut recognizer = HtmlRecognizer::open(&Source::memory(text.as_bytes().to_vec())).unwrap();
        assert!(recognizer.is_format());
        assert!(recognizer.check_header(&Header::Html("body/div/div/textarea"), false));
        assert!(!recognizer.check_header(&Header::Html("body/form"), false));
        assert!(!recognizer.check_header(&Header::Html("textarea"), false));
    }

    #[test]
    fn test_html_header_needs_html_root() {
        let text = "<body><div><div><textarea>[]</textarea></div></div></body>";
        let mut recognizer = HtmlRecognizer::open(&Source::memory(text.as_bytes().to_vec())).unwrap();
        assert!(!recognizer.is_format());
        assert!(!recognizer.check_header(&Header::Html("div/div/textarea"), false));
    }

    #[test]
    fn test_find_all() {
        let document = parse_document("<a><b><c>1</c></b><b><c>2</c></b></a>").unwrap();
        let found = find_all(document.root_element(), "b/c");
        let texts: Vec<_> = found.iter().filter_map(|n| n.text()).collect();
        assert_eq!(texts, vec!["1", "2"]);
    }
}
