//! A small owned element tree over `quick-xml`.
//!
//! Upstream documents are small enough (one batch of entities) to hold in memory, and the
//! demultiplexers and parsers need random access to the tree, so events are folded into
//! [`Element`]s once and queried from there.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::SchemaError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    /// In document order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Concatenated text directly inside this element, trimmed.
    pub text: String,
}

fn malformed(message: impl ToString) -> SchemaError {
    SchemaError::Malformed {
        format: "xml",
        message: message.to_string(),
    }
}

fn start_element(start: &BytesStart<'_>) -> Result<Element, SchemaError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(malformed)?
        .to_string();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(malformed)?
            .to_string();
        let value = attr.unescape_value().map_err(malformed)?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        ..Default::default()
    })
}

fn push_text(element: &mut Element, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !element.text.is_empty() {
        element.text.push(' ');
    }
    element.text.push_str(text);
}

impl Element {
    /// Parse a document (or a serialized fragment) and return its root element.
    pub fn parse(xml: &str) -> Result<Element, SchemaError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event().map_err(malformed)? {
                Event::Start(start) => stack.push(start_element(&start)?),
                Event::Empty(start) => {
                    let element = start_element(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None if root.is_none() => root = Some(element),
                        None => return Err(malformed("more than one root element")),
                    }
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| malformed("unbalanced end tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None if root.is_none() => root = Some(element),
                        None => return Err(malformed("more than one root element")),
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let text = text.unescape().map_err(malformed)?;
                        push_text(current, &text);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        let raw = data.into_inner();
                        push_text(current, &String::from_utf8_lossy(&raw));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(malformed("unexpected end of document"));
        }
        root.ok_or_else(|| malformed("document has no root element"))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Like [`Element::attr`] but a missing attribute is a schema error.
    pub fn required_attr(&self, name: &str) -> Result<&str, SchemaError> {
        self.attr(name)
            .ok_or_else(|| SchemaError::missing(format!("{}@{}", self.name, name)))
    }

    pub fn has_element_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// First direct child called `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Every element below this one, depth first in document order.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        fn walk<'a>(element: &'a Element, out: &mut Vec<&'a Element>) {
            for child in &element.children {
                out.push(child);
                walk(child, out);
            }
        }
        walk(self, &mut out);
        out
    }

    /// Descendants called `name` whose attributes include every pair in `attrs`.
    pub fn find_all(&self, name: &str, attrs: &[(&str, &str)]) -> Vec<&Element> {
        self.descendants()
            .into_iter()
            .filter(|e| e.name == name && attrs.iter().all(|(k, v)| e.attr(k) == Some(*v)))
            .collect()
    }

    pub fn find(&self, name: &str, attrs: &[(&str, &str)]) -> Option<&Element> {
        self.find_all(name, attrs).into_iter().next()
    }

    /// Elements matching a CSS-like selector, relative to this element (which never matches
    /// itself). Steps are separated by whitespace (any descendant) or `>` (direct child), and each
    /// step may carry `[Attr=value]` filters:
    /// `"ClinicalAssertionList > GermlineList > Germline"`,
    /// `"SequenceLocation[Assembly=GRCh37]"`, `"AttributeSet Attribute"`.
    pub fn select(&self, selector: &str) -> Vec<&Element> {
        let steps = parse_selector(selector);
        let mut current: Vec<&Element> = vec![self];
        for (axis, step) in &steps {
            let mut next: Vec<&Element> = Vec::new();
            for element in current {
                let candidates = match axis {
                    Axis::Child => element.children.iter().collect::<Vec<_>>(),
                    Axis::Descendant => element.descendants(),
                };
                for candidate in candidates {
                    if step.matches(candidate) && !next.iter().any(|e| std::ptr::eq(*e, candidate))
                    {
                        next.push(candidate);
                    }
                }
            }
            current = next;
        }
        if steps.is_empty() {
            return Vec::new();
        }
        current
    }

    pub fn select_one(&self, selector: &str) -> Option<&Element> {
        self.select(selector).into_iter().next()
    }

    /// The single element matching `selector`; zero or several is a cardinality error.
    pub fn select_exactly_one(&self, selector: &str) -> Result<&Element, SchemaError> {
        let mut found = self.select(selector);
        if found.len() != 1 {
            return Err(SchemaError::exactly_one(selector, found.len()));
        }
        Ok(found.remove(0))
    }

    /// Serialize back to XML. Parsing the output gives an equal element.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push_str(&format!(" {}=\"{}\"", key, escape(value.as_str())));
        }
        if self.children.is_empty() && self.text.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        out.push_str(&escape(self.text.as_str()));
        for child in &self.children {
            child.write_xml(out);
        }
        out.push_str(&format!("</{}>", self.name));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Default)]
struct Step {
    name: String,
    filters: Vec<(String, String)>,
}

impl Step {
    fn matches(&self, element: &Element) -> bool {
        (self.name == "*" || element.name == self.name)
            && self
                .filters
                .iter()
                .all(|(k, v)| element.attr(k) == Some(v.as_str()))
    }
}

fn parse_step(raw: &str) -> Step {
    let (name, mut rest) = match raw.find('[') {
        Some(i) => (&raw[..i], &raw[i..]),
        None => (raw, ""),
    };
    let mut step = Step {
        name: name.to_string(),
        filters: Vec::new(),
    };
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(end) = stripped.find(']') else { break };
        let filter = &stripped[..end];
        if let Some((key, value)) = filter.split_once('=') {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            step.filters.push((key.trim().to_string(), value.to_string()));
        }
        rest = &stripped[end + 1..];
    }
    step
}

// Attribute values may contain spaces ("HGVS, coding, RefSeq"), so tokens are split outside
// brackets only.
fn parse_selector(selector: &str) -> Vec<(Axis, Step)> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in selector.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '>' if depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(">".to_string());
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    let mut steps = Vec::new();
    let mut axis = Axis::Descendant;
    for token in tokens {
        if token == ">" {
            axis = Axis::Child;
            continue;
        }
        steps.push((axis, parse_step(&token)));
        axis = Axis::Descendant;
    }
    steps
}
