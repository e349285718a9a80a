use serde_json::Value;

use super::{xml_root, FragmentParser};
use crate::demux::Fragment;
use crate::error::SchemaError;
use crate::record::Record;
use crate::xml::Element;

/// Shape of a generic document node, independent of the XML library underneath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Leaf {
        text: String,
        attributes: Vec<(String, String)>,
    },
    Sequence(Vec<TreeNode>),
    /// Ordered entries; a name repeated in the source is already grouped into a sequence.
    Mapping(Vec<(String, TreeNode)>),
}

impl TreeNode {
    /// - no element children: a leaf carrying text and attributes
    /// - two or more children sharing one name, and no attributes: a sequence
    /// - anything else: a mapping of attributes, then children, then any own text as `value`
    ///
    /// The shape decides, so a container with a single child is a mapping in one document and a
    /// sequence in the next. Use [`TreeNode::from_element_with_lists`] for fields that must stay
    /// lists.
    pub fn from_element(element: &Element) -> TreeNode {
        Self::from_element_with_lists(element, &[])
    }

    /// Like [`TreeNode::from_element`], but elements named in `list_elements` are always a
    /// sequence of their children, even with zero or one child.
    pub fn from_element_with_lists(element: &Element, list_elements: &[String]) -> TreeNode {
        let convert = |child: &Element| Self::from_element_with_lists(child, list_elements);

        if list_elements.iter().any(|name| *name == element.name) {
            return TreeNode::Sequence(element.children.iter().map(convert).collect());
        }

        if !element.has_element_children() {
            return TreeNode::Leaf {
                text: element.text.clone(),
                attributes: element.attributes.clone(),
            };
        }

        let first = &element.children[0].name;
        if element.attributes.is_empty()
            && element.children.len() > 1
            && element.children.iter().all(|c| &c.name == first)
        {
            return TreeNode::Sequence(element.children.iter().map(convert).collect());
        }

        let mut entries: Vec<(String, TreeNode)> = element
            .attributes
            .iter()
            .map(|(k, v)| {
                (
                    k.clone(),
                    TreeNode::Leaf {
                        text: v.clone(),
                        attributes: Vec::new(),
                    },
                )
            })
            .collect();

        for child in &element.children {
            let node = convert(child);
            let repeated = element.children.iter().filter(|c| c.name == child.name).count() > 1;
            if !repeated {
                entries.push((child.name.clone(), node));
                continue;
            }
            match entries.iter_mut().find(|(name, _)| name == &child.name) {
                Some((_, TreeNode::Sequence(items))) => items.push(node),
                _ => entries.push((child.name.clone(), TreeNode::Sequence(vec![node]))),
            }
        }

        if !element.text.is_empty() {
            entries.push((
                "value".to_string(),
                TreeNode::Leaf {
                    text: element.text.clone(),
                    attributes: Vec::new(),
                },
            ));
        }

        TreeNode::Mapping(entries)
    }
}

/// Leaves with attributes become `{...attributes, "value": text}`, bare leaves become strings,
/// containers recurse keeping their order.
pub fn normalize(node: &TreeNode) -> Value {
    match node {
        TreeNode::Leaf { text, attributes } if attributes.is_empty() => Value::String(text.clone()),
        TreeNode::Leaf { text, attributes } => {
            let mut record: Record = attributes
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            record.insert("value".to_string(), Value::String(text.clone()));
            Value::Object(record)
        }
        TreeNode::Sequence(items) => Value::Array(items.iter().map(normalize).collect()),
        TreeNode::Mapping(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), normalize(v)))
                .collect(),
        ),
    }
}

/// Generic parser: the whole fragment, flattened. Json fragments and rows pass through.
#[derive(Debug, Clone, Default)]
pub struct TreeParser {
    list_elements: Vec<String>,
}

impl TreeParser {
    /// Elements that always flatten to an array, however many children they have.
    pub fn with_list_elements(names: &[&str]) -> Self {
        Self {
            list_elements: names.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl FragmentParser for TreeParser {
    fn parse(&self, fragment: &Fragment) -> Result<Value, SchemaError> {
        match fragment {
            Fragment::Xml(_) => Ok(normalize(&TreeNode::from_element_with_lists(
                &xml_root(fragment)?,
                &self.list_elements,
            ))),
            Fragment::Json(value) => Ok(value.clone()),
            Fragment::Row(row) => Ok(Value::Object(row.clone())),
        }
    }
}
