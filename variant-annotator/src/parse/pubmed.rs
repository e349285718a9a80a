use serde_json::{json, Value};

use super::{normalize, xml_root, FragmentParser, TreeNode};
use crate::demux::Fragment;
use crate::error::SchemaError;
use crate::record::{access_deep_keys, insert_opt, Record};

const PMID: &str = "MedlineCitation.PMID";
const TITLE: &str = "MedlineCitation.Article.ArticleTitle";
const JOURNAL: &str = "MedlineCitation.Article.Journal.Title";
const YEAR: &str = "MedlineCitation.Article.Journal.JournalIssue.PubDate.Year";
const AUTHORS: &str = "MedlineCitation.Article.AuthorList";

/// Parses one `<PubmedArticle>` into a short citation, keeping the whole flattened article
/// under `article`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PubmedParser;

impl FragmentParser for PubmedParser {
    fn parse(&self, fragment: &Fragment) -> Result<Value, SchemaError> {
        let root = xml_root(fragment)?;
        let Value::Object(article) = normalize(&TreeNode::from_element(&root)) else {
            return Err(SchemaError::missing("MedlineCitation"));
        };

        let fields = access_deep_keys(&[PMID, TITLE, JOURNAL, YEAR, AUTHORS], &article, '.', true)?;

        let mut info = Record::new();
        let pmid = text_of(&fields[PMID]).ok_or_else(|| SchemaError::missing(PMID))?;
        info.insert("pmid".into(), json!(pmid));
        insert_opt(&mut info, "title", text_of(&fields[TITLE]));
        insert_opt(&mut info, "journal", text_of(&fields[JOURNAL]));
        insert_opt(&mut info, "year", text_of(&fields[YEAR]));
        info.insert("authors".into(), json!(authors(&fields[AUTHORS])));
        info.insert("article".into(), Value::Object(article));

        Ok(Value::Object(info))
    }
}

/// Text of a flattened leaf: a plain string, or the `value` of a leaf that had attributes
/// (like `<PMID Version="1">`).
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Object(leaf) => leaf.get("value").and_then(text_of),
        _ => None,
    }
}

/// `"LastName Initials"` per author, or the collective name for group authors.
fn authors(author_list: &Value) -> Vec<String> {
    let entries = match author_list {
        // <AuthorList> with no attributes and several <Author> flattens to a bare list.
        Value::Array(items) => items.clone(),
        Value::Object(list) => match list.get("Author") {
            Some(Value::Array(items)) => items.clone(),
            Some(author) => vec![author.clone()],
            None => Vec::new(),
        },
        _ => Vec::new(),
    };

    entries
        .iter()
        .filter_map(|author| {
            let last = author.get("LastName").and_then(text_of);
            let initials = author.get("Initials").and_then(text_of);
            match (last, initials) {
                (Some(last), Some(initials)) => Some(format!("{last} {initials}")),
                (Some(last), None) => Some(last),
                _ => author.get("CollectiveName").and_then(text_of),
            }
        })
        .collect()
}
