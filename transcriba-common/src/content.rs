//! Revision content tree
//!
//! Transcriptions are stored as a tree of typed elements (root, page,
//! heading, paragraph, line, text parts). The editor marks touched elements
//! with `isDirty`; the server only keeps the four known fields.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One node of a transcription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeiElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: Value,
    pub children: Vec<TeiElement>,
    #[serde(rename = "isDirty")]
    pub is_dirty: bool,
}

impl TeiElement {
    /// Content of the first revision of every imported object
    pub fn empty_root() -> Self {
        Self {
            kind: "root".to_string(),
            properties: Value::Object(Default::default()),
            children: Vec::new(),
            is_dirty: false,
        }
    }

    /// Parse editor content, rejecting nodes without the four required keys
    ///
    /// Unknown keys are dropped.
    pub fn from_value(value: Value) -> Result<Self> {
        if !Self::is_valid(&value) {
            return Err(Error::WrongFormat);
        }
        serde_json::from_value(value).map_err(|_| Error::WrongFormat)
    }

    /// True when every node carries `type`, `children`, `properties`, `isDirty`
    pub fn is_valid(value: &Value) -> bool {
        let Some(node) = value.as_object() else {
            return false;
        };
        let has_keys = ["type", "children", "properties", "isDirty"]
            .iter()
            .all(|key| node.get(*key).is_some_and(|v| !v.is_null()));
        if !has_keys {
            return false;
        }
        match node.get("children").and_then(Value::as_array) {
            Some(children) => children.iter().all(Self::is_valid),
            None => false,
        }
    }

    /// Copy prepared for saving
    ///
    /// With `mark_untouched` every node is reset to not dirty, which is what
    /// a freshly occupied revision starts from.
    pub fn clean_up(&self, mark_untouched: bool) -> Self {
        Self {
            kind: self.kind.clone(),
            properties: self.properties.clone(),
            children: self
                .children
                .iter()
                .map(|child| child.clean_up(mark_untouched))
                .collect(),
            is_dirty: self.is_dirty && !mark_untouched,
        }
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TeiElement::node_count).sum::<usize>()
    }
}
