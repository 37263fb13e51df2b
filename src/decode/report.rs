//! The flat tool report.
//!
//! ```text
//! 0 <ignored>
//! Droid
//! pronom-puid<TAB>pronom-puid<TAB>fmt/18
//!
//! Jhove
//! jhove-mime<TAB>jhove-mime<TAB>application/pdf
//! ```
//!
//! The first token of the first line is the return code. A line with a single
//! field opens a tool; a line with three fields sets `field2 = field3` on the
//! open tool. Everything else is skipped.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::errors::DecodeError;

/// String map that keeps the order keys first appeared in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Overwrites an existing key in place.
    pub fn insert(&mut self, key: String, value: String) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolEntry {
    pub tool_name: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolReport {
    pub return_code: String,
    pub tools: Vec<ToolEntry>,
}

impl ToolReport {
    /// First tool with the given name.
    pub fn tool(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.iter().find(|tool| tool.tool_name == name)
    }
}

pub fn parse(content: &str) -> Result<ToolReport, DecodeError> {
    if content.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut lines = content.lines();
    let return_code = lines
        .next()
        .and_then(|line| line.split_whitespace().next())
        .unwrap_or_default()
        .to_string();

    let mut tools = Vec::new();
    let mut current: Option<ToolEntry> = None;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        match fields.as_slice() {
            [name] => {
                if let Some(done) = current.take() {
                    tools.push(done);
                }
                current = Some(ToolEntry {
                    tool_name: name.trim_end().to_string(),
                    attributes: Attributes::default(),
                });
            }
            [_, key, value] => {
                if let Some(tool) = current.as_mut() {
                    tool.attributes
                        .insert(key.trim_end().to_string(), value.trim_end().to_string());
                }
            }
            _ => {}
        }
    }
    if let Some(done) = current {
        tools.push(done);
    }

    Ok(ToolReport { return_code, tools })
}
