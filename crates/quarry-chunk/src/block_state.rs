//! Block states as stored in section palettes.
//!
//! On disk a palette entry is a compound `{Name: "minecraft:oak_log",
//! Properties: {axis: "y"}}`. In the block-state registry the same state is
//! the key `minecraft:oak_log[axis=y]`, with properties sorted by name.

use std::collections::BTreeMap;
use std::fmt;

use quarry_nbt::{Compound, Tag};

/// A block name plus its property values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockState {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(property.into(), value.into());
        self
    }

    /// Parses a registry key of the form `name` or `name[k=v,...]`.
    pub fn from_key(key: &str) -> Option<Self> {
        let Some((name, rest)) = key.split_once('[') else {
            return Some(Self::new(key));
        };
        let body = rest.strip_suffix(']')?;
        let mut state = Self::new(name);
        for pair in body.split(',').filter(|p| !p.is_empty()) {
            let (k, v) = pair.split_once('=')?;
            state.properties.insert(k.to_string(), v.to_string());
        }
        Some(state)
    }

    /// Reads a palette entry compound. `Properties` is optional; non-string
    /// property values are skipped.
    pub fn from_compound(tag: &Compound) -> Option<Self> {
        let mut state = Self::new(tag.get_str("Name")?);
        if let Some(props) = tag.get_compound("Properties") {
            for (k, v) in props.iter() {
                if let Some(v) = v.as_str() {
                    state.properties.insert(k.clone(), v.to_string());
                }
            }
        }
        Some(state)
    }

    /// Palette entry compound; `Properties` is omitted when empty.
    pub fn to_compound(&self) -> Compound {
        let mut tag = Compound::new();
        tag.insert("Name", self.name.as_str());
        if !self.properties.is_empty() {
            let props: Compound = self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), Tag::from(v.as_str())))
                .collect();
            tag.insert("Properties", props);
        }
        tag
    }
}

/// Formats as the registry key.
impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.properties.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, (k, v)) in self.properties.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("]")
    }
}
