//! Namespaced identifiers (`namespace:path`).

use std::fmt;
use std::str::FromStr;

use crate::RegistryError;

/// Namespace assumed when a key is written without one.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// A validated `namespace:path` identifier.
///
/// Namespaces allow `[a-z0-9_.-]`; paths additionally allow `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryKey {
    namespace: String,
    path: String,
}

impl RegistryKey {
    /// Parses `raw`, filling in [`DEFAULT_NAMESPACE`] when no namespace is given.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let (namespace, path) = match raw.split_once(':') {
            Some((ns, path)) => (ns, path),
            None => (DEFAULT_NAMESPACE, raw),
        };
        let valid = !namespace.is_empty()
            && !path.is_empty()
            && namespace.chars().all(is_namespace_char)
            && path.chars().all(|c| is_namespace_char(c) || c == '/');
        if !valid {
            return Err(RegistryError::InvalidKey(raw.to_string()));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

fn is_namespace_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-')
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for RegistryKey {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Canonical form of a registry entry key.
///
/// The identifier part (everything before an optional `[...]` suffix) is
/// parsed as a [`RegistryKey`]; the `[prop=value,...]` suffix has its
/// properties sorted by name. This lets block-state keys like
/// `oak_log[axis=y]` share the registry machinery.
pub(crate) fn canonicalize(raw: &str) -> Result<String, RegistryError> {
    let invalid = || RegistryError::InvalidKey(raw.to_string());
    let (ident, suffix) = match raw.find('[') {
        Some(pos) if raw.ends_with(']') => raw.split_at(pos),
        Some(_) => return Err(invalid()),
        None => (raw, ""),
    };
    let key = RegistryKey::parse(ident).map_err(|_| invalid())?;
    if suffix.is_empty() {
        return Ok(key.to_string());
    }
    let body = &suffix[1..suffix.len() - 1];
    let mut props: Vec<&str> = body.split(',').filter(|p| !p.is_empty()).collect();
    if props.iter().any(|p| !p.contains('=')) {
        return Err(invalid());
    }
    props.sort_unstable_by(|a, b| prop_name(a).cmp(prop_name(b)));
    Ok(format!("{key}[{}]", props.join(",")))
}

fn prop_name(prop: &str) -> &str {
    prop.split_once('=').map_or(prop, |(name, _)| name)
}
