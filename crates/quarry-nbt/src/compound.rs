//! Named-tag map.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::Tag;

/// Map of unique names to tags.
///
/// Keys are kept sorted, so encoding the same compound twice always yields
/// the same bytes. Inserting an existing key replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound(BTreeMap<String, Tag>);

impl Compound {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts `value` under `key`, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Tag>) -> Option<Tag> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Tag> {
        self.0.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Tag> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Tag> {
        self.0.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, Tag> {
        self.0.keys()
    }

    // Typed getters return `None` for a missing key or a different tag type.
    // Integer getters accept any integral tag whose value fits the requested
    // width.

    pub fn get_byte(&self, key: &str) -> Option<i8> {
        i8::try_from(self.get(key)?.as_integer()?).ok()
    }

    pub fn get_short(&self, key: &str) -> Option<i16> {
        i16::try_from(self.get(key)?.as_integer()?).ok()
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        i32::try_from(self.get(key)?.as_integer()?).ok()
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        self.get(key)?.as_integer()
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_f64()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_byte(key).map(|b| b != 0)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    pub fn get_compound(&self, key: &str) -> Option<&Compound> {
        self.get(key)?.as_compound()
    }

    pub fn get_list(&self, key: &str) -> Option<&[Tag]> {
        self.get(key)?.as_list()
    }

    pub fn get_byte_array(&self, key: &str) -> Option<&[i8]> {
        self.get(key)?.as_byte_array()
    }

    pub fn get_int_array(&self, key: &str) -> Option<&[i32]> {
        self.get(key)?.as_int_array()
    }

    pub fn get_long_array(&self, key: &str) -> Option<&[i64]> {
        self.get(key)?.as_long_array()
    }
}

impl<K: Into<String>, V: Into<Tag>> FromIterator<(K, V)> for Compound {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Tag>> Extend<(K, V)> for Compound {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for Compound {
    type Item = (String, Tag);
    type IntoIter = btree_map::IntoIter<String, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Compound {
    type Item = (&'a String, &'a Tag);
    type IntoIter = btree_map::Iter<'a, String, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_existing_key() {
        let mut c = Compound::new();
        assert!(c.insert("x", 1i32).is_none());
        assert_eq!(c.insert("x", 2i32), Some(Tag::Int(1)));
        assert_eq!(c.len(), 1);
        assert_eq!(c.get_int("x"), Some(2));
    }

    #[test]
    fn test_typed_getters() {
        let c: Compound = [
            ("Y", Tag::Byte(-4)),
            ("name", Tag::from("minecraft:stone")),
            ("data", Tag::LongArray(vec![7])),
        ]
        .into_iter()
        .collect();

        assert_eq!(c.get_int("Y"), Some(-4));
        assert_eq!(c.get_str("name"), Some("minecraft:stone"));
        assert_eq!(c.get_long_array("data"), Some(&[7i64][..]));
        assert_eq!(c.get_str("Y"), None);
        assert_eq!(c.get_int("missing"), None);
    }

    #[test]
    fn test_narrowing_getters_reject_out_of_range() {
        let c: Compound = [
            ("wide", Tag::Long((1 << 32) + 5)),
            ("short", Tag::Int(300)),
            ("fits", Tag::Long(-7)),
        ]
        .into_iter()
        .collect();

        assert_eq!(c.get_int("wide"), None);
        assert_eq!(c.get_long("wide"), Some((1 << 32) + 5));
        assert_eq!(c.get_byte("short"), None);
        assert_eq!(c.get_short("short"), Some(300));
        assert_eq!(c.get_bool("short"), None);
        assert_eq!(c.get_int("fits"), Some(-7));
        assert_eq!(c.get_byte("fits"), Some(-7));
    }

    #[test]
    fn test_keys_are_sorted() {
        let c: Compound = [("z", 1i32), ("a", 2), ("m", 3)].into_iter().collect();
        let keys: Vec<&str> = c.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "m", "z"]);
    }
}
