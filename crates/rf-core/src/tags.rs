//! Tag map alias and accessors.

use std::collections::BTreeMap;

/// Element tags.  A `BTreeMap` so that document emission iterates in a
/// stable order without an explicit sort pass.
pub type TagMap = BTreeMap<String, String>;

/// `true` if `key` is present with exactly the value `value`.
#[inline]
pub fn tag_is(tags: &TagMap, key: &str, value: &str) -> bool {
    tags.get(key).is_some_and(|v| v == value)
}

/// The tag value, or `""` when absent.
#[inline]
pub fn tag_or_empty<'t>(tags: &'t TagMap, key: &str) -> &'t str {
    tags.get(key).map_or("", String::as_str)
}

/// Build a [`TagMap`] from string pairs — test and fixture convenience.
pub fn tag_map<const N: usize>(pairs: [(&str, &str); N]) -> TagMap {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}
