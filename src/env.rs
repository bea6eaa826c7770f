//! Snapshot of the process environment.

use std::collections::BTreeMap;
use std::ffi::OsString;

use serde::ser::{Serialize, Serializer};

/// How keys of an [`EnvSnapshot`] are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyComparison {
    #[default]
    CaseSensitive,
    CaseInsensitive,
}

impl KeyComparison {
    fn fold(self, key: &str) -> String {
        match self {
            KeyComparison::CaseSensitive => key.to_string(),
            KeyComparison::CaseInsensitive => key.to_lowercase(),
        }
    }
}

/// Immutable copy of the environment taken at one point in time.
///
/// Variables whose name or value is not valid Unicode are left out. With
/// [`KeyComparison::CaseInsensitive`] the first of several names that differ
/// only in case wins.
#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    comparison: KeyComparison,
    // folded key -> (original name, value)
    vars: BTreeMap<String, (String, String)>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    pub fn capture(comparison: KeyComparison) -> Self {
        Self::from_vars(comparison, std::env::vars_os())
    }

    pub fn from_vars<I>(comparison: KeyComparison, vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut map = BTreeMap::new();
        for (name, value) in vars {
            let (Ok(name), Ok(value)) = (name.into_string(), value.into_string()) else {
                continue;
            };
            map.entry(comparison.fold(&name)).or_insert((name, value));
        }
        EnvSnapshot { comparison, vars: map }
    }

    pub fn comparison(&self) -> KeyComparison {
        self.comparison
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(&self.comparison.fold(name)).map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.vars.contains_key(&self.comparison.fold(name))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Variables as `(name, value)` in key order, names as originally spelled.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.values().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for EnvSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(OsString, OsString)> {
        pairs.iter().map(|(k, v)| (OsString::from(k), OsString::from(v))).collect()
    }

    #[test]
    fn case_sensitive_keeps_distinct_spellings() {
        let snap = EnvSnapshot::from_vars(
            KeyComparison::CaseSensitive,
            vars(&[("Path", "a"), ("PATH", "b")]),
        );
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.get("PATH"), Some("b"));
        assert_eq!(snap.get("path"), None);
    }

    #[test]
    fn case_insensitive_first_entry_wins() {
        let snap = EnvSnapshot::from_vars(
            KeyComparison::CaseInsensitive,
            vars(&[("Path", "a"), ("PATH", "b")]),
        );
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get("path"), Some("a"));
        assert!(snap.contains_key("PATH"));
        assert_eq!(snap.iter().next(), Some(("Path", "a")));
    }

    #[cfg(unix)]
    #[test]
    fn skips_values_that_are_not_unicode() {
        use std::os::unix::ffi::OsStringExt;
        let mut input = vars(&[("GOOD", "yes")]);
        input.push((OsString::from("BAD"), OsString::from_vec(vec![0xFF, 0xFE])));
        let snap = EnvSnapshot::from_vars(KeyComparison::CaseSensitive, input);
        assert_eq!(snap.len(), 1);
        assert!(!snap.contains_key("BAD"));
    }

    #[test]
    fn serializes_as_a_flat_map() {
        let snap =
            EnvSnapshot::from_vars(KeyComparison::CaseSensitive, vars(&[("B", "2"), ("A", "1")]));
        assert_eq!(serde_json::to_string(&snap).unwrap(), r#"{"A":"1","B":"2"}"#);
    }

    #[test]
    fn capture_sees_the_process_environment() {
        let snap = EnvSnapshot::capture(KeyComparison::CaseSensitive);
        for (name, value) in std::env::vars_os() {
            if let (Some(name), Some(value)) = (name.to_str(), value.to_str()) {
                assert_eq!(snap.get(name), Some(value));
            }
        }
    }
}
