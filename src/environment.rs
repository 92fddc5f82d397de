//! Where configuration values are read from and published to.

use std::collections::BTreeMap;

/// A key/value environment.
pub trait Environment {
    /// Returns the value of `key`, if set.
    ///
    /// A set value that is not valid UTF-8 is returned lossily converted;
    /// it still counts as set.
    fn var(&self, key: &str) -> Option<String>;

    /// Sets `key` to `value`, replacing any previous value.
    fn set_var(&mut self, key: &str, value: &str);
}

/// The real process environment.
///
/// Writing the process environment is only sound while no other thread
/// reads or writes it. Use this during single-threaded startup, before
/// the daemon spawns anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var_os(key).map(|v| v.to_string_lossy().into_owned())
    }

    fn set_var(&mut self, key: &str, value: &str) {
        // SAFETY: bootstrap runs before any other thread exists; see the
        // type-level docs.
        unsafe { std::env::set_var(key, value) };
    }
}

/// An in-memory environment, for tests and dry runs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryEnvironment {
    vars: BTreeMap<String, String>,
}

impl MemoryEnvironment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of variables set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if nothing is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterates over variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Environment for MemoryEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn set_var(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_owned(), value.to_owned());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites() {
        let mut env = MemoryEnvironment::new();
        env.set_var("IP", "127.0.0.1");
        env.set_var("IP", "10.0.0.1");
        assert_eq!(env.var("IP").as_deref(), Some("10.0.0.1"));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn process_var_keeps_non_utf8_values() {
        use std::os::unix::ffi::OsStrExt;

        let key = "DNSCACHE_BOOTSTRAP_NON_UTF8_VALUE";
        let value = std::ffi::OsStr::from_bytes(b"Europe/\xffX");
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var(key, value) };

        assert_eq!(ProcessEnvironment.var(key).as_deref(), Some("Europe/\u{fffd}X"));
        assert!(ProcessEnvironment.var("DNSCACHE_BOOTSTRAP_NEVER_SET").is_none());
    }

    #[test]
    fn collect_from_pairs() {
        let env: MemoryEnvironment = [("TZ", "UTC")].into_iter().collect();
        assert_eq!(env.var("TZ").as_deref(), Some("UTC"));
        assert!(env.var("ROOT").is_none());
    }
}
