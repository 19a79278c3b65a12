use crate::error::{ConsoleError, ConsoleResult};
use regex::{NoExpand, Regex, RegexBuilder};
use std::collections::BTreeMap;

/// Session variables referenced from command arguments as `$name`.
///
/// Names are made of word characters only. Values are stored trimmed, and an
/// empty value removes the variable instead of storing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    vars: BTreeMap<String, String>,
}

impl Variables {
    /// Create an empty variable store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a store from previously persisted values.
    ///
    /// Entries that could never have been stored (bad names, empty values) are dropped.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        let vars = vars
            .into_iter()
            .filter(|(k, v)| k.chars().all(is_word_char) && !v.trim().is_empty())
            .collect();
        Self { vars }
    }

    /// Set, update or remove a variable.
    ///
    /// Fails with [`ConsoleError::InvalidToken`] naming the first non-word character
    /// of `name`. A value that is blank after trimming removes the variable.
    pub fn set(&mut self, name: &str, value: &str) -> ConsoleResult<()> {
        if let Some(ch) = name.chars().find(|c| !is_word_char(*c)) {
            return Err(ConsoleError::InvalidToken {
                name: name.to_string(),
                ch,
            });
        }
        let value = value.trim();
        if value.is_empty() {
            self.vars.remove(name);
        } else {
            self.vars.insert(name.to_string(), value.to_string());
        }
        Ok(())
    }

    /// Get the value of a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Replace every `$name` reference in `arg` with the variable's value.
    ///
    /// Matching is case-insensitive and stops at a word boundary, so `$foo` does not
    /// match inside `$foobar`. Arguments starting with `-` are returned untouched.
    pub fn substitute(&self, arg: &str) -> String {
        if arg.starts_with('-') || !arg.contains('$') {
            return arg.to_string();
        }
        let mut result = arg.to_string();
        for (name, value) in &self.vars {
            let Some(re) = reference_regex(name) else {
                continue;
            };
            result = re.replace_all(&result, NoExpand(value)).into_owned();
        }
        result
    }

    /// All variables as `(name, value)` pairs, sorted by name.
    pub fn list(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn reference_regex(name: &str) -> Option<Regex> {
    let pattern = format!(r"\${}\b", regex::escape(name));
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}
