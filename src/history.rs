use std::collections::HashSet;

/// Previously entered lines plus the recall cursor.
///
/// The cursor sits at `len()` when no entry is recalled. Every mutation
/// (`record`, `clear`, `clean`, `set_limit`) moves it back there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
    position: usize,
    limit: Option<usize>,
}

impl History {
    /// Create an empty, unlimited history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore history from persisted entries and limit.
    pub fn from_entries(entries: Vec<String>, limit: Option<usize>) -> Self {
        let mut history = Self {
            entries,
            position: 0,
            limit: limit.filter(|n| *n > 0),
        };
        history.enforce_limit();
        history
    }

    /// Append `line` unless it repeats the last entry, then drop the oldest
    /// entries beyond the limit and reset the cursor.
    pub fn record(&mut self, line: &str) {
        if self.entries.last().map(String::as_str) != Some(line) {
            self.entries.push(line.to_string());
        }
        self.enforce_limit();
    }

    /// Step back to the previous entry. `None` when already at the oldest one.
    pub fn recall_previous(&mut self) -> Option<String> {
        if self.position == 0 {
            return None;
        }
        self.position -= 1;
        self.entries.get(self.position).cloned()
    }

    /// Step forward to the next entry; past the newest entry this yields an empty
    /// line. `None` when no entry is being recalled.
    pub fn recall_next(&mut self) -> Option<String> {
        if self.position >= self.entries.len() {
            return None;
        }
        self.position += 1;
        Some(self.entries.get(self.position).cloned().unwrap_or_default())
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = 0;
    }

    /// Remove duplicates, keeping the first occurrence of each line, and drop the
    /// lines whose first word is not one of `valid_commands`.
    pub fn clean(&mut self, valid_commands: &HashSet<String>) {
        let mut seen = HashSet::new();
        self.entries.retain(|entry| {
            let leading = entry.split_whitespace().next().unwrap_or_default();
            valid_commands.contains(leading) && seen.insert(entry.clone())
        });
        self.position = self.entries.len();
    }

    /// Set the maximum number of entries. `None` removes the limit.
    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit.filter(|n| *n > 0);
        self.enforce_limit();
    }

    /// The maximum number of entries, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The recall cursor; equals `len()` when no entry is recalled.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Put the cursor back at rest, past the newest entry.
    pub fn reset_position(&mut self) {
        self.position = self.entries.len();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn enforce_limit(&mut self) {
        if let Some(limit) = self.limit {
            if self.entries.len() > limit {
                let excess = self.entries.len() - limit;
                self.entries.drain(..excess);
            }
        }
        self.reset_position();
    }
}
