/// Submitted command lines with a browsing cursor.
///
/// The cursor is the distance from the most recent entry; `None` means the
/// operator is not browsing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandHistory {
    entries: Vec<String>,
    cursor: Option<usize>,
}

impl CommandHistory {
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a submitted line and stops browsing.
    pub fn record(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
        self.cursor = None;
    }

    pub fn stop_browsing(&mut self) {
        self.cursor = None;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// Moves toward older entries, clamped at the oldest one.
    pub fn up(&mut self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }

        let oldest = self.entries.len() - 1;
        let offset = match self.cursor {
            Some(offset) => (offset + 1).min(oldest),
            None => 0,
        };
        self.cursor = Some(offset);
        self.entry_at(offset)
    }

    /// Moves toward newer entries.
    ///
    /// Stepping past the newest entry stops browsing and yields an empty
    /// line. Returns `None` when not browsing.
    pub fn down(&mut self) -> Option<String> {
        match self.cursor? {
            0 => {
                self.cursor = None;
                Some(String::new())
            }
            offset => {
                let entry = self.entry_at(offset);
                self.cursor = Some(offset - 1);
                entry
            }
        }
    }

    fn entry_at(&self, offset: usize) -> Option<String> {
        let index = self.entries.len().checked_sub(offset + 1)?;
        self.entries.get(index).cloned()
    }
}
