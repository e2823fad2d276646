use std::fmt;

/// Statistics collected by a single indexing run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexReport {
    /// Files parsed on this run
    pub files_scanned: u64,
    /// Files that couldn't be read and were skipped
    pub files_skipped: u64,
    /// Malformed constructs discarded while parsing
    pub constructs_skipped: u64,
    /// Newly discovered commands
    pub inserted: u64,
    /// Existing commands whose recomputed fields changed
    pub updated: u64,
    /// Commands whose construct disappeared, deleted or tombstoned per the configured policy
    pub removed: u64,
    /// Existing commands left untouched
    pub unchanged: u64,
}

impl IndexReport {
    /// Total number of commands found on the indexed files
    pub fn total_found(&self) -> u64 {
        self.inserted + self.updated + self.unchanged
    }
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total_found() == 0 {
            write!(
                f,
                "No commands were found on {} file{}",
                self.files_scanned,
                plural_s(self.files_scanned)
            )?;
        } else {
            write!(
                f,
                "Indexed {} command{} from {} file{}",
                self.total_found(),
                plural_s(self.total_found()),
                self.files_scanned,
                plural_s(self.files_scanned)
            )?;
            let mut changes = Vec::with_capacity(3);
            if self.inserted > 0 {
                changes.push(format!("{} new", self.inserted));
            }
            if self.updated > 0 {
                changes.push(format!("{} updated", self.updated));
            }
            if self.removed > 0 {
                changes.push(format!("{} removed", self.removed));
            }
            if !changes.is_empty() {
                write!(f, " ({})", changes.join(", "))?;
            }
        }
        if self.files_skipped > 0 {
            write!(
                f,
                "\nSkipped {} unreadable file{}",
                self.files_skipped,
                plural_s(self.files_skipped)
            )?;
        }
        if self.constructs_skipped > 0 {
            write!(
                f,
                "\nSkipped {} malformed construct{}",
                self.constructs_skipped,
                plural_s(self.constructs_skipped)
            )?;
        }
        Ok(())
    }
}

/// Helper to add an "s" for plural formatting
fn plural_s(count: u64) -> &'static str {
    if count == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_report_display_empty() {
        let report = IndexReport {
            files_scanned: 2,
            ..Default::default()
        };
        assert_eq!(report.to_string(), "No commands were found on 2 files");
    }

    #[test]
    fn test_report_display_with_changes() {
        let report = IndexReport {
            files_scanned: 1,
            inserted: 2,
            updated: 1,
            unchanged: 4,
            ..Default::default()
        };
        assert_eq!(
            report.to_string(),
            "Indexed 7 commands from 1 file (2 new, 1 updated)"
        );
    }

    #[test]
    fn test_report_display_with_skips() {
        let report = IndexReport {
            files_scanned: 3,
            files_skipped: 1,
            constructs_skipped: 2,
            unchanged: 1,
            ..Default::default()
        };
        assert_eq!(
            report.to_string(),
            "Indexed 1 command from 3 files\nSkipped 1 unreadable file\nSkipped 2 malformed constructs"
        );
    }
}
