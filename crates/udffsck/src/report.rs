//! Exit-status accumulator (spec §4.6) and the structured findings a run
//! produces.

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ExitStatus: u8 {
        const OK                  = 0;
        const CORRECTED_ERRORS    = 1 << 0;
        const UNCORRECTED_ERRORS  = 1 << 1;
        const OPERATIONAL_ERROR   = 1 << 2;
        const USAGE               = 1 << 3;
    }
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        self.bits() as i32
    }
}

/// One finding surfaced during a run, independent of whether it was fixed.
#[derive(Debug, Clone)]
pub struct Finding {
    pub path: Option<String>,
    pub message: String,
    pub corrected: bool,
}

/// Accumulates findings across every phase and derives the final
/// [`ExitStatus`].
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub findings: Vec<Finding>,
    /// One formatted line per file-tree entry visited by the walker, in the
    /// fixed shape `<prefix><type>:<perm-bits> <timestamp> <size> "<name>"`
    /// (spec §6).
    pub listing: Vec<String>,
}

impl Report {
    pub fn record(&mut self, path: Option<String>, message: impl Into<String>, corrected: bool) {
        self.findings.push(Finding { path, message: message.into(), corrected });
    }

    pub fn list(&mut self, line: impl Into<String>) {
        self.listing.push(line.into());
    }

    pub fn status(&self) -> ExitStatus {
        if self.findings.is_empty() {
            return ExitStatus::OK;
        }
        let mut status = ExitStatus::empty();
        for f in &self.findings {
            status |= if f.corrected {
                ExitStatus::CORRECTED_ERRORS
            } else {
                ExitStatus::UNCORRECTED_ERRORS
            };
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_report_is_ok() {
        assert_eq!(Report::default().status(), ExitStatus::OK);
    }

    #[test]
    fn mixed_findings_set_both_bits() {
        let mut r = Report::default();
        r.record(None, "fixed something", true);
        r.record(None, "left something broken", false);
        let status = r.status();
        assert!(status.contains(ExitStatus::CORRECTED_ERRORS));
        assert!(status.contains(ExitStatus::UNCORRECTED_ERRORS));
    }
}
