/// Counters for one run of a reconciliation job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entries (or deals) the job tried to act on
    pub attempted: usize,
    pub flushed: usize,
    pub failed: usize,
    pub evicted: usize,
    /// Expired deals driven to `ended`
    pub finished: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A previous run of the same job was still in progress
    Skipped,
    Completed(TickReport),
}

impl TickOutcome {
    pub fn report(&self) -> Option<TickReport> {
        match self {
            TickOutcome::Skipped => None,
            TickOutcome::Completed(report) => Some(*report),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TickOutcome::Skipped)
    }
}
