/// Outcome of one result for one side, before anything is persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideUpdate {
    pub rating_before: i32,
    pub rating_after: i32,
    pub expected_score: f64,
    pub actual_score: f64,
    pub delta: i32,
}

/// Both sides of a head-to-head update, in participant order.
pub type PairUpdate = [SideUpdate; 2];

/// What `apply_result` did with a result.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied(PairUpdate),
    AlreadyApplied,
}

impl ApplyOutcome {
    pub fn was_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied(_))
    }
}

/// Summary of a bulk application run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplySummary {
    pub applied: usize,
    pub skipped: usize,
}
