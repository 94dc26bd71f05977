//! Search and inprocessing statistics.
use log::info;

/// Counters updated during search and inprocessing.
#[derive(Default)]
pub struct Stats {
    pub conflicts: u64,
    pub decisions: u64,
    pub propagations: u64,
    pub restarts: u64,
    pub reductions: u64,
    pub learned_clauses: u64,
    pub learned_lits: u64,
    pub deleted_clauses: u64,
    pub imported_clauses: u64,
    pub exported_clauses: u64,
    pub inprocessings: u64,
    pub eliminated_vars: u64,
    pub substituted_vars: u64,
    pub subsumed_clauses: u64,
    pub strengthened_clauses: u64,
    pub blocked_clauses: u64,
    pub failed_lits: u64,
    pub vivified_clauses: u64,
    pub compactions: u64,
    pub solves: u64,
}

impl Stats {
    /// Average length of learned clauses.
    pub fn avg_learned_len(&self) -> f64 {
        if self.learned_clauses == 0 {
            0.0
        } else {
            self.learned_lits as f64 / self.learned_clauses as f64
        }
    }

    /// Log a statistics summary.
    pub fn log_summary(&self) {
        info!(
            "stats: conflicts: {} decisions: {} propagations: {} restarts: {}",
            self.conflicts, self.decisions, self.propagations, self.restarts
        );
        info!(
            "stats: learned: {} (avg len {:.1}) deleted: {} reductions: {}",
            self.learned_clauses,
            self.avg_learned_len(),
            self.deleted_clauses,
            self.reductions
        );
        info!(
            "stats: eliminated: {} substituted: {} subsumed: {} strengthened: {}",
            self.eliminated_vars,
            self.substituted_vars,
            self.subsumed_clauses,
            self.strengthened_clauses
        );
        info!(
            "stats: blocked: {} failed lits: {} vivified: {} compactions: {}",
            self.blocked_clauses, self.failed_lits, self.vivified_clauses, self.compactions
        );
    }
}
