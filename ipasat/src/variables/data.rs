//! Data associated with external variables.

/// Data associated with external variables.
///
/// This is kept for every external variable the user ever mentioned, even when the variable has
/// no internal image because it is eliminated, substituted or fixed.
#[derive(Clone, Default)]
pub struct VarData {
    /// Whether the user ever mentioned this variable.
    pub created: bool,
    /// Whether the variable is forced by a unit clause at the root level.
    ///
    /// This is used to remember unit clauses after they are removed from the solver.
    pub unit: Option<bool>,
    /// Whether the variable was removed by bounded variable elimination.
    pub eliminated: bool,
    /// Whether the variable was replaced by an equivalent literal.
    pub substituted: bool,
    /// Number of freeze requests that are not yet melted.
    ///
    /// A variable with a positive count is never eliminated or substituted.
    pub frozen: u32,
    /// Whether this variable is part of the current assumptions.
    pub assumed: bool,
    /// Phase override set by the user, taking precedence over the saved phase.
    pub forced_phase: Option<bool>,
}

impl VarData {
    /// Whether the variable may be removed by elimination based inprocessing.
    pub fn protected(&self) -> bool {
        self.frozen > 0 || self.assumed
    }

    /// Whether the variable currently contributes to the internal formula.
    pub fn removed(&self) -> bool {
        self.eliminated || self.substituted
    }
}
