//! Decision heuristics.

use partial_ref::{partial, PartialRef};

use ipasat_formula::Var;

use crate::context::{parts::*, Context};
use crate::prop::{enqueue_assignment, Reason};

pub mod vsids;

/// Make a decision and enqueue it.
///
/// This branches on the unassigned variable with the highest activity. The assigned polarity is
/// the forced phase if one was set, the saved phase from the last assignment otherwise and the
/// configured default phase for never assigned variables.
///
/// Returns `false` if no decision was made because all variables are assigned.
pub fn make_decision(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut StatsP,
        mut TrailP,
        mut VsidsP,
        SolverConfigP,
        VariablesP,
    ),
) -> bool {
    let decision_var = loop {
        match ctx.part_mut(VsidsP).next() {
            None => return false,
            Some(var) => {
                if ctx.part(AssignmentP).var_value(var).is_none() {
                    break var;
                }
            }
        }
    };

    let phase = decision_phase(ctx.borrow(), decision_var);
    let decision = decision_var.lit(phase);

    ctx.part_mut(TrailP).new_decision_level();
    ctx.part_mut(StatsP).decisions += 1;

    enqueue_assignment(ctx.borrow(), decision, Reason::Unit);

    true
}

/// The polarity to assign to a decision variable.
fn decision_phase(
    mut ctx: partial!(Context, AssignmentP, SolverConfigP, VariablesP),
    var: Var,
) -> bool {
    let variables = ctx.part(VariablesP);
    let ext = variables.external_from_internal(var);
    if let Some(forced) = variables.var_data_external(ext).forced_phase {
        return forced;
    }
    ctx.part(AssignmentP)
        .last_var_value(var)
        .unwrap_or(ctx.part(SolverConfigP).phase_default)
}

/// Adds the variable to the heap of decision candidates if not already present.
pub fn make_available(mut ctx: partial!(Context, mut VsidsP), var: Var) {
    ctx.part_mut(VsidsP).make_available(var);
}

/// Initialize decision data for a (re-)allocated variable.
pub fn initialize_var(mut ctx: partial!(Context, mut VsidsP), var: Var, available: bool) {
    let vsids = ctx.part_mut(VsidsP);
    vsids.reset_activity(var);
    if available {
        vsids.make_available(var);
    }
}

/// Remove a variable from the decision candidates.
pub fn remove_var(mut ctx: partial!(Context, mut VsidsP), var: Var) {
    ctx.part_mut(VsidsP).remove(var);
}
