//! Simplification using unit clauses.

use partial_ref::{partial, PartialRef};

use ipasat_formula::Lit;

use crate::clause::db::filter_clauses;
use crate::context::{parts::*, Context};
use crate::proof;

/// Move unit clauses off the trail and remember their values.
///
/// At decision level 0 every assignment is implied by the formula. The assignments are removed
/// from the trail, their values are stored with the external variable data and each derived unit
/// is emitted to the proof.
///
/// Returns whether any new unit was found.
pub fn prove_units(
    mut ctx: partial!(
        Context,
        mut ImplGraphP,
        mut ProofP,
        mut TrailP,
        mut VariablesP,
        AssignmentP,
    ),
) -> bool {
    let mut new_unit = false;

    if ctx.part(TrailP).current_level() == 0 {
        let (trail, mut ctx) = ctx.split_part_mut(TrailP);
        let (impl_graph, mut ctx) = ctx.split_part_mut(ImplGraphP);

        let mut units: Vec<Lit> = vec![];

        for &lit in trail.trail() {
            new_unit = true;

            if !impl_graph.reason(lit.var()).is_unit() {
                units.push(lit);
            }

            impl_graph.update_removed_unit(lit.var());

            let variables = ctx.part_mut(VariablesP);
            let ext = variables.external_from_internal(lit.var());
            variables.var_data_external_mut(ext).unit = Some(lit.is_positive());
        }

        trail.clear();

        for &lit in units.iter() {
            proof::add_internal_clause(ctx.borrow(), &[lit]);
        }
    }

    new_unit
}

/// Remove satisfied clauses and false literals.
pub fn simplify(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ProofP,
        mut StatsP,
        AssignmentP,
        VariablesP,
    ),
) {
    let (assignment, mut ctx) = ctx.split_part(AssignmentP);
    let (variables, mut ctx) = ctx.split_part(VariablesP);

    let mut new_lits = vec![];
    let mut deleted = 0u64;

    let (proof, mut ctx) = ctx.split_part_mut(ProofP);
    let (ctx_2, mut ctx) = ctx.split_borrow();

    filter_clauses(ctx_2, |alloc, cref| {
        let clause = alloc.clause_mut(cref);
        new_lits.clear();
        for &lit in clause.lits() {
            match assignment.lit_value(lit) {
                None => new_lits.push(lit),
                Some(true) => {
                    proof.delete_clause(variables, clause.lits());
                    deleted += 1;
                    return false;
                }
                Some(false) => (),
            }
        }
        if new_lits.len() < clause.lits().len() {
            if proof.is_active() {
                proof.add_clause(variables, &new_lits);
                proof.delete_clause(variables, clause.lits());
            }

            match new_lits[..] {
                // Cannot have empty or unit clauses after full propagation. An empty clause
                // would have been a conflict and a unit clause must be satisfied and thus would
                // have been dropped above.
                [] | [_] => unreachable!(),
                ref lits => {
                    clause.lits_mut()[..lits.len()].copy_from_slice(lits);
                    clause.header_mut().set_len(lits.len());
                    true
                }
            }
        } else {
            true
        }
    });

    ctx.part_mut(StatsP).deleted_clauses += deleted;
}
