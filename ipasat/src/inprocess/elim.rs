//! Bounded variable elimination.
//!
//! A variable is eliminated by replacing all clauses containing it with all non-tautological
//! resolvents on it, following the classic substitution rule of SatELite. Elimination is bounded:
//! it is skipped when the variable occurs too often, when a resolvent would become too long or
//! when the number of resolvents would exceed the number of removed irredundant clauses by more
//! than the configured growth.
//!
//! Every removed irredundant clause is recorded on the reconstruction stack with the literal of
//! the eliminated variable as witness. Together with the resolvents remaining in the formula
//! this allows extending any model to the eliminated variable and restoring the clauses when the
//! variable is mentioned again.

use partial_ref::{partial, PartialRef};

use ipasat_formula::{Lit, Var};

use crate::clause::db::{self, delete_clause_with_proof};
use crate::clause::{ClauseHeader, ClauseRef, Tier};
use crate::context::{parts::*, Context};
use crate::proof;
use crate::prop::{enqueue_assignment, Reason};
use crate::state::SatState;
use crate::variables::{self, Unmap};

use super::occur::OccurIndex;

/// Merge two clauses resolved on `var`.
///
/// Returns `None` when the resolvent is a tautology.
fn merge(pos_lits: &[Lit], neg_lits: &[Lit], var: Var) -> Option<Vec<Lit>> {
    let mut resolvent: Vec<Lit> = pos_lits
        .iter()
        .cloned()
        .filter(|lit| lit.var() != var)
        .collect();

    for &lit in neg_lits {
        if lit.var() == var {
            continue;
        }
        if resolvent.contains(&!lit) {
            return None;
        }
        if !resolvent.contains(&lit) {
            resolvent.push(lit);
        }
    }

    Some(resolvent)
}

/// One pass of bounded variable elimination.
pub fn eliminate_variables(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ExtensionP,
        mut ImplGraphP,
        mut ProofP,
        mut SolverStateP,
        mut StatsP,
        mut TrailP,
        mut VariablesP,
        mut VsidsP,
        mut WatchlistsP,
        SolverConfigP,
    ),
    occ: &mut OccurIndex,
) {
    let mut budget = ctx.part(SolverConfigP).elim_steps;
    let occurrence_limit = ctx.part(SolverConfigP).elim_occurrence_limit as usize;
    let resolvent_limit = ctx.part(SolverConfigP).elim_resolvent_limit as usize;
    let grow_limit = ctx.part(SolverConfigP).elim_grow_limit as usize;

    let var_count = ctx.part(AssignmentP).assignment().len();
    let mut candidates: Vec<Var> = (0..var_count).map(Var::from_index).collect();
    candidates.sort_unstable_by_key(|&var| occ.occurrence_count(var));

    let mut pos_refs: Vec<ClauseRef> = vec![];
    let mut neg_refs: Vec<ClauseRef> = vec![];

    for var in candidates {
        if budget == 0 || ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return;
        }

        if ctx.part(AssignmentP).var_value(var).is_some() {
            continue;
        }

        {
            let variables = ctx.part(VariablesP);
            let ext = match variables.try_external_from_internal(var) {
                Some(ext) => ext,
                None => continue,
            };
            let data = variables.var_data_external(ext);
            if data.protected() || data.unit.is_some() {
                continue;
            }
        }

        occ.gather_lit(ctx.borrow(), var.positive(), &mut pos_refs);
        occ.gather_lit(ctx.borrow(), var.negative(), &mut neg_refs);

        if pos_refs.len() > occurrence_limit || neg_refs.len() > occurrence_limit {
            continue;
        }

        budget = budget.saturating_sub((pos_refs.len() * neg_refs.len()) as u64);

        let pos_irred: Vec<ClauseRef> = irredundant(ctx.borrow(), &pos_refs);
        let neg_irred: Vec<ClauseRef> = irredundant(ctx.borrow(), &neg_refs);

        // Compute all resolvents of the irredundant occurrences, giving up when one grows too
        // long or there are too many.
        let removed = pos_irred.len() + neg_irred.len();
        let mut resolvents: Vec<Vec<Lit>> = vec![];
        let mut aborted = false;

        'resolve: for &pos_ref in pos_irred.iter() {
            for &neg_ref in neg_irred.iter() {
                let resolvent = {
                    let alloc = ctx.part(ClauseAllocP);
                    merge(
                        alloc.clause(pos_ref).lits(),
                        alloc.clause(neg_ref).lits(),
                        var,
                    )
                };
                if let Some(resolvent) = resolvent {
                    if resolvent.len() > resolvent_limit
                        || resolvents.len() + 1 > removed + grow_limit
                    {
                        aborted = true;
                        break 'resolve;
                    }
                    resolvents.push(resolvent);
                }
            }
        }

        if aborted {
            continue;
        }

        // Commit: add the resolvents, record witnesses, drop all occurrences and unmap the
        // variable.
        for resolvent in resolvents.iter() {
            proof::add_internal_clause(ctx.borrow(), resolvent);
            match resolvent[..] {
                [] => unreachable!("empty resolvent of two non-unit clauses"),
                [unit] => match ctx.part(AssignmentP).lit_value(unit) {
                    Some(false) => {
                        proof::add_empty_clause(ctx.borrow());
                        ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
                        return;
                    }
                    Some(true) => {}
                    None => enqueue_assignment(ctx.borrow(), unit, Reason::Unit),
                },
                _ => {
                    let mut header = ClauseHeader::new();
                    header.set_tier(Tier::Irred);
                    let cref = db::add_clause(ctx.borrow(), header, resolvent);
                    occ.add_clause(cref, resolvent);
                }
            }
        }

        for &cref in pos_irred.iter().chain(neg_irred.iter()) {
            push_clause_witness(ctx.borrow(), var, cref);
        }

        for &cref in pos_refs.iter().chain(neg_refs.iter()) {
            delete_clause_with_proof(ctx.borrow(), cref);
        }

        variables::unmap_internal(ctx.borrow(), var, Unmap::Eliminated);
        ctx.part_mut(StatsP).eliminated_vars += 1;
    }
}

/// Filter a gathered occurrence list down to the irredundant clauses.
fn irredundant(
    mut ctx: partial!(Context, ClauseAllocP),
    refs: &[ClauseRef],
) -> Vec<ClauseRef> {
    let alloc = ctx.part(ClauseAllocP);
    refs.iter()
        .cloned()
        .filter(|&cref| !alloc.header(cref).redundant())
        .collect()
}

/// Record a clause removed by elimination on the reconstruction stack.
///
/// The witness is the literal of the eliminated variable contained in the clause, stored in the
/// external encoding.
fn push_clause_witness(
    mut ctx: partial!(Context, mut ExtensionP, ClauseAllocP, VariablesP),
    var: Var,
    cref: ClauseRef,
) {
    let (variables, mut ctx) = ctx.split_part(VariablesP);
    let (alloc, mut ctx) = ctx.split_part(ClauseAllocP);

    let lits = alloc.clause(cref).lits();
    let witness = lits
        .iter()
        .cloned()
        .find(|lit| lit.var() == var)
        .expect("gathered clause does not contain the eliminated variable");

    let external_clause: Vec<Lit> = lits
        .iter()
        .map(|&lit| variables.external_from_internal_lit(lit))
        .collect();
    let external_witness = variables.external_from_internal_lit(witness);

    ctx.part_mut(ExtensionP)
        .push_witness(&[external_witness], &external_clause);
}

#[cfg(test)]
mod tests {
    use super::*;

    use ipasat_formula::lits;

    #[test]
    fn merge_drops_tautologies() {
        let var = Var::from_dimacs(1);
        assert_eq!(merge(&lits![1, 2], &lits![-1, 3], var), Some(lits![2, 3].to_vec()));
        assert_eq!(merge(&lits![1, 2], &lits![-1, -2], var), None);
        assert_eq!(merge(&lits![1, 2], &lits![-1, 2], var), Some(lits![2].to_vec()));
    }
}
