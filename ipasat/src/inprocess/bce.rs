//! Blocked clause elimination.
//!
//! A clause C is blocked on one of its literals l when every resolvent of C with a clause
//! containing ¬l is a tautology. Removing a blocked clause preserves satisfiability: a model
//! falsifying C can always be repaired by flipping l, which cannot falsify any clause with ¬l
//! because the corresponding resolvent is tautological. The flip is recorded as a witness entry.
//!
//! Literals over frozen or assumed variables are not used as blocking literals.

use partial_ref::{partial, PartialRef};

use ipasat_formula::Lit;

use crate::clause::db::delete_clause_with_proof;
use crate::clause::ClauseRef;
use crate::context::{parts::*, Context};
use crate::state::SatState;

use super::occur::OccurIndex;

/// One pass of blocked clause elimination over the irredundant clauses.
pub fn eliminate_blocked(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ExtensionP,
        mut ProofP,
        mut StatsP,
        SolverConfigP,
        SolverStateP,
        VariablesP,
    ),
    occ: &mut OccurIndex,
) {
    let mut budget = ctx.part(SolverConfigP).bce_steps;

    let snapshot: Vec<ClauseRef> = ctx.part(ClauseDbP).clause_refs().to_vec();
    let mut c_lits: Vec<Lit> = vec![];

    for &cref in snapshot.iter() {
        if budget == 0 || ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return;
        }

        {
            let clause = ctx.part(ClauseAllocP).clause(cref);
            let header = clause.header();
            if header.deleted() || header.redundant() {
                continue;
            }
            c_lits.clear();
            c_lits.extend_from_slice(clause.lits());
        }

        for &lit in c_lits.iter() {
            {
                let variables = ctx.part(VariablesP);
                let ext = variables.external_from_internal(lit.var());
                if variables.var_data_external(ext).protected() {
                    continue;
                }
            }

            let blocked = {
                let alloc = ctx.part(ClauseAllocP);
                let mut blocked = true;
                for &other_ref in occ.occurrences(lit.var()) {
                    budget = budget.saturating_sub(1);
                    let other = alloc.clause(other_ref);
                    if other.header().deleted() || other.header().redundant() {
                        continue;
                    }
                    if other_ref == cref || !other.lits().contains(&!lit) {
                        continue;
                    }
                    let tautological = c_lits
                        .iter()
                        .any(|&c_lit| c_lit != lit && other.lits().contains(&!c_lit));
                    if !tautological {
                        blocked = false;
                        break;
                    }
                }
                blocked
            };

            if blocked {
                push_blocked_witness(ctx.borrow(), lit, &c_lits);
                delete_clause_with_proof(ctx.borrow(), cref);
                ctx.part_mut(StatsP).blocked_clauses += 1;
                break;
            }
        }
    }
}

/// Record a removed blocked clause with its blocking literal as witness.
fn push_blocked_witness(
    mut ctx: partial!(Context, mut ExtensionP, VariablesP),
    blocking: Lit,
    lits: &[Lit],
) {
    let (variables, mut ctx) = ctx.split_part(VariablesP);

    let external_clause: Vec<Lit> = lits
        .iter()
        .map(|&lit| variables.external_from_internal_lit(lit))
        .collect();
    let external_witness = variables.external_from_internal_lit(blocking);

    ctx.part_mut(ExtensionP)
        .push_witness(&[external_witness], &external_clause);
}
