//! Clause vivification.
//!
//! A clause is vivified by assuming the negations of its literals one at a time and propagating.
//! When a conflict occurs before all literals are assumed, or one of the literals becomes true,
//! the already processed prefix implies the clause and replaces it. Literals that become false
//! during the walk are implied to be redundant in the clause and dropped.

use partial_ref::{partial, PartialRef};

use ipasat_formula::Lit;

use crate::clause::db::{self, delete_clause_with_proof};
use crate::clause::{ClauseHeader, ClauseRef, Tier};
use crate::context::{parts::*, Context};
use crate::proof;
use crate::prop::{backtrack, enqueue_assignment, propagate, Reason};
use crate::state::SatState;

/// One pass of vivification over the irredundant clauses.
///
/// Requires enabled watchlists at decision level 0 with no pending propagations.
pub fn vivify_clauses(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut ProofP,
        mut SolverStateP,
        mut StatsP,
        mut TrailP,
        mut VsidsP,
        mut WatchlistsP,
        SolverConfigP,
        VariablesP,
    ),
) {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    let mut budget = ctx.part(SolverConfigP).vivify_steps;

    let snapshot: Vec<ClauseRef> = ctx.part(ClauseDbP).clause_refs().to_vec();
    let mut lits: Vec<Lit> = vec![];

    for &cref in snapshot.iter() {
        if budget == 0 || ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return;
        }

        {
            let clause = ctx.part(ClauseAllocP).clause(cref);
            let header = clause.header();
            if header.deleted() || header.redundant() || header.len() < 3 {
                continue;
            }
            lits.clear();
            lits.extend_from_slice(clause.lits());
        }

        budget = budget.saturating_sub(lits.len() as u64);

        let mut kept: Vec<Lit> = vec![];
        let mut satisfied = false;

        for &lit in lits.iter() {
            match ctx.part(AssignmentP).lit_value(lit) {
                Some(true) => {
                    // True at the root or implied by the assumed prefix, the prefix plus this
                    // literal implies the clause.
                    if ctx.part(ImplGraphP).level(lit.var()) == 0 {
                        satisfied = true;
                    } else {
                        kept.push(lit);
                    }
                    break;
                }
                Some(false) => {
                    // False under the assumed prefix, the literal is redundant in this clause.
                }
                None => {
                    kept.push(lit);
                    ctx.part_mut(TrailP).new_decision_level();
                    enqueue_assignment(ctx.borrow(), !lit, Reason::Unit);
                    if propagate(ctx.borrow()).is_err() {
                        break;
                    }
                }
            }
        }

        backtrack(ctx.borrow(), 0);

        if satisfied {
            delete_clause_with_proof(ctx.borrow(), cref);
            continue;
        }

        if kept.len() >= lits.len() {
            continue;
        }

        proof::add_internal_clause(ctx.borrow(), &kept);
        ctx.part_mut(StatsP).vivified_clauses += 1;

        match kept[..] {
            [] => {
                delete_clause_with_proof(ctx.borrow(), cref);
                proof::add_empty_clause(ctx.borrow());
                ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
                return;
            }
            [unit] => {
                delete_clause_with_proof(ctx.borrow(), cref);
                match ctx.part(AssignmentP).lit_value(unit) {
                    Some(false) => {
                        proof::add_empty_clause(ctx.borrow());
                        ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
                        return;
                    }
                    Some(true) => {}
                    None => {
                        enqueue_assignment(ctx.borrow(), unit, Reason::Unit);
                        if propagate(ctx.borrow()).is_err() {
                            proof::add_empty_clause(ctx.borrow());
                            ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
                            return;
                        }
                    }
                }
            }
            _ => {
                let mut header = ClauseHeader::new();
                header.set_tier(Tier::Irred);
                db::add_clause(ctx.borrow(), header, &kept);
                delete_clause_with_proof(ctx.borrow(), cref);
            }
        }
    }
}
