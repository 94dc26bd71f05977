//! Failed literal probing.
//!
//! A literal whose assignment leads to a conflict by unit propagation alone is failed, its
//! negation is implied and learned as a unit. Probing candidates are the literals whose
//! negation appears in a binary clause, as only those trigger propagation chains.

use partial_ref::{partial, PartialRef};

use rustc_hash::FxHashSet;

use ipasat_formula::Lit;

use crate::context::{parts::*, Context};
use crate::proof;
use crate::prop::{backtrack, enqueue_assignment, propagate, Reason};
use crate::state::SatState;

/// One pass of failed literal probing.
///
/// Requires enabled watchlists at decision level 0 with no pending propagations.
pub fn probe_failed_literals(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ImplGraphP,
        mut ProofP,
        mut SolverStateP,
        mut StatsP,
        mut TrailP,
        mut VsidsP,
        mut WatchlistsP,
        ClauseDbP,
        SolverConfigP,
        VariablesP,
    ),
) {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    let mut budget = ctx.part(SolverConfigP).probe_steps;

    let mut candidates: Vec<Lit> = vec![];
    {
        let mut seen: FxHashSet<Lit> = FxHashSet::default();
        let (db, ctx_2) = ctx.split_part(ClauseDbP);
        let alloc = ctx_2.part(ClauseAllocP);
        for &cref in db.clause_refs() {
            let clause = alloc.clause(cref);
            if clause.header().deleted() || clause.header().len() != 2 {
                continue;
            }
            for &lit in clause.lits() {
                if seen.insert(!lit) {
                    candidates.push(!lit);
                }
            }
        }
    }

    for probe in candidates {
        if budget == 0 || ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return;
        }

        if !ctx.part(AssignmentP).lit_is_unk(probe) {
            continue;
        }

        let trail_before = ctx.part(TrailP).trail().len();

        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), probe, Reason::Unit);

        let failed = propagate(ctx.borrow()).is_err();

        budget = budget.saturating_sub((ctx.part(TrailP).trail().len() - trail_before) as u64);

        backtrack(ctx.borrow(), 0);

        if failed {
            ctx.part_mut(StatsP).failed_lits += 1;
            proof::add_internal_clause(ctx.borrow(), &[!probe]);
            enqueue_assignment(ctx.borrow(), !probe, Reason::Unit);

            if propagate(ctx.borrow()).is_err() {
                proof::add_empty_clause(ctx.borrow());
                ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
                return;
            }
        }
    }
}
