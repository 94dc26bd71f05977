//! Inprocessing between search bursts.
//!
//! All techniques run at decision level 0. The occurrence based techniques (subsumption,
//! equivalent literal substitution, bounded variable elimination, blocked clause elimination)
//! run with disabled watchlists against a freshly built occurrence index. The propagation based
//! techniques (failed literal probing, vivification) run afterwards with rebuilt watchlists.
//!
//! Every pass respects its configured step budget and the termination flag is polled between
//! passes.

use partial_ref::{partial, PartialRef};

use crate::clause::gc::collect_garbage;
use crate::context::{parts::*, Context};
use crate::proof;
use crate::prop::{enable_watchlists, full_restart, propagate};
use crate::simplify::{prove_units, simplify};
use crate::state::SatState;
use crate::variables;

pub mod bce;
pub mod elim;
pub mod occur;
pub mod probe;
pub mod subst;
pub mod subsume;
pub mod vivify;

use occur::OccurIndex;

macro_rules! inprocess_ctx {
    () => {
        partial!(
            Context,
            mut AnalyzeConflictP,
            mut AssignmentP,
            mut CallbacksP,
            mut ClauseAllocP,
            mut ClauseDbP,
            mut ExtensionP,
            mut ImplGraphP,
            mut IncrementalP,
            mut ProofP,
            mut SolverStateP,
            mut StatsP,
            mut TmpDataP,
            mut TrailP,
            mut VariablesP,
            mut VsidsP,
            mut WatchlistsP,
            SolverConfigP,
        )
    };
}

/// Whether the current inprocessing round should stop early.
fn stop_requested(mut ctx: partial!(Context, mut CallbacksP, SolverStateP)) -> bool {
    ctx.part(SolverStateP).sat_state != SatState::Unknown
        || ctx.part(SolverStateP).terminate_requested()
        || ctx.part_mut(CallbacksP).should_terminate()
}

/// Propagate pending root assignments and clean the clause database.
pub fn settle_root(mut ctx: inprocess_ctx!()) {
    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return;
    }
    if propagate(ctx.borrow()).is_err() {
        proof::add_empty_clause(ctx.borrow());
        ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
        return;
    }
    if prove_units(ctx.borrow()) {
        simplify(ctx.borrow());
    }
}

/// Run one round of inprocessing.
///
/// Called between search bursts at a termination checkpoint. Unwinds all decisions and
/// assumptions; the assumptions are re-enqueued when the search resumes.
pub fn inprocess(mut ctx: inprocess_ctx!()) {
    ctx.part_mut(StatsP).inprocessings += 1;

    full_restart(ctx.borrow());

    settle_root(ctx.borrow());
    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return;
    }

    ctx.part_mut(WatchlistsP).disable();

    {
        let mut occ = OccurIndex::build(ctx.borrow());

        if ctx.part(SolverConfigP).subsume && !stop_requested(ctx.borrow()) {
            subsume::backward_subsume(ctx.borrow(), &mut occ);
        }
        if ctx.part(SolverConfigP).substitute && !stop_requested(ctx.borrow()) {
            subst::substitute_equivs(ctx.borrow(), &mut occ);
        }
        if ctx.part(SolverConfigP).elim && !stop_requested(ctx.borrow()) {
            elim::eliminate_variables(ctx.borrow(), &mut occ);
        }
        if ctx.part(SolverConfigP).bce && !stop_requested(ctx.borrow()) {
            bce::eliminate_blocked(ctx.borrow(), &mut occ);
        }
    }

    collect_garbage(ctx.borrow());

    enable_watchlists(ctx.borrow());
    settle_root(ctx.borrow());
    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return;
    }

    if ctx.part(SolverConfigP).probe && !stop_requested(ctx.borrow()) {
        probe::probe_failed_literals(ctx.borrow());
        settle_root(ctx.borrow());
    }
    if ctx.part(SolverConfigP).vivify && !stop_requested(ctx.borrow()) {
        vivify::vivify_clauses(ctx.borrow());
        settle_root(ctx.borrow());
    }
    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return;
    }

    maybe_compact(ctx.borrow());
}

/// Rebuild the internal variable space when enough variables lost their internal image.
fn maybe_compact(mut ctx: inprocess_ctx!()) {
    let variables = ctx.part(VariablesP);
    let watermark = variables.internal_watermark();
    if watermark == 0 {
        return;
    }

    let unmapped = watermark - variables.mapped_count() + variables.fixed_count();
    let fraction = ctx.part(SolverConfigP).compact_fraction;

    if (unmapped as f64) < (watermark as f64) * fraction {
        return;
    }

    if !ctx.part(TrailP).trail().is_empty() {
        return;
    }

    variables::compact(ctx.borrow());
    enable_watchlists(ctx.borrow());
}
