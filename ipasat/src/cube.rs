//! Lookahead and cube generation.
//!
//! The lookahead probes candidate literals by assuming them, propagating and measuring how much
//! of the formula gets assigned. Cube generation repeatedly splits on the best lookahead literal
//! to build a disjoint tree of cubes for parallel solving.

use partial_ref::{partial, PartialRef};

use ipasat_formula::Lit;

use crate::context::{parts::*, Context};
use crate::proof;
use crate::prop::{backtrack, enqueue_assignment, propagate, Reason};
use crate::state::SatState;

macro_rules! lookahead_ctx {
    () => {
        partial!(
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
            SolverConfigP,
            VariablesP,
        )
    };
}

/// Score of one probed literal.
struct Probe {
    lit: Lit,
    assigned: usize,
    failed: bool,
}

/// Probe a single literal at a fresh decision level.
fn probe_lit(mut ctx: lookahead_ctx!(), lit: Lit) -> Probe {
    let trail_before = ctx.part(TrailP).trail().len();

    ctx.part_mut(TrailP).new_decision_level();
    enqueue_assignment(ctx.borrow(), lit, Reason::Unit);

    let failed = propagate(ctx.borrow()).is_err();
    let assigned = ctx.part(TrailP).trail().len() - trail_before;

    backtrack(ctx.borrow(), 0);

    Probe {
        lit,
        assigned,
        failed,
    }
}

/// The candidate literals for a lookahead, best decision variables first.
fn candidates(mut ctx: lookahead_ctx!()) -> Vec<Lit> {
    let limit = ctx.part(SolverConfigP).lookahead_candidates as usize;

    let mut vars = vec![];
    while vars.len() < limit {
        match ctx.part_mut(VsidsP).next() {
            None => break,
            Some(var) => {
                if ctx.part(AssignmentP).var_value(var).is_none() {
                    vars.push(var);
                }
            }
        }
    }
    for &var in vars.iter() {
        ctx.part_mut(VsidsP).make_available(var);
    }

    vars.iter().map(|&var| var.positive()).collect()
}

/// Perform a single level lookahead.
///
/// Each candidate literal is assumed, propagated and scored by the number of resulting
/// assignments. Failed literals are turned into units on the fly. Returns the literal with the
/// best combined score of both polarities, in the polarity that assigns more, or `None` when the
/// formula is decided without search.
pub fn lookahead(mut ctx: lookahead_ctx!()) -> Option<Lit> {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    let mut best: Option<(usize, Lit)> = None;

    for lit in candidates(ctx.borrow()) {
        if ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return None;
        }
        if !ctx.part(AssignmentP).lit_is_unk(lit) {
            continue;
        }

        let pos = probe_lit(ctx.borrow(), lit);
        if pos.failed {
            if learn_failed_unit(ctx.borrow(), lit) {
                return None;
            }
            continue;
        }

        let neg = probe_lit(ctx.borrow(), !lit);
        if neg.failed {
            if learn_failed_unit(ctx.borrow(), !lit) {
                return None;
            }
            continue;
        }

        let score = pos.assigned * neg.assigned + pos.assigned + neg.assigned;
        let lit = if pos.assigned >= neg.assigned {
            pos.lit
        } else {
            neg.lit
        };

        if best.map(|(best_score, _)| score > best_score).unwrap_or(true) {
            best = Some((score, lit));
        }
    }

    best.map(|(_, lit)| lit)
}

/// Learn the negation of a failed literal as a unit.
///
/// Returns true when this made the formula unsatisfiable.
fn learn_failed_unit(mut ctx: lookahead_ctx!(), failed: Lit) -> bool {
    ctx.part_mut(StatsP).failed_lits += 1;
    proof::add_internal_clause(ctx.borrow(), &[!failed]);
    enqueue_assignment(ctx.borrow(), !failed, Reason::Unit);

    if propagate(ctx.borrow()).is_err() {
        proof::add_empty_clause(ctx.borrow());
        ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
        return true;
    }

    false
}

/// Result of cube generation.
pub enum CubeStatus {
    /// All open branches were refuted while splitting.
    Unsat,
    /// A branch assigned every variable without a conflict. The satisfying assignment is left
    /// on the trail for model reconstruction.
    Sat,
    /// The remaining search space is covered by the returned cubes.
    Split,
}

/// Build a disjoint tree of cubes suitable for splitting the search space.
///
/// Cubes are expanded until `max_cubes` leaves exist, but never below `min_depth` splits per
/// leaf. Refuted branches are dropped. The returned cubes use the internal encoding.
///
/// On the satisfiable outcome the assignment of the deciding branch is kept so the caller can
/// build a model before unwinding.
pub fn generate_cubes(
    mut ctx: lookahead_ctx!(),
    max_cubes: usize,
    min_depth: usize,
) -> (CubeStatus, Vec<Vec<Lit>>) {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    let mut open: Vec<Vec<Lit>> = vec![vec![]];
    let mut done: Vec<Vec<Lit>> = vec![];

    while let Some(cube) = open.pop() {
        if ctx.part(SolverStateP).sat_state != SatState::Unknown {
            backtrack(ctx.borrow(), 0);
            return (CubeStatus::Unsat, vec![]);
        }

        if cube.len() >= min_depth && open.len() + done.len() + 1 >= max_cubes {
            done.push(cube);
            continue;
        }

        // Apply the cube as a sequence of decisions.
        let mut refuted = false;
        for &lit in cube.iter() {
            if ctx.part(AssignmentP).lit_is_true(lit) {
                continue;
            }
            if ctx.part(AssignmentP).lit_is_false(lit) {
                refuted = true;
                break;
            }
            ctx.part_mut(TrailP).new_decision_level();
            enqueue_assignment(ctx.borrow(), lit, Reason::Unit);
            if propagate(ctx.borrow()).is_err() {
                refuted = true;
                break;
            }
        }

        if refuted {
            backtrack(ctx.borrow(), 0);
            continue;
        }

        // Split on the highest activity variable unassigned under the cube.
        let split_lit = {
            let mut popped = vec![];
            let split_var = loop {
                match ctx.part_mut(VsidsP).next() {
                    None => break None,
                    Some(var) => {
                        popped.push(var);
                        if ctx.part(AssignmentP).var_value(var).is_none() {
                            break Some(var);
                        }
                    }
                }
            };
            for var in popped {
                ctx.part_mut(VsidsP).make_available(var);
            }
            split_var.map(|var| var.positive())
        };

        match split_lit {
            None => {
                // The cube decided the whole formula. The satisfying assignment is left in
                // place so the caller can reconstruct a model from it.
                return (CubeStatus::Sat, vec![]);
            }
            Some(lit) => {
                backtrack(ctx.borrow(), 0);

                let mut positive = cube.clone();
                positive.push(lit);
                let mut negative = cube;
                negative.push(!lit);
                open.push(positive);
                open.push(negative);
            }
        }
    }

    if done.is_empty() {
        (CubeStatus::Unsat, vec![])
    } else {
        (CubeStatus::Split, done)
    }
}
