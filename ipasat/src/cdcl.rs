//! Conflict driven clause learning.

use partial_ref::{partial, PartialRef};

use ipasat_formula::Lit;

use crate::analyze_conflict::analyze_conflict;
use crate::clause::{assess_learned_clause, bump_clause_activity, db, decay_clause_activities, Tier};
use crate::context::{parts::*, Context};
use crate::decision::make_decision;
use crate::incremental::{enqueue_assumption, EnqueueAssumption};
use crate::load::load_clause_with_tier;
use crate::proof;
use crate::prop::{backtrack, enqueue_assignment, propagate, Conflict, Reason};
use crate::simplify::{prove_units, simplify};
use crate::state::SatState;
use crate::variables;

/// Find a conflict, learn a clause and backtrack.
pub fn conflict_step(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut CallbacksP,
        mut ClauseActivityP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ExtensionP,
        mut ImplGraphP,
        mut IncrementalP,
        mut ProofP,
        mut ScheduleP,
        mut SolverStateP,
        mut StatsP,
        mut TmpDataP,
        mut TrailP,
        mut VariablesP,
        mut VsidsP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) {
    let conflict = find_conflict(ctx.borrow());

    let conflict = match conflict {
        Ok(()) => {
            ctx.part_mut(SolverStateP).sat_state = SatState::Sat;
            return;
        }
        Err(FoundConflict::Assumption) => {
            ctx.part_mut(SolverStateP).sat_state = SatState::UnsatUnderAssumptions;
            return;
        }
        Err(FoundConflict::Loaded) => return,
        Err(FoundConflict::Conflict(conflict)) => conflict,
    };

    ctx.part_mut(StatsP).conflicts += 1;

    let backtrack_to = analyze_conflict(ctx.borrow(), conflict);

    let (analyze, mut ctx) = ctx.split_part(AnalyzeConflictP);

    for &cref in analyze.involved() {
        bump_clause_activity(ctx.borrow(), cref);
    }

    decay_clause_activities(ctx.borrow());

    backtrack(ctx.borrow(), backtrack_to);

    let clause = analyze.clause();

    proof::add_internal_clause(ctx.borrow(), clause);

    export_learned_clause(ctx.borrow(), clause);

    ctx.part_mut(StatsP).learned_clauses += 1;
    ctx.part_mut(StatsP).learned_lits += clause.len() as u64;

    let reason = match clause.len() {
        0 => {
            ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
            return;
        }
        1 => {
            ctx.part_mut(ScheduleP).note_learned_glue(1);
            Reason::Unit
        }
        _ => {
            let header = assess_learned_clause(ctx.borrow(), clause);
            ctx.part_mut(ScheduleP).note_learned_glue(header.glue());
            let cref = db::add_clause(ctx.borrow(), header, clause);
            Reason::Long(cref)
        }
    };

    enqueue_assignment(ctx.borrow(), clause[0], reason);
}

/// Forward a learned clause to an attached learner callback.
fn export_learned_clause(
    mut ctx: partial!(Context, mut CallbacksP, mut StatsP, VariablesP),
    clause: &[Lit],
) {
    if clause.is_empty() {
        return;
    }
    let (callbacks, mut ctx) = ctx.split_part_mut(CallbacksP);
    if let Some(learner) = &mut callbacks.learner {
        if learner.learning(clause.len()) {
            let variables = ctx.part(VariablesP);
            let external: Vec<Lit> = clause
                .iter()
                .map(|&lit| variables.external_from_internal_lit(lit))
                .collect();
            learner.learn(&external);
            ctx.part_mut(StatsP).exported_clauses += 1;
        }
    }
}

/// Pull clauses from an attached learn source.
///
/// The source's clauses use the external encoding and are added as redundant clauses.
fn import_external_clauses(
    mut ctx: partial!(
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
    ),
) {
    let source = ctx.part_mut(CallbacksP).learn_source.take();

    if let Some(mut source) = source {
        let mut external = vec![];
        let mut internal = vec![];

        while source.has_next_clause() {
            external.clear();
            source.next_clause(&mut external);

            variables::internal_from_external_lits(ctx.borrow(), &mut internal, &external);
            proof::add_internal_clause(ctx.borrow(), &internal);
            load_clause_with_tier(ctx.borrow(), &internal, Tier::Local);
            ctx.part_mut(StatsP).imported_clauses += 1;
        }

        ctx.part_mut(CallbacksP).learn_source = Some(source);
    }
}

/// Return type of [`find_conflict`].
///
/// Specifies whether a conflict was found during propagation, while enqueuing assumptions or
/// while loading an imported clause.
enum FoundConflict {
    Conflict(Conflict),
    Assumption,
    Loaded,
}

impl From<Conflict> for FoundConflict {
    fn from(conflict: Conflict) -> FoundConflict {
        FoundConflict::Conflict(conflict)
    }
}

/// Find a conflict.
///
/// Returns `Err` if a conflict was found and `Ok` if a satisfying assignment was found instead.
fn find_conflict(
    mut ctx: partial!(
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
    ),
) -> Result<(), FoundConflict> {
    loop {
        let propagation_result = propagate(ctx.borrow());

        let new_unit = prove_units(ctx.borrow());

        propagation_result.map_err(FoundConflict::Conflict)?;

        if new_unit {
            simplify(ctx.borrow());
        }

        if ctx.part(TrailP).current_level() == 0 {
            import_external_clauses(ctx.borrow());
            if ctx.part(SolverStateP).sat_state == SatState::Unsat {
                return Err(FoundConflict::Loaded);
            }
            if !ctx.part(TrailP).fully_propagated() {
                continue;
            }
        }

        match enqueue_assumption(ctx.borrow()) {
            EnqueueAssumption::Enqueued => continue,
            EnqueueAssumption::Conflict => return Err(FoundConflict::Assumption),
            EnqueueAssumption::Done => (),
        }

        if !make_decision(ctx.borrow()) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use partial_ref::IntoPartialRefMut;

    use ipasat_formula::{cnf_formula, test::*};

    use crate::context::set_var_count;
    use crate::load::load_clause;

    #[test]
    fn level_0_unsat() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            1, 2, 3;
            -1;
            1, -2;
            2, -3;
        ];

        set_var_count(ctx.borrow(), formula.var_count());

        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }

        while ctx.part(SolverStateP).sat_state == SatState::Unknown {
            conflict_step(ctx.borrow());
        }

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
    }

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut ctx = Context::default();
            let mut ctx = ctx.into_partial_ref_mut();

            set_var_count(ctx.borrow(), formula.var_count());

            for clause in formula.iter() {
                load_clause(ctx.borrow(), clause);
            }

            while ctx.part(SolverStateP).sat_state == SatState::Unknown {
                conflict_step(ctx.borrow());
            }

            prop_assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut ctx = Context::default();
            let mut ctx = ctx.into_partial_ref_mut();

            set_var_count(ctx.borrow(), formula.var_count());

            for clause in formula.iter() {
                load_clause(ctx.borrow(), clause);
            }

            while ctx.part(SolverStateP).sat_state == SatState::Unknown {
                conflict_step(ctx.borrow());
            }

            prop_assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Sat);

            for clause in formula.iter() {
                let clause_satisfied = clause.iter().any(|&lit| {
                    ctx.part(AssignmentP).lit_is_true(lit)
                        || ctx.part(VariablesP).var_data_external(lit.var()).unit
                            == Some(lit.is_positive())
                });
                prop_assert!(clause_satisfied);
            }
        }

        #[test]
        fn sgen_unsat_incremental_clauses(formula in sgen_unsat_formula(1..7usize)) {
            let mut ctx = Context::default();
            let mut ctx = ctx.into_partial_ref_mut();

            set_var_count(ctx.borrow(), formula.var_count());

            let mut last_state = SatState::Sat;

            for clause in formula.iter() {
                load_clause(ctx.borrow(), clause);
                while ctx.part(SolverStateP).sat_state == SatState::Unknown {
                    conflict_step(ctx.borrow());
                }

                if ctx.part(SolverStateP).sat_state != last_state {
                    prop_assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
                    prop_assert_eq!(last_state, SatState::Sat);
                    last_state = ctx.part(SolverStateP).sat_state;
                }
            }

            prop_assert_eq!(last_state, SatState::Unsat);
        }
    }
}
