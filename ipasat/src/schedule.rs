//! Scheduling of restarts, reductions, inprocessing and solving steps.
use log::info;

use partial_ref::{partial, PartialRef};

use crate::cdcl::conflict_step;
use crate::clause::gc::collect_garbage_now;
use crate::clause::reduce::{reduce_locals, reduce_mids};
use crate::clause::Tier;
use crate::context::{parts::*, Context};
use crate::inprocess::inprocess;
use crate::prop::{enable_watchlists, full_restart, restart};
use crate::state::SatState;

mod luby;

use luby::LubySequence;

/// Scheduling of restarts, reductions, inprocessing and solving steps.
///
/// Restarts follow a Luby sequence scaled by the configured interval. On top of that a restart
/// is forced whenever the short term exponential moving average of learned clause glues
/// substantially exceeds the long term average.
#[derive(Default)]
pub struct Schedule {
    conflicts: u64,
    restarts: u64,
    next_restart: u64,
    last_restart: u64,
    luby: LubySequence,

    glue_fast: f64,
    glue_slow: f64,
    glue_samples: u64,

    next_reduce_locals: u64,
    next_reduce_mids: u64,
    next_inprocess: u64,

    conflict_limit: Option<u64>,
    decision_limit: Option<u64>,
}

impl Schedule {
    /// Limit the number of conflicts of the next solve.
    ///
    /// The limit counts from the current number of conflicts. `None` removes the limit.
    pub fn set_conflict_limit(&mut self, limit: Option<u64>) {
        self.conflict_limit = limit.map(|limit| self.conflicts.saturating_add(limit));
    }

    /// Limit the number of decisions of the next solve.
    pub fn set_decision_limit(&mut self, limit: Option<u64>, decisions_so_far: u64) {
        self.decision_limit = limit.map(|limit| decisions_so_far.saturating_add(limit));
    }

    /// Track the glue of a freshly learned clause.
    pub fn note_learned_glue(&mut self, glue: usize) {
        let glue = glue as f64;
        if self.glue_samples == 0 {
            self.glue_fast = glue;
            self.glue_slow = glue;
        } else {
            self.glue_fast += (glue - self.glue_fast) / 32.0;
            self.glue_slow += (glue - self.glue_slow) / 4096.0;
        }
        self.glue_samples += 1;
    }

    fn limit_exhausted(&self, decisions: u64) -> bool {
        if let Some(limit) = self.conflict_limit {
            if self.conflicts >= limit {
                return true;
            }
        }
        if let Some(limit) = self.decision_limit {
            if decisions >= limit {
                return true;
            }
        }
        false
    }
}

/// Perform one step of the schedule.
///
/// Returns false when the solver is done, either because a result was found or because the solve
/// was interrupted by termination or a limit.
pub fn schedule_step(
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
) -> bool {
    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return false;
    }

    // Termination checkpoint, reached after each conflict.
    let requested = ctx.part(SolverStateP).terminate_requested()
        || ctx.part_mut(CallbacksP).should_terminate();
    if requested {
        ctx.part_mut(SolverStateP).interrupted = true;
        full_restart(ctx.borrow());
        return false;
    }

    if ctx
        .part(ScheduleP)
        .limit_exhausted(ctx.part(StatsP).decisions)
    {
        ctx.part_mut(SolverStateP).interrupted = true;
        full_restart(ctx.borrow());
        return false;
    }

    let conflicts = ctx.part(ScheduleP).conflicts;

    if conflicts > 0 && conflicts % 5000 == 0 {
        let db = ctx.part(ClauseDbP);
        info!(
            "confl: {}k rest: {} vars: {} irred: {} core: {} mid: {} local: {}",
            conflicts / 1000,
            ctx.part(ScheduleP).restarts,
            ctx.part(VariablesP).mapped_count(),
            db.count_by_tier(Tier::Irred),
            db.count_by_tier(Tier::Core),
            db.count_by_tier(Tier::Mid),
            db.count_by_tier(Tier::Local)
        );
    }

    let restart_due = {
        let schedule = ctx.part(ScheduleP);
        let config = ctx.part(SolverConfigP);

        schedule.next_restart == conflicts
            || (schedule.glue_samples > 128
                && schedule.glue_fast > schedule.glue_slow * config.restart_glue_margin
                && conflicts - schedule.last_restart >= config.restart_min_interval)
    };

    if restart_due {
        restart(ctx.borrow());
        ctx.part_mut(StatsP).restarts += 1;
        let scale = ctx.part(SolverConfigP).luby_restart_interval_scale;
        let schedule = ctx.part_mut(ScheduleP);
        schedule.restarts += 1;
        schedule.last_restart = conflicts;
        if schedule.next_restart <= conflicts {
            schedule.next_restart = conflicts.saturating_add(scale * schedule.luby.advance());
        }
    }

    if conflicts >= ctx.part(ScheduleP).next_reduce_locals {
        if ctx.part(ScheduleP).next_reduce_locals > 0 {
            reduce_locals(ctx.borrow());
        }
        let interval = ctx.part(SolverConfigP).reduce_locals_interval;
        ctx.part_mut(ScheduleP).next_reduce_locals = conflicts.saturating_add(interval);
    }

    if conflicts >= ctx.part(ScheduleP).next_reduce_mids {
        if ctx.part(ScheduleP).next_reduce_mids > 0 {
            reduce_mids(ctx.borrow());
        }
        let interval = ctx.part(SolverConfigP).reduce_mids_interval;
        ctx.part_mut(ScheduleP).next_reduce_mids = conflicts.saturating_add(interval);
    }

    // Clause reduction leaves deleted clauses in the allocation. Collect them once they make up
    // a large fraction, which requires unwinding to decision level 0.
    let needs_gc =
        ctx.part(ClauseDbP).garbage_size() * 2 > ctx.part(ClauseAllocP).buffer_size();
    if needs_gc {
        full_restart(ctx.borrow());
        collect_garbage_now(ctx.borrow());
        enable_watchlists(ctx.borrow());
    }

    if ctx.part(ScheduleP).next_inprocess == 0 {
        let interval = ctx.part(SolverConfigP).inprocess_interval;
        ctx.part_mut(ScheduleP).next_inprocess = interval;
    }

    let inprocess_due =
        ctx.part(SolverConfigP).inprocess && conflicts >= ctx.part(ScheduleP).next_inprocess;

    if inprocess_due {
        inprocess(ctx.borrow());
        let interval = ctx.part(SolverConfigP).inprocess_interval;
        ctx.part_mut(ScheduleP).next_inprocess = conflicts.saturating_add(interval);
        if ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return false;
        }
    }

    conflict_step(ctx.borrow());
    ctx.part_mut(ScheduleP).conflicts += 1;

    true
}
