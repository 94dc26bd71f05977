//! Unit propagation.
use partial_ref::{partial, PartialRef};

use crate::context::{parts::*, Context};

pub mod assignment;
pub mod graph;
pub mod watch;
pub mod watched;

pub use assignment::{
    backtrack, enqueue_assignment, full_restart, restart, Assignment, Trail,
};
pub use graph::{Conflict, ImplGraph, ImplNode, Reason};
pub use watch::{enable_watchlists, Watch, Watchlists};

use watched::propagate_watched;

/// Propagate all enqueued assignments.
///
/// Returns when the queue is empty or a conflict was found.
pub fn propagate(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ImplGraphP,
        mut StatsP,
        mut TrailP,
        mut WatchlistsP,
    ),
) -> Result<(), Conflict> {
    debug_assert!(ctx.part(WatchlistsP).enabled());

    while let Some(lit) = ctx.part_mut(TrailP).pop_queue() {
        ctx.part_mut(StatsP).propagations += 1;
        propagate_watched(ctx.borrow(), lit)?;
    }

    Ok(())
}
