//! Database for clauses.
use std::mem::transmute;

use partial_ref::{partial, PartialRef};

use ipasat_formula::Lit;

use super::{header::HEADER_LEN, ClauseHeader, ClauseRef};

use crate::context::{parts::*, Context};
use crate::proof;
use crate::prop::Reason;

/// Partitions of the clause database.
///
/// The clauses are partitioned into 4 [`Tier`]s. This follows the approach described by Chanseok
/// Oh in ["Between SAT and UNSAT: The Fundamental Difference in CDCL SAT"][chanseok-oh],
/// section 4.
///
/// [chanseok-oh]: https://doi.org/10.1007/978-3-319-24318-4_23
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Tier {
    Irred = 0,
    Core = 1,
    Mid = 2,
    Local = 3,
}

impl Tier {
    /// Total number of tiers.
    pub const fn count() -> usize {
        4
    }

    /// Cast an index into the corresponding tier.
    pub unsafe fn from_index(index: usize) -> Tier {
        debug_assert!(index < Tier::count());
        transmute(index as u8)
    }
}

/// Database for clauses.
///
/// Removal of clauses from the `clauses` and the `by_tier` fields can be delayed. The clause
/// header's deleted and tier fields need to be checked when iterating over these. `by_tier` may
/// also contain duplicate entries.
#[derive(Default)]
pub struct ClauseDb {
    /// May contain deleted clauses, see above
    pub(super) clauses: Vec<ClauseRef>,
    /// May contain deleted and moved clauses, see above
    pub(super) by_tier: [Vec<ClauseRef>; Tier::count()],
    /// These counts should always be up to date
    pub(super) count_by_tier: [usize; Tier::count()],
    /// Size of deleted but not collected clauses
    pub(super) garbage_size: usize,
}

impl ClauseDb {
    /// The number of clauses of a given tier.
    pub fn count_by_tier(&self, tier: Tier) -> usize {
        self.count_by_tier[tier as usize]
    }

    /// The number of redundant clauses.
    pub fn redundant_count(&self) -> usize {
        self.count_by_tier(Tier::Core) + self.count_by_tier(Tier::Mid) + self.count_by_tier(Tier::Local)
    }

    /// All clause references ever added.
    ///
    /// May contain deleted clauses, check the headers when iterating.
    pub fn clause_refs(&self) -> &[ClauseRef] {
        &self.clauses
    }

    /// Size of deleted but not collected clauses, in allocation units.
    pub fn garbage_size(&self) -> usize {
        self.garbage_size
    }
}

/// Add a clause to the database.
///
/// When the watchlists are enabled the first two literals of the clause are watched.
pub fn add_clause(
    mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP, mut WatchlistsP),
    header: ClauseHeader,
    lits: &[Lit],
) -> ClauseRef {
    let tier = header.tier();

    let cref = ctx.part_mut(ClauseAllocP).add_clause(header, lits);

    let db = ctx.part_mut(ClauseDbP);

    db.clauses.push(cref);
    db.by_tier[tier as usize].push(cref);
    db.count_by_tier[tier as usize] += 1;

    let watchlists = ctx.part_mut(WatchlistsP);
    if watchlists.enabled() {
        watchlists.watch_clause(cref, [lits[0], lits[1]]);
    }

    cref
}

/// Change the tier of a clause.
///
/// This is a noop for a clause already of the specified tier.
pub fn set_clause_tier(
    mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP),
    cref: ClauseRef,
    tier: Tier,
) {
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let db = ctx.part_mut(ClauseDbP);

    let old_tier = alloc.header(cref).tier();
    if old_tier != tier {
        db.count_by_tier[old_tier as usize] -= 1;
        db.count_by_tier[tier as usize] += 1;

        alloc.header_mut(cref).set_tier(tier);
        db.by_tier[tier as usize].push(cref);
    }
}

/// Delete a clause from the database.
///
/// This only performs the database bookkeeping. Callers emit the matching proof step, see
/// [`delete_clause_with_proof`].
pub fn delete_clause(
    mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP),
    cref: ClauseRef,
) {
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let db = ctx.part_mut(ClauseDbP);

    let header = alloc.header_mut(cref);

    debug_assert!(!header.deleted(), "delete_clause for already deleted clause");

    header.set_deleted(true);

    db.count_by_tier[header.tier() as usize] -= 1;

    db.garbage_size += header.len() + HEADER_LEN;
}

/// Delete a clause from the database and emit a proof deletion step.
pub fn delete_clause_with_proof(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ProofP,
        VariablesP
    ),
    cref: ClauseRef,
) {
    if ctx.part(ProofP).is_active() {
        let lits = ctx.part(ClauseAllocP).clause(cref).lits().to_vec();
        proof::delete_internal_clause(ctx.borrow(), &lits);
    }
    delete_clause(ctx.borrow(), cref);
}

/// Delete a clause unless it is the reason for a current assignment.
///
/// Returns whether the clause was deleted.
pub fn try_delete_clause(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ProofP,
        AssignmentP,
        ImplGraphP,
        VariablesP
    ),
    cref: ClauseRef,
) -> bool {
    let lit_0 = ctx.part(ClauseAllocP).clause(cref).lits()[0];
    let locked = ctx.part(AssignmentP).lit_is_true(lit_0)
        && ctx.part(ImplGraphP).reason(lit_0.var()) == &Reason::Long(cref);

    if !locked {
        delete_clause_with_proof(ctx.borrow(), cref);
    }

    !locked
}

/// Iterate over all live clauses, keeping those for which the passed closure returns true.
///
/// The closure may shrink the given clause in place. Clauses for which it returns false are
/// deleted without emitting a proof step.
pub fn filter_clauses<F>(mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP), mut filter: F)
where
    F: FnMut(&mut crate::clause::alloc::ClauseAlloc, ClauseRef) -> bool,
{
    let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
    let alloc = ctx.part_mut(ClauseAllocP);
    let mut garbage_size = 0;
    let count_by_tier = &mut db.count_by_tier;
    db.clauses.retain(|&cref| {
        let header = alloc.header(cref);
        if header.deleted() {
            false
        } else if filter(alloc, cref) {
            true
        } else {
            let header = alloc.header_mut(cref);
            header.set_deleted(true);
            count_by_tier[header.tier() as usize] -= 1;
            garbage_size += header.len() + HEADER_LEN;
            false
        }
    });
    db.garbage_size += garbage_size;
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use ipasat_formula::cnf_formula;

    use crate::context::set_var_count;

    #[test]
    fn set_tiers_and_deletes() {
        let mut ctx = Context::default();

        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 8);

        let clauses = cnf_formula![
            1, 2, 3;
            4, -5, 6;
            -2, 3, -4;
            -3, 5, 2, 7, 5;
        ];

        let tiers = vec![Tier::Irred, Tier::Core, Tier::Mid, Tier::Local];
        let new_tiers = vec![Tier::Irred, Tier::Local, Tier::Local, Tier::Core];

        let mut crefs = vec![];

        for (clause, &tier) in clauses.iter().zip(tiers.iter()) {
            let mut header = ClauseHeader::new();
            header.set_tier(tier);
            let cref = add_clause(ctx.borrow(), header, clause);
            crefs.push(cref);
        }

        for (&cref, &tier) in crefs.iter().rev().zip(new_tiers.iter().rev()) {
            set_clause_tier(ctx.borrow(), cref, tier);
        }

        // We only check presence, as deletion from these lists is delayed
        assert!(ctx.part(ClauseDbP).by_tier[Tier::Irred as usize].contains(&crefs[0]));
        assert!(ctx.part(ClauseDbP).by_tier[Tier::Core as usize].contains(&crefs[3]));
        assert!(ctx.part(ClauseDbP).by_tier[Tier::Local as usize].contains(&crefs[1]));
        assert!(ctx.part(ClauseDbP).by_tier[Tier::Local as usize].contains(&crefs[2]));

        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Irred), 1);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Core), 1);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Mid), 0);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Local), 2);

        delete_clause(ctx.borrow(), crefs[0]);
        delete_clause(ctx.borrow(), crefs[2]);

        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Irred), 0);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Core), 1);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Mid), 0);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Local), 1);
    }
}
