//! Equivalent literal substitution.
//!
//! Two binary clauses (a ∨ b) and (¬a ∨ ¬b) together force a = ¬b. The variable with the larger
//! internal index is substituted by the equivalent literal over the smaller one everywhere, and
//! loses its internal image. Two reconstruction entries recording the defining binary clauses
//! allow recovering the substituted variable's value from any model and restoring the
//! equivalence when the variable is mentioned again.

use partial_ref::{partial, PartialRef};

use rustc_hash::FxHashSet;

use ipasat_formula::Lit;

use crate::clause::db::{self, delete_clause_with_proof};
use crate::clause::{ClauseHeader, ClauseRef};
use crate::context::{parts::*, Context};
use crate::proof;
use crate::prop::{enqueue_assignment, Reason};
use crate::state::SatState;
use crate::variables::{self, Unmap};

use super::occur::OccurIndex;

fn normalize(a: Lit, b: Lit) -> (Lit, Lit) {
    if a.code() <= b.code() {
        (a, b)
    } else {
        (b, a)
    }
}

/// Find and substitute equivalent literals.
pub fn substitute_equivs(
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
    ),
    occ: &mut OccurIndex,
) {
    // Collect the binary clauses of the irredundant formula.
    let mut binaries: FxHashSet<(Lit, Lit)> = FxHashSet::default();
    {
        let (db, ctx_2) = ctx.split_part(ClauseDbP);
        let alloc = ctx_2.part(ClauseAllocP);
        for &cref in db.clause_refs() {
            let clause = alloc.clause(cref);
            let header = clause.header();
            if header.deleted() || header.redundant() || header.len() != 2 {
                continue;
            }
            let lits = clause.lits();
            binaries.insert(normalize(lits[0], lits[1]));
        }
    }

    let equivalences: Vec<(Lit, Lit)> = binaries
        .iter()
        .cloned()
        .filter(|&(a, b)| binaries.contains(&normalize(!a, !b)))
        .collect();

    for (a, b) in equivalences {
        if ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return;
        }

        // a = !b; substitute the variable with the larger index.
        let (kept, substituted) = if a.var().index() < b.var().index() {
            (!a, b)
        } else {
            (!b, a)
        };

        if substituted.var() == kept.var() {
            // (a v b) and (-a v -b) over a single variable is a root conflict, which propagation
            // handles.
            continue;
        }

        if ctx.part(AssignmentP).var_value(substituted.var()).is_some()
            || ctx.part(AssignmentP).var_value(kept.var()).is_some()
        {
            continue;
        }

        {
            let variables = ctx.part(VariablesP);
            let ext = match variables.try_external_from_internal(substituted.var()) {
                Some(ext) => ext,
                None => continue,
            };
            let data = variables.var_data_external(ext);
            if data.protected() || data.unit.is_some() {
                continue;
            }
            if variables
                .try_external_from_internal(kept.var())
                .is_none()
            {
                continue;
            }
        }

        substitute(ctx.borrow(), occ, substituted, kept);
        ctx.part_mut(StatsP).substituted_vars += 1;
    }
}

/// Replace every occurrence of `from` by `into` (and `!from` by `!into`).
///
/// `from` and `into` satisfy `from = into` in every model of the formula.
fn substitute(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ExtensionP,
        mut ImplGraphP,
        mut ProofP,
        mut SolverStateP,
        mut TrailP,
        mut VariablesP,
        mut VsidsP,
        mut WatchlistsP,
    ),
    occ: &mut OccurIndex,
    from: Lit,
    into: Lit,
) {
    let mut refs: Vec<ClauseRef> = vec![];
    {
        let alloc = ctx.part(ClauseAllocP);
        for &cref in occ.occurrences(from.var()) {
            let clause = alloc.clause(cref);
            if !clause.header().deleted()
                && clause.lits().iter().any(|lit| lit.var() == from.var())
                && !refs.contains(&cref)
            {
                refs.push(cref);
            }
        }
    }

    // Replacements producing tautologies are processed last. This keeps the defining binary
    // clauses of the equivalence alive while the replacement clauses are derived from them.
    refs.sort_by_key(|&cref| {
        let clause = ctx.part(ClauseAllocP).clause(cref);
        clause.lits().iter().any(|&lit| {
            let mapped = map_lit(lit, from, into);
            clause
                .lits()
                .iter()
                .any(|&other| map_lit(other, from, into) == !mapped)
        })
    });

    for cref in refs {
        if ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return;
        }

        let (new_lits, tier, tautology) = {
            let clause = ctx.part(ClauseAllocP).clause(cref);
            let mut new_lits: Vec<Lit> = vec![];
            let mut tautology = false;
            for &lit in clause.lits() {
                let mapped = map_lit(lit, from, into);
                if new_lits.contains(&!mapped) {
                    tautology = true;
                    break;
                }
                if !new_lits.contains(&mapped) {
                    new_lits.push(mapped);
                }
            }
            (new_lits, clause.header().tier(), tautology)
        };

        if tautology {
            delete_clause_with_proof(ctx.borrow(), cref);
            continue;
        }

        proof::add_internal_clause(ctx.borrow(), &new_lits);

        match new_lits[..] {
            [] => unreachable!("substitution cannot produce an empty clause"),
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
                header.set_tier(tier);
                let new_ref = db::add_clause(ctx.borrow(), header, &new_lits);
                occ.add_clause(new_ref, &new_lits);
            }
        }

        delete_clause_with_proof(ctx.borrow(), cref);
    }

    // Record the defining clauses so models determine the substituted variable and restores
    // bring the equivalence back.
    {
        let (variables, mut ctx) = ctx.split_part(VariablesP);
        let from_ext = variables.external_from_internal_lit(from);
        let into_ext = variables.external_from_internal_lit(into);

        let extension = ctx.part_mut(ExtensionP);
        extension.push_witness(&[from_ext], &[from_ext, !into_ext]);
        extension.push_witness(&[!from_ext], &[!from_ext, into_ext]);
    }

    variables::unmap_internal(ctx.borrow(), from.var(), Unmap::Substituted);
}

fn map_lit(lit: Lit, from: Lit, into: Lit) -> Lit {
    if lit == from {
        into
    } else if lit == !from {
        !into
    } else {
        lit
    }
}
