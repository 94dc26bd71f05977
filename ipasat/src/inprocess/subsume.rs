//! Backward subsumption and self-subsuming resolution.
//!
//! A clause C subsumes every clause D with C ⊆ D; such a D is deleted. When C subsumes D except
//! for a single literal of opposite polarity, the resolvent of C and D on that literal is D
//! without it, so D can be strengthened in place.
//!
//! Candidate pairs are found through the occurrence index: for each irredundant clause C the
//! occurrence list of the variable with the fewest occurrences is scanned. A 64-bit variable set
//! abstraction rejects most non-candidates without touching the clause.

use partial_ref::{partial, PartialRef};

use ipasat_formula::Lit;

use crate::clause::db::delete_clause_with_proof;
use crate::clause::ClauseRef;
use crate::context::{parts::*, Context};
use crate::proof;
use crate::prop::{enqueue_assignment, Reason};
use crate::state::SatState;

use super::occur::OccurIndex;

/// Clauses longer than this are not used as subsuming clauses.
const SUBSUME_SIZE_LIMIT: usize = 30;

/// Variable set abstraction of a clause.
fn signature(lits: &[Lit]) -> u64 {
    let mut signature = 0u64;
    for &lit in lits {
        signature |= 1 << (lit.index() % 64);
    }
    signature
}

/// Result of matching a subsuming clause against a candidate.
enum Match {
    None,
    Subsumed,
    /// The literal to remove from the candidate.
    SelfSubsume(Lit),
}

/// Check whether `c` subsumes `d`, allowing one literal of `c` to occur negated in `d`.
fn subsume_check(c: &[Lit], d: &[Lit]) -> Match {
    let mut flipped = None;

    for &lit in c {
        if d.contains(&lit) {
            continue;
        }
        if flipped.is_none() && d.contains(&!lit) {
            flipped = Some(!lit);
            continue;
        }
        return Match::None;
    }

    match flipped {
        None => Match::Subsumed,
        Some(lit) => Match::SelfSubsume(lit),
    }
}

/// One pass of backward subsumption over all irredundant clauses.
pub fn backward_subsume(
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
        SolverConfigP,
        VariablesP,
    ),
    occ: &mut OccurIndex,
) {
    let mut budget = ctx.part(SolverConfigP).subsume_steps;

    let snapshot: Vec<ClauseRef> = ctx.part(ClauseDbP).clause_refs().to_vec();
    let mut c_lits: Vec<Lit> = vec![];

    for &cref in snapshot.iter() {
        if budget == 0 || ctx.part(SolverStateP).sat_state != SatState::Unknown {
            break;
        }

        {
            let clause = ctx.part(ClauseAllocP).clause(cref);
            let header = clause.header();
            if header.deleted() || header.redundant() || header.len() > SUBSUME_SIZE_LIMIT {
                continue;
            }
            c_lits.clear();
            c_lits.extend_from_slice(clause.lits());
        }

        let c_signature = signature(&c_lits);

        let best_var = c_lits
            .iter()
            .map(|lit| lit.var())
            .min_by_key(|&var| occ.occurrence_count(var))
            .expect("empty clause in database");

        let candidates: Vec<ClauseRef> = occ.occurrences(best_var).to_vec();

        for &d_ref in candidates.iter() {
            if budget == 0 {
                break;
            }
            budget -= 1;

            if d_ref == cref {
                continue;
            }

            let matched = {
                let d_clause = ctx.part(ClauseAllocP).clause(d_ref);
                let d_header = d_clause.header();
                if d_header.deleted() || d_header.len() < c_lits.len() {
                    continue;
                }
                let d_lits = d_clause.lits();
                if c_signature & !signature(d_lits) != 0 {
                    continue;
                }
                budget = budget.saturating_sub(c_lits.len() as u64);
                subsume_check(&c_lits, d_lits)
            };

            match matched {
                Match::None => {}
                Match::Subsumed => {
                    delete_clause_with_proof(ctx.borrow(), d_ref);
                    ctx.part_mut(StatsP).subsumed_clauses += 1;
                }
                Match::SelfSubsume(lit) => {
                    strengthen_clause(ctx.borrow(), d_ref, lit);
                    ctx.part_mut(StatsP).strengthened_clauses += 1;
                }
            }
        }
    }
}

/// Remove a literal from a clause, replacing it by its resolvent.
///
/// Runs with disabled watchlists. A clause shrinking to a unit is removed from the database and
/// enqueued at level 0, an empty result makes the formula unsatisfiable.
pub fn strengthen_clause(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut ProofP,
        mut SolverStateP,
        mut TrailP,
        VariablesP,
    ),
    cref: ClauseRef,
    lit: Lit,
) {
    let new_lits: Vec<Lit> = ctx
        .part(ClauseAllocP)
        .clause(cref)
        .lits()
        .iter()
        .cloned()
        .filter(|&other| other != lit)
        .collect();

    proof::add_internal_clause(ctx.borrow(), &new_lits);

    match new_lits[..] {
        [] => {
            delete_clause_with_proof(ctx.borrow(), cref);
            proof::add_empty_clause(ctx.borrow());
            ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
        }
        [unit] => {
            delete_clause_with_proof(ctx.borrow(), cref);
            match ctx.part(AssignmentP).lit_value(unit) {
                Some(false) => {
                    proof::add_empty_clause(ctx.borrow());
                    ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
                }
                Some(true) => {}
                None => enqueue_assignment(ctx.borrow(), unit, Reason::Unit),
            }
        }
        _ => {
            if ctx.part(ProofP).is_active() {
                let old_lits = ctx.part(ClauseAllocP).clause(cref).lits().to_vec();
                proof::delete_internal_clause(ctx.borrow(), &old_lits);
            }
            let clause = ctx.part_mut(ClauseAllocP).clause_mut(cref);
            clause.lits_mut()[..new_lits.len()].copy_from_slice(&new_lits);
            clause.header_mut().set_len(new_lits.len());
        }
    }
}
