//! Occurrence index for inprocessing.

use partial_ref::{partial, PartialRef};

use ipasat_formula::{Lit, Var};

use crate::clause::ClauseRef;
use crate::context::{parts::*, Context};

/// Clause occurrences per variable.
///
/// The index is built once per inprocessing round and covers every live clause, redundant ones
/// included. Strengthening and deletion leave stale entries behind, so every use has to check
/// the clause's deleted flag and that the literal is still present.
pub struct OccurIndex {
    occurs: Vec<Vec<ClauseRef>>,
}

impl OccurIndex {
    /// Build the occurrence index for all live clauses.
    pub fn build(mut ctx: partial!(Context, AssignmentP, ClauseAllocP, ClauseDbP)) -> OccurIndex {
        let mut index = OccurIndex {
            occurs: vec![vec![]; ctx.part(AssignmentP).assignment().len()],
        };

        let (db, ctx) = ctx.split_part(ClauseDbP);
        let alloc = ctx.part(ClauseAllocP);

        for &cref in db.clause_refs() {
            let clause = alloc.clause(cref);
            if clause.header().deleted() {
                continue;
            }
            index.add_clause(cref, clause.lits());
        }

        index
    }

    /// Add a new clause to the index.
    pub fn add_clause(&mut self, cref: ClauseRef, lits: &[Lit]) {
        for &lit in lits {
            self.occurs[lit.index()].push(cref);
        }
    }

    /// Clauses that may contain the given variable.
    ///
    /// Deleted clauses and clauses that lost the variable by strengthening are included, callers
    /// filter them.
    pub fn occurrences(&self, var: Var) -> &[ClauseRef] {
        &self.occurs[var.index()]
    }

    /// Number of possibly stale occurrences of a variable.
    pub fn occurrence_count(&self, var: Var) -> usize {
        self.occurs[var.index()].len()
    }

    /// Collect the live clauses containing the given literal.
    pub fn gather_lit(
        &self,
        mut ctx: partial!(Context, ClauseAllocP),
        lit: Lit,
        out: &mut Vec<ClauseRef>,
    ) {
        out.clear();
        let alloc = ctx.part(ClauseAllocP);
        for &cref in self.occurrences(lit.var()) {
            let clause = alloc.clause(cref);
            if !clause.header().deleted() && clause.lits().contains(&lit) {
                out.push(cref);
            }
        }
    }
}
