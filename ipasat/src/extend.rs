//! Reconstruction stack for eliminated variables.
//!
//! Inprocessing techniques that remove clauses in ways that only preserve equisatisfiability
//! record a witness entry here: the removed clause together with the witness literals whose
//! flipping repairs any model that falsifies the clause. Replaying the stack in reverse order
//! against a model of the remaining clauses yields a model of the original formula.
//!
//! All literals are stored in the external encoding, so entries survive internal renumbering.
//!
//! The entries are kept in a single flat literal arena with recorded offsets, so reverse
//! traversal needs no per-entry allocation.

use partial_ref::{partial, PartialRef};

use ipasat_formula::{Lit, Var};

use crate::context::{parts::*, Context};
use crate::load::load_clause;
use crate::proof;
use crate::variables;

/// Offsets of one witness entry into the literal arena.
#[derive(Copy, Clone)]
struct EntryInfo {
    offset: usize,
    witness_len: u32,
    clause_len: u32,
    dead: bool,
}

/// One entry of the reconstruction stack.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Witness<'a> {
    /// Literals to flip when the clause is falsified.
    pub witness: &'a [Lit],
    /// The removed clause, in external encoding.
    pub clause: &'a [Lit],
}

/// Reconstruction stack for eliminated variables.
#[derive(Default)]
pub struct ExtensionStack {
    lits: Vec<Lit>,
    entries: Vec<EntryInfo>,
}

impl ExtensionStack {
    /// Record a removed clause and its witness literals.
    pub fn push_witness(&mut self, witness: &[Lit], clause: &[Lit]) {
        debug_assert!(!witness.is_empty());
        debug_assert!(witness.iter().all(|lit| clause.contains(lit)));
        let offset = self.lits.len();
        self.lits.extend_from_slice(witness);
        self.lits.extend_from_slice(clause);
        self.entries.push(EntryInfo {
            offset,
            witness_len: witness.len() as u32,
            clause_len: clause.len() as u32,
            dead: false,
        });
    }

    fn witness_at(&self, info: EntryInfo) -> Witness {
        let witness_end = info.offset + info.witness_len as usize;
        let clause_end = witness_end + info.clause_len as usize;
        Witness {
            witness: &self.lits[info.offset..witness_end],
            clause: &self.lits[witness_end..clause_end],
        }
    }

    /// Iterator over all live entries in push order.
    pub fn witnesses<'a>(&'a self) -> impl DoubleEndedIterator<Item = Witness<'a>> + 'a {
        self.entries
            .iter()
            .filter(|info| !info.dead)
            .map(move |&info| self.witness_at(info))
    }

    /// Extend a model over the external variables by replaying the stack in reverse.
    ///
    /// For every entry whose clause is not satisfied by the model the witness literals are
    /// flipped to satisfy it.
    pub fn extend_model(&self, model: &mut Vec<Option<bool>>) {
        for info in self.entries.iter().rev() {
            if info.dead {
                continue;
            }
            let entry = self.witness_at(*info);
            let satisfied = entry.clause.iter().any(|&lit| {
                model
                    .get(lit.index())
                    .cloned()
                    .flatten()
                    .map(|value| value == lit.is_positive())
                    .unwrap_or(false)
            });
            if !satisfied {
                for &lit in entry.witness {
                    if model.len() <= lit.index() {
                        model.resize(lit.index() + 1, None);
                    }
                    model[lit.index()] = Some(lit.is_positive());
                }
            }
        }
    }
}

/// Bring back the clauses recorded for a removed external variable.
///
/// All live entries mentioning the variable in their clause are marked dead and their clauses
/// are loaded back into the solver. This reactivates the variable so new clauses or assumptions
/// over it are sound.
pub fn restore_external(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
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
    ext: Var,
) {
    {
        let data = ctx.part_mut(VariablesP).var_data_external_mut(ext);
        data.eliminated = false;
        data.substituted = false;
    }

    variables::alloc_internal(ctx.borrow(), ext);

    let mut restored: Vec<Vec<Lit>> = vec![];

    {
        let extension = ctx.part_mut(ExtensionP);
        for index in 0..extension.entries.len() {
            let info = extension.entries[index];
            if info.dead {
                continue;
            }
            let entry = extension.witness_at(info);
            if entry.clause.iter().any(|lit| lit.var() == ext) {
                restored.push(entry.clause.to_vec());
                extension.entries[index].dead = true;
            }
        }
    }

    let mut internal_lits = vec![];

    for clause in restored {
        variables::internal_from_external_lits(ctx.borrow(), &mut internal_lits, &clause);
        proof::add_internal_clause(ctx.borrow(), &internal_lits);
        load_clause(ctx.borrow(), &internal_lits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ipasat_formula::lits;

    #[test]
    fn reverse_replay_flips_witnesses() {
        let mut stack = ExtensionStack::default();

        // Variable 3 eliminated from (3 v 1) and (-3 v 2)
        stack.push_witness(&lits![3], &lits![3, 1]);
        stack.push_witness(&lits![-3], &lits![-3, 2]);

        let mut model = vec![Some(false), Some(true), None];
        stack.extend_model(&mut model);
        // (-3 v 2) is satisfied by 2, (3 v 1) needs 3 flipped true
        assert_eq!(model[2], Some(true));

        let mut model = vec![Some(true), Some(false), None];
        stack.extend_model(&mut model);
        // (-3 v 2) needs -3, afterwards (3 v 1) is satisfied by 1
        assert_eq!(model[2], Some(false));
    }

    #[test]
    fn dead_entries_are_skipped() {
        let mut stack = ExtensionStack::default();
        stack.push_witness(&lits![2], &lits![2]);
        stack.entries[0].dead = true;

        let mut model = vec![Some(true), None];
        stack.extend_model(&mut model);
        assert_eq!(model[1], None);

        assert_eq!(stack.witnesses().count(), 0);
    }
}
