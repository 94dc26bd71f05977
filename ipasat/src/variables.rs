//! Mapping between external and internal variables.
//!
//! The solver works on a contiguous range of internal variables. Users address variables by
//! arbitrary external indices. The mapping between the two is partial: external variables that
//! were eliminated, substituted or fixed at the root level have no internal image, but their
//! metadata (and for removed variables their reconstruction witnesses) stays available.

use partial_ref::{partial, PartialRef};

use rustc_hash::FxHashSet;

use ipasat_formula::{Lit, Var};

use crate::context::{parts::*, set_var_count, Context};
use crate::decision;
use crate::extend;

pub mod data;
pub mod var_map;

use data::VarData;
use var_map::VarBiMap;

/// Mapping between external and internal variables.
#[derive(Default)]
pub struct Variables {
    /// Bidirectional mapping, forward direction is external to internal.
    int_from_ext: VarBiMap,
    /// Internal variables that can be reused without growing the internal watermark.
    int_freelist: FxHashSet<Var>,
    /// Metadata, indexed by external variable indices.
    var_data: Vec<VarData>,
    /// Largest external variable count requested via reserve.
    reserved: usize,
    /// Number of external variables with an internal image.
    mapped: usize,
}

impl Variables {
    /// Number of allocated internal variables.
    pub fn internal_watermark(&self) -> usize {
        self.int_from_ext.bwd().watermark()
    }

    /// One above the largest external variable index mentioned so far.
    pub fn external_watermark(&self) -> usize {
        self.var_data.len().max(self.reserved)
    }

    /// Record that the user will use external variables up to the given count.
    pub fn reserve(&mut self, count: usize) {
        self.reserved = self.reserved.max(count);
    }

    /// Number of external variables with an internal image.
    pub fn mapped_count(&self) -> usize {
        self.mapped
    }

    /// Number of external variables fixed at the root level.
    pub fn fixed_count(&self) -> usize {
        self.var_data
            .iter()
            .filter(|data| data.unit.is_some())
            .count()
    }

    /// The internal image of an external variable.
    pub fn try_internal_from_external(&self, ext: Var) -> Option<Var> {
        self.int_from_ext.fwd().get(ext)
    }

    /// The external preimage of an internal variable.
    pub fn try_external_from_internal(&self, int: Var) -> Option<Var> {
        self.int_from_ext.bwd().get(int)
    }

    /// The external preimage of an internal variable.
    ///
    /// Internal variables without an external preimage only exist when the internal layer is
    /// driven directly, as done in internal tests. There the identity is used.
    pub fn external_from_internal(&self, int: Var) -> Var {
        self.try_external_from_internal(int).unwrap_or(int)
    }

    /// Map an internal literal to its external encoding.
    pub fn external_from_internal_lit(&self, lit: Lit) -> Lit {
        lit.map_var(|var| self.external_from_internal(var))
    }

    /// Metadata of an external variable.
    pub fn var_data_external(&self, ext: Var) -> &VarData {
        static DEFAULT: VarData = VarData {
            created: false,
            unit: None,
            eliminated: false,
            substituted: false,
            frozen: 0,
            assumed: false,
            forced_phase: None,
        };
        self.var_data.get(ext.index()).unwrap_or(&DEFAULT)
    }

    /// Mutable metadata of an external variable, growing the metadata table as needed.
    pub fn var_data_external_mut(&mut self, ext: Var) -> &mut VarData {
        if self.var_data.len() <= ext.index() {
            self.var_data.resize(ext.index() + 1, VarData::default());
        }
        &mut self.var_data[ext.index()]
    }

    /// Iterator over all external variables the user mentioned.
    pub fn external_var_iter<'a>(&'a self) -> impl Iterator<Item = Var> + 'a {
        self.var_data
            .iter()
            .enumerate()
            .filter(|(_, data)| data.created)
            .map(|(index, _)| Var::from_index(index))
    }

    /// Get an unmapped internal variable.
    pub fn next_unmapped_internal(&self) -> Var {
        self.int_freelist
            .iter()
            .next()
            .cloned()
            .unwrap_or_else(|| Var::from_index(self.internal_watermark()))
    }
}

/// Maps an external variable to an internal variable.
///
/// If no internal image exists one is allocated. For an eliminated or substituted variable the
/// clauses recorded on the reconstruction stack are restored first.
pub fn internal_from_external(
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
) -> Var {
    let variables = ctx.part_mut(VariablesP);
    variables.var_data_external_mut(ext).created = true;

    if let Some(int) = variables.try_internal_from_external(ext) {
        return int;
    }

    if variables.var_data_external(ext).removed() {
        extend::restore_external(ctx.borrow(), ext);
        let variables = ctx.part(VariablesP);
        return variables
            .try_internal_from_external(ext)
            .expect("restore did not allocate an internal variable");
    }

    alloc_internal(ctx.borrow(), ext)
}

/// Allocate an internal image for an external variable that has none.
pub(crate) fn alloc_internal(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut ImplGraphP,
        mut TmpDataP,
        mut VariablesP,
        mut VsidsP,
        mut WatchlistsP,
    ),
    ext: Var,
) -> Var {
    let variables = ctx.part_mut(VariablesP);

    debug_assert!(variables.try_internal_from_external(ext).is_none());

    let int = variables.next_unmapped_internal();

    variables.int_from_ext.fwd_mut().insert(int, ext);
    variables.int_freelist.remove(&int);
    variables.mapped += 1;

    let new_watermark = variables.internal_watermark();
    if new_watermark > ctx.part(AssignmentP).assignment().len() {
        set_var_count(ctx.borrow(), new_watermark);
    }

    initialize_internal_var(ctx.borrow(), int, ext);

    int
}

/// Initialize a newly allocated internal variable.
///
/// This recovers the state of a variable that has a known value and was already propagated. This
/// is important so that when new clauses containing this variable are added, load_clause knows to
/// treat the assignment as given.
fn initialize_internal_var(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut VsidsP,
        VariablesP
    ),
    int: Var,
    ext: Var,
) {
    let (variables, mut ctx) = ctx.split_part(VariablesP);
    let unit = variables.var_data_external(ext).unit;

    ctx.part_mut(AssignmentP).set_var(int, unit);
    if unit.is_some() {
        ctx.part_mut(ImplGraphP).update_removed_unit(int);
    }
    decision::initialize_var(ctx.borrow(), int, unit.is_none());
}

/// Maps a slice of external lits to internal lits using [`internal_from_external`].
pub fn internal_from_external_lits(
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
    internal_lits: &mut Vec<Lit>,
    external_lits: &[Lit],
) {
    internal_lits.clear();
    for &lit in external_lits {
        let int = internal_from_external(ctx.borrow(), lit.var());
        internal_lits.push(Lit::from_var(int, lit.is_negative()));
    }
}

/// The reason a variable loses its internal image.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Unmap {
    Eliminated,
    Substituted,
}

/// Remove the internal image of a variable removed by inprocessing.
pub fn unmap_internal(
    mut ctx: partial!(Context, mut VariablesP, mut VsidsP),
    int: Var,
    unmap: Unmap,
) {
    decision::remove_var(ctx.borrow(), int);

    let variables = ctx.part_mut(VariablesP);

    let ext = variables
        .int_from_ext
        .bwd_mut()
        .remove(int)
        .expect("unmap_internal for unmapped variable");

    variables.int_freelist.insert(int);
    variables.mapped -= 1;

    let data = variables.var_data_external_mut(ext);
    match unmap {
        Unmap::Eliminated => data.eliminated = true,
        Unmap::Substituted => data.substituted = true,
    }
}

/// Rebuild the internal variable space excluding unmapped and fixed variables.
///
/// Requires decision level 0 with an empty trail and simplified clauses, so no live clause
/// contains a fixed variable. The watchlists are disabled and have to be rebuilt by the caller.
pub fn compact(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut IncrementalP,
        mut StatsP,
        mut TmpDataP,
        mut VariablesP,
        mut VsidsP,
        mut WatchlistsP,
        TrailP,
    ),
) {
    assert!(ctx.part(TrailP).current_level() == 0);
    assert!(ctx.part(TrailP).trail().is_empty());

    ctx.part_mut(WatchlistsP).disable();

    let variables = ctx.part_mut(VariablesP);
    let old_count = variables.internal_watermark();

    let mut new_from_old: Vec<Option<Var>> = vec![None; old_count];
    let mut kept: Vec<(Var, Var)> = vec![];

    for old_index in 0..old_count {
        let old = Var::from_index(old_index);
        if let Some(ext) = variables.try_external_from_internal(old) {
            let data = variables.var_data_external(ext);
            if data.unit.is_none() || data.assumed {
                let new = Var::from_index(kept.len());
                new_from_old[old_index] = Some(new);
                kept.push((new, ext));
            }
        }
    }

    let new_count = kept.len();

    variables.int_from_ext = VarBiMap::default();
    variables.int_freelist.clear();
    variables.mapped = new_count;
    for &(new, ext) in kept.iter() {
        variables.int_from_ext.fwd_mut().insert(new, ext);
    }

    // Renumber all live clauses in place.
    let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    for &cref in db.clause_refs() {
        if alloc.header(cref).deleted() {
            continue;
        }
        for lit in alloc.clause_mut(cref).lits_mut() {
            *lit = lit.map_var(|var| {
                new_from_old[var.index()].expect("live clause contains dropped variable")
            });
        }
    }

    ctx.part_mut(IncrementalP)
        .renumber_assumptions(&new_from_old);

    ctx.part_mut(AssignmentP).renumber(new_count, &new_from_old);
    ctx.part_mut(VsidsP).renumber(new_count, &new_from_old);

    let impl_graph = ctx.part_mut(ImplGraphP);
    impl_graph.nodes.clear();
    impl_graph.set_var_count(new_count);

    ctx.part_mut(AnalyzeConflictP).set_var_count(new_count);
    ctx.part_mut(TmpDataP).set_var_count(new_count);
    let watchlists = ctx.part_mut(WatchlistsP);
    watchlists.set_var_count(0);
    watchlists.set_var_count(new_count);

    // Fixed assumed variables keep their root assignment, which is no longer on the trail.
    let (variables, mut ctx) = ctx.split_part(VariablesP);
    for &(new, ext) in kept.iter() {
        let data = variables.var_data_external(ext);
        if let Some(value) = data.unit {
            ctx.part_mut(AssignmentP).set_var(new, Some(value));
            ctx.part_mut(ImplGraphP).update_removed_unit(new);
            decision::remove_var(ctx.borrow(), new);
        }
    }

    ctx.part_mut(StatsP).compactions += 1;
}
