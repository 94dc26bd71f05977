//! The incremental solver facade.
//!
//! [`Solver`] enforces the state machine of the public API and translates every call between the
//! external variable space and the internal engine. It holds no search state of its own beyond
//! the current API state and the buffers for the clause and assumptions under construction.

use std::io::{self, Read, Write};
use std::path::Path;

use partial_ref::{IntoPartialRef, IntoPartialRefMut, PartialRef};

use anyhow::Error;

use ipasat_dimacs::{write_dimacs_clauses, write_dimacs_header, DimacsHeader, DimacsParser, Strict};
use ipasat_formula::{CnfFormula, Lit, Var};

use crate::callbacks::{LearnSource, Learner, Terminator};
use crate::config::ConfigError;
use crate::context::{config_changed, parts::*, Context};
use crate::cube::{self, CubeStatus};
use crate::incremental::set_assumptions;
use crate::load::load_clause;
use crate::model::reconstruct_model;
use crate::proof::{ProofError, ProofFormat};
use crate::prop::full_restart;
use crate::schedule::schedule_step;
use crate::state::{SatState, TerminateHandle};
use crate::trace::ApiTrace;
use crate::variables;

/// Result of a satisfiability check.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Status {
    Satisfiable,
    Unsatisfiable,
    Unknown,
}

impl Status {
    /// The conventional solver exit code: 10 for satisfiable, 20 for unsatisfiable, 0 otherwise.
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Satisfiable => 10,
            Status::Unsatisfiable => 20,
            Status::Unknown => 0,
        }
    }
}

/// Observable states of the solver API.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum State {
    /// Freshly constructed, options may be changed.
    Configuring,
    /// Clauses or assumptions were given, no result is known.
    Unknown,
    /// A clause is partially added.
    Adding,
    /// A solve is running. Only observable from within callbacks.
    Solving,
    /// The last solve found a model.
    Satisfied,
    /// The last solve found the formula unsatisfiable under the assumptions.
    Unsatisfied,
}

/// An incremental boolean satisfiability solver.
pub struct Solver {
    ctx: Box<Context>,
    state: State,
    clause_buf: Vec<Lit>,
    assumption_buf: Vec<Lit>,
    lit_buf: Vec<Lit>,
    trace: ApiTrace,
}

impl Default for Solver {
    fn default() -> Solver {
        Solver::new()
    }
}

macro_rules! contract {
    ($solver:expr, $call:expr, $ok:expr) => {
        if !$ok {
            panic!(
                "API contract violation: '{}' called in state {:?}",
                $call, $solver.state
            );
        }
    };
}

impl Solver {
    /// Create a new solver.
    pub fn new() -> Solver {
        let mut solver = Solver {
            ctx: Box::new(Context::default()),
            state: State::Configuring,
            clause_buf: vec![],
            assumption_buf: vec![],
            lit_buf: vec![],
            trace: ApiTrace::from_env(),
        };
        solver.trace.record(format_args!("init"));
        solver
    }

    /// Current API state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Result of the last solve.
    pub fn status(&self) -> Status {
        match self.state {
            State::Satisfied => Status::Satisfiable,
            State::Unsatisfied => Status::Unsatisfiable,
            _ => Status::Unknown,
        }
    }

    fn is_ready(&self) -> bool {
        !matches!(self.state, State::Adding | State::Solving)
    }

    fn enter_unknown(&mut self) {
        self.state = State::Unknown;
        self.ctx.incremental.clear_failed_core();

        let state = &mut self.ctx.solver_state;
        state.sat_state = match state.sat_state {
            SatState::Unsat => SatState::Unsat,
            _ => SatState::Unknown,
        };
    }

    /// Set an option to the given value, which is clamped into the option's range.
    ///
    /// Options are only mutable while configuring, before the first clause or assumption.
    pub fn set(&mut self, name: &str, value: f64) -> Result<f64, ConfigError> {
        self.trace.record(format_args!("set {} {}", name, value));
        contract!(self, "set", self.state == State::Configuring);

        let result = self.ctx.solver_config.set(name, value)?;
        let mut ctx = self.ctx.into_partial_ref_mut();
        config_changed(ctx.borrow(), &Default::default());
        Ok(result)
    }

    /// Parse and apply a long option of the form `--name`, `--no-name` or `--name=value`.
    pub fn set_long_option(&mut self, option: &str) -> Result<f64, ConfigError> {
        self.trace.record(format_args!("option {}", option));
        contract!(self, "set_long_option", self.state == State::Configuring);

        let result = self.ctx.solver_config.set_long_option(option)?;
        let mut ctx = self.ctx.into_partial_ref_mut();
        config_changed(ctx.borrow(), &Default::default());
        Ok(result)
    }

    /// Current value of an option.
    pub fn get_option(&self, name: &str) -> Option<f64> {
        self.ctx.solver_config.get(name)
    }

    /// Apply a named configuration preset.
    pub fn configure(&mut self, preset: &str) -> Result<(), ConfigError> {
        self.trace.record(format_args!("configure {}", preset));
        contract!(self, "configure", self.state == State::Configuring);

        self.ctx.solver_config.configure(preset)?;
        let mut ctx = self.ctx.into_partial_ref_mut();
        config_changed(ctx.borrow(), &Default::default());
        Ok(())
    }

    /// Scale the inprocessing effort by `10^clamp(level, 0, 9)`.
    pub fn optimize(&mut self, level: i32) {
        self.trace.record(format_args!("optimize {}", level));
        contract!(self, "optimize", self.state == State::Configuring);

        self.ctx.solver_config.optimize(level);
    }

    /// Declare that external variables up to `count` will be used.
    pub fn reserve(&mut self, count: usize) {
        self.trace.record(format_args!("reserve {}", count));
        contract!(self, "reserve", true);

        self.ctx.variables.reserve(count);
    }

    /// Add a literal of the current clause, a zero terminates the clause.
    ///
    /// Literals use the DIMACS convention: the magnitude is the 1-based variable index, the sign
    /// selects the polarity.
    pub fn add(&mut self, lit: isize) {
        self.trace.record(format_args!("add {}", lit));
        contract!(
            self,
            "add",
            lit != isize::min_value() && lit.unsigned_abs() <= Var::max_count()
        );

        if lit == 0 {
            self.finish_clause();
        } else {
            self.clause_buf.push(Lit::from_dimacs(lit));
            self.state = State::Adding;
        }
    }

    /// Add a complete clause.
    pub fn add_clause(&mut self, clause: &[Lit]) {
        contract!(self, "add_clause", self.is_ready());

        self.clause_buf.extend_from_slice(clause);
        for &lit in clause {
            self.trace.record(format_args!("add {}", lit.to_dimacs()));
        }
        self.trace.record(format_args!("add 0"));
        self.finish_clause();
    }

    /// Add all clauses of a formula.
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        contract!(self, "add_formula", self.is_ready());

        self.ctx.variables.reserve(formula.var_count());
        for clause in formula.iter() {
            self.add_clause(clause);
        }
    }

    fn finish_clause(&mut self) {
        self.enter_unknown();

        let mut ctx = self.ctx.into_partial_ref_mut();
        variables::internal_from_external_lits(ctx.borrow(), &mut self.lit_buf, &self.clause_buf);
        load_clause(ctx.borrow(), &self.lit_buf);
        self.clause_buf.clear();
    }

    /// Assume a literal for the next solve.
    ///
    /// Assumptions are cleared when `solve`, `simplify` or `lookahead` returns.
    pub fn assume(&mut self, lit: isize) {
        self.trace.record(format_args!("assume {}", lit));
        contract!(
            self,
            "assume",
            lit != 0 && lit != isize::min_value() && lit.unsigned_abs() <= Var::max_count()
        );
        self.assume_lit(Lit::from_dimacs(lit));
    }

    /// Assume a literal for the next solve, typed variant.
    pub fn assume_lit(&mut self, lit: Lit) {
        contract!(self, "assume", self.is_ready());

        self.enter_unknown();
        self.assumption_buf.push(lit);
    }

    /// Remove all assumptions and the failed assumption core.
    pub fn reset_assumptions(&mut self) {
        self.trace.record(format_args!("reset_assumptions"));
        contract!(self, "reset_assumptions", self.is_ready());

        self.enter_unknown();
        self.clear_assumptions();
    }

    fn clear_assumptions(&mut self) {
        for &lit in self.assumption_buf.iter() {
            self.ctx
                .variables
                .var_data_external_mut(lit.var())
                .assumed = false;
        }
        self.assumption_buf.clear();

        let mut ctx = self.ctx.into_partial_ref_mut();
        full_restart(ctx.borrow());
        ctx.part_mut(IncrementalP).clear_assumptions();
    }

    /// Check the satisfiability of the formula under the current assumptions.
    pub fn solve(&mut self) -> Status {
        self.trace.record(format_args!("solve"));
        contract!(self, "solve", self.is_ready());

        self.state = State::Solving;
        self.ctx.solver_state.terminate.clear();
        self.ctx.solver_state.interrupted = false;
        self.ctx.stats.solves += 1;

        {
            let mut ctx = self.ctx.into_partial_ref_mut();
            variables::internal_from_external_lits(
                ctx.borrow(),
                &mut self.lit_buf,
                &self.assumption_buf,
            );
            set_assumptions(ctx.borrow(), &self.lit_buf);
        }

        for &lit in self.assumption_buf.iter() {
            self.ctx
                .variables
                .var_data_external_mut(lit.var())
                .assumed = true;
        }

        let status = {
            let mut ctx = self.ctx.into_partial_ref_mut();

            while schedule_step(ctx.borrow()) {}

            match ctx.part(SolverStateP).sat_state {
                SatState::Sat => {
                    reconstruct_model(ctx.borrow());
                    full_restart(ctx.borrow());
                    Status::Satisfiable
                }
                SatState::Unsat | SatState::UnsatUnderAssumptions => {
                    full_restart(ctx.borrow());
                    Status::Unsatisfiable
                }
                SatState::Unknown => {
                    debug_assert!(ctx.part(SolverStateP).interrupted);
                    full_restart(ctx.borrow());
                    Status::Unknown
                }
            }
        };

        self.state = match status {
            Status::Satisfiable => State::Satisfied,
            Status::Unsatisfiable => State::Unsatisfied,
            Status::Unknown => State::Unknown,
        };

        self.clear_assumptions();
        self.ctx.proof.flush_proof();

        status
    }

    /// Whether a literal is true in the found model.
    ///
    /// Only valid in the satisfied state.
    pub fn value(&self, lit: Lit) -> bool {
        contract!(self, "value", self.state == State::Satisfied);

        self.ctx.model.lit_is_true(lit)
    }

    /// The model found by the last solve as a set of true literals.
    ///
    /// Only valid in the satisfied state.
    pub fn model(&self) -> Vec<Lit> {
        contract!(self, "model", self.state == State::Satisfied);

        let ctx = self.ctx.into_partial_ref();
        let variables = ctx.part(VariablesP);
        let model = ctx.part(ModelP);

        variables
            .external_var_iter()
            .map(|var| var.lit(model.lit_is_true(var.positive())))
            .collect()
    }

    /// Whether a literal was part of the failed assumption core.
    ///
    /// Only valid in the unsatisfied state.
    pub fn failed(&self, lit: Lit) -> bool {
        contract!(self, "failed", self.state == State::Unsatisfied);

        self.ctx.incremental.failed_core().contains(&lit)
    }

    /// The root level value of a literal, if it is forced.
    pub fn fixed_value(&self, lit: Lit) -> Option<bool> {
        let data = self.ctx.variables.var_data_external(lit.var());
        data.unit.map(|value| value == lit.is_positive())
    }

    /// Protect a variable from being removed by inprocessing.
    ///
    /// Freezes nest, every freeze needs a matching melt.
    pub fn freeze(&mut self, var: Var) {
        self.trace.record(format_args!("freeze {}", var.to_dimacs()));
        contract!(self, "freeze", self.is_ready());

        let data = self.ctx.variables.var_data_external_mut(var);
        data.created = true;
        data.frozen += 1;
    }

    /// Undo one freeze of a variable.
    pub fn melt(&mut self, var: Var) {
        self.trace.record(format_args!("melt {}", var.to_dimacs()));
        contract!(
            self,
            "melt",
            self.ctx.variables.var_data_external(var).frozen > 0
        );
        self.ctx.variables.var_data_external_mut(var).frozen -= 1;
    }

    /// Whether a variable is currently frozen.
    pub fn frozen(&self, var: Var) -> bool {
        self.ctx.variables.var_data_external(var).frozen > 0
    }

    /// Force the decision phase of a variable to the polarity of the given literal.
    pub fn phase(&mut self, lit: Lit) {
        self.trace.record(format_args!("phase {}", lit.to_dimacs()));
        let data = self.ctx.variables.var_data_external_mut(lit.var());
        data.created = true;
        data.forced_phase = Some(lit.is_positive());
    }

    /// Remove a forced decision phase.
    pub fn unphase(&mut self, var: Var) {
        self.trace.record(format_args!("unphase {}", var.to_dimacs()));
        self.ctx
            .variables
            .var_data_external_mut(var)
            .forced_phase = None;
    }

    /// A handle that can request termination from another thread or a signal handler.
    pub fn terminate_handle(&self) -> TerminateHandle {
        self.ctx.solver_state.terminate.clone()
    }

    /// Request termination of the running solve.
    pub fn terminate(&self) {
        self.ctx.solver_state.terminate.terminate();
    }

    /// Attach a terminator callback, detaching any previous one.
    pub fn set_terminator(&mut self, terminator: impl Terminator + 'static) {
        self.ctx.callbacks.terminator = Some(Box::new(terminator));
    }

    /// Detach the terminator callback.
    pub fn clear_terminator(&mut self) {
        self.ctx.callbacks.terminator = None;
    }

    /// Attach a learned clause listener, detaching any previous one.
    pub fn set_learner(&mut self, learner: impl Learner + 'static) {
        self.ctx.callbacks.learner = Some(Box::new(learner));
    }

    /// Detach the learned clause listener.
    pub fn clear_learner(&mut self) {
        self.ctx.callbacks.learner = None;
    }

    /// Attach a source of externally learned clauses, detaching any previous one.
    pub fn set_learn_source(&mut self, source: impl LearnSource + 'static) {
        self.ctx.callbacks.learn_source = Some(Box::new(source));
    }

    /// Detach the source of externally learned clauses.
    pub fn clear_learn_source(&mut self) {
        self.ctx.callbacks.learn_source = None;
    }

    /// Limit the search effort of the following solves.
    ///
    /// Supported limits are `"conflicts"` and `"decisions"`. Returns false for unknown names.
    pub fn limit(&mut self, name: &str, value: Option<u64>) -> bool {
        self.trace
            .record(format_args!("limit {} {:?}", name, value));
        match name {
            "conflicts" => {
                self.ctx.schedule.set_conflict_limit(value);
                true
            }
            "decisions" => {
                let decisions = self.ctx.stats.decisions;
                self.ctx.schedule.set_decision_limit(value, decisions);
                true
            }
            _ => false,
        }
    }

    /// Start writing a DRAT proof to the given sink.
    ///
    /// Call this before adding clauses, otherwise the proof is missing their derivations.
    pub fn write_proof(&mut self, target: impl Write + 'static, format: ProofFormat) {
        self.trace.record(format_args!("proof"));
        contract!(self, "write_proof", self.state == State::Configuring);

        self.ctx.proof.write_proof(target, format);
    }

    /// Start writing a DRAT proof to a file the solver creates and owns.
    pub fn write_proof_path(&mut self, path: impl AsRef<Path>, format: ProofFormat) -> io::Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_proof(file, format);
        Ok(())
    }

    /// Stop proof writing and report any write failure encountered since it started.
    pub fn close_proof(&mut self) -> Result<(), ProofError> {
        self.trace.record(format_args!("close_proof"));
        self.ctx.proof.close_proof()
    }

    /// Flush buffered proof data to the sink.
    pub fn flush_proof(&mut self) {
        self.ctx.proof.flush_proof();
    }

    /// Run rounds of inprocessing without searching.
    pub fn simplify(&mut self, rounds: usize) -> Status {
        self.trace.record(format_args!("simplify {}", rounds));
        contract!(self, "simplify", self.is_ready());

        self.enter_unknown();

        {
            let mut ctx = self.ctx.into_partial_ref_mut();
            for _ in 0..rounds {
                if ctx.part(SolverStateP).sat_state != SatState::Unknown {
                    break;
                }
                crate::inprocess::inprocess(ctx.borrow());
            }
        }

        let status = match self.ctx.solver_state.sat_state {
            SatState::Unsat => Status::Unsatisfiable,
            _ => Status::Unknown,
        };

        self.state = match status {
            Status::Unsatisfiable => State::Unsatisfied,
            _ => State::Unknown,
        };

        self.clear_assumptions();
        status
    }

    /// Probe the best literal to branch on.
    ///
    /// Returns `None` when the formula is decided without search, which includes the root level
    /// becoming unsatisfiable. Clears the assumptions.
    pub fn lookahead(&mut self) -> Option<Lit> {
        self.trace.record(format_args!("lookahead"));
        contract!(self, "lookahead", self.is_ready());

        self.enter_unknown();

        let result = {
            let mut ctx = self.ctx.into_partial_ref_mut();
            crate::inprocess::settle_root(ctx.borrow());
            if ctx.part(SolverStateP).sat_state != SatState::Unknown {
                None
            } else {
                cube::lookahead(ctx.borrow())
            }
        };

        let result = result.map(|lit| self.ctx.variables.external_from_internal_lit(lit));

        if self.ctx.solver_state.sat_state == SatState::Unsat {
            self.state = State::Unsatisfied;
        }

        self.clear_assumptions();
        result
    }

    /// Build a disjoint set of cubes covering the remaining search space.
    ///
    /// Returns the solving status when the formula was decided while splitting, together with
    /// the cubes in external encoding.
    pub fn generate_cubes(&mut self, max_cubes: usize, min_depth: usize) -> (Status, Vec<Vec<Lit>>) {
        self.trace
            .record(format_args!("generate_cubes {} {}", max_cubes, min_depth));
        contract!(self, "generate_cubes", self.is_ready());

        self.enter_unknown();

        let (status, cubes) = {
            let mut ctx = self.ctx.into_partial_ref_mut();
            crate::inprocess::settle_root(ctx.borrow());
            if ctx.part(SolverStateP).sat_state != SatState::Unknown {
                (CubeStatus::Unsat, vec![])
            } else {
                let (status, cubes) = cube::generate_cubes(ctx.borrow(), max_cubes, min_depth);
                if let CubeStatus::Sat = status {
                    // A branch decided the formula, keep the model before unwinding.
                    reconstruct_model(ctx.borrow());
                    full_restart(ctx.borrow());
                }
                (status, cubes)
            }
        };

        let variables = &self.ctx.variables;
        let cubes: Vec<Vec<Lit>> = cubes
            .into_iter()
            .map(|cube| {
                cube.into_iter()
                    .map(|lit| variables.external_from_internal_lit(lit))
                    .collect()
            })
            .collect();

        let status = match status {
            CubeStatus::Sat => Status::Satisfiable,
            CubeStatus::Unsat => Status::Unsatisfiable,
            CubeStatus::Split => Status::Unknown,
        };

        match status {
            Status::Satisfiable => self.state = State::Satisfied,
            Status::Unsatisfiable => self.state = State::Unsatisfied,
            Status::Unknown => {}
        }

        self.clear_assumptions();
        (status, cubes)
    }

    /// Visit every irredundant clause of the current formula.
    ///
    /// Root satisfied clauses are omitted, root falsified literals are elided and root units are
    /// visited as unit clauses. The visitor returning false aborts the traversal, which is then
    /// reported as false.
    pub fn traverse_clauses(&self, mut visitor: impl FnMut(&[Lit]) -> bool) -> bool {
        let ctx = self.ctx.into_partial_ref();
        let variables = ctx.part(VariablesP);
        let assignment = ctx.part(AssignmentP);

        for ext in variables.external_var_iter() {
            if let Some(value) = variables.var_data_external(ext).unit {
                if !visitor(&[ext.lit(value)]) {
                    return false;
                }
            }
        }

        let alloc = ctx.part(ClauseAllocP);
        let mut external = vec![];

        'clauses: for &cref in ctx.part(ClauseDbP).clause_refs() {
            let clause = alloc.clause(cref);
            let header = clause.header();
            if header.deleted() || header.redundant() {
                continue;
            }

            external.clear();
            for &lit in clause.lits() {
                match assignment.lit_value(lit) {
                    Some(true) => continue 'clauses,
                    Some(false) => {}
                    None => external.push(variables.external_from_internal_lit(lit)),
                }
            }

            if !visitor(&external) {
                return false;
            }
        }

        true
    }

    /// Visit the reconstruction stack entries in push order.
    ///
    /// The visitor receives the witness literals and the removed clause of each entry.
    pub fn traverse_witnesses_forward(
        &self,
        mut visitor: impl FnMut(&[Lit], &[Lit]) -> bool,
    ) -> bool {
        self.ctx
            .extension
            .witnesses()
            .all(|entry| visitor(entry.witness, entry.clause))
    }

    /// Visit the reconstruction stack entries in reverse push order, the replay order of model
    /// reconstruction.
    pub fn traverse_witnesses_backward(
        &self,
        mut visitor: impl FnMut(&[Lit], &[Lit]) -> bool,
    ) -> bool {
        self.ctx
            .extension
            .witnesses()
            .rev()
            .all(|entry| visitor(entry.witness, entry.clause))
    }

    /// Read a formula in DIMACS CNF or incremental CNF format and add it to the solver.
    ///
    /// Returns the cubes of an incremental CNF input, which is empty for plain CNF.
    pub fn add_dimacs(
        &mut self,
        input: impl Read,
        strict: Strict,
    ) -> Result<Vec<Vec<Lit>>, Error> {
        contract!(self, "add_dimacs", self.is_ready());

        use io::BufRead;

        let mut buffer = io::BufReader::new(input);
        let mut parser = DimacsParser::with_strictness(strict);

        loop {
            let data = buffer.fill_buf()?;
            if data.is_empty() {
                break;
            }
            parser.parse_chunk(data)?;
            let len = data.len();
            buffer.consume(len);

            self.add_formula(&parser.take_formula());
        }
        parser.eof()?;
        self.add_formula(&parser.take_formula());
        parser.check_header()?;

        if let Some(header) = parser.header() {
            self.ctx.variables.reserve(header.var_count);
        }

        Ok(parser.take_cubes())
    }

    /// Write the current irredundant formula in DIMACS CNF format.
    pub fn write_dimacs(&self, target: &mut impl Write) -> io::Result<()> {
        let mut clause_count = 0;
        self.traverse_clauses(|_| {
            clause_count += 1;
            true
        });

        write_dimacs_header(
            target,
            DimacsHeader {
                var_count: self.ctx.variables.external_watermark(),
                clause_count,
                incremental: false,
            },
        )?;

        let mut result = Ok(());
        self.traverse_clauses(|clause| {
            result = write_dimacs_clauses(target, Some(clause));
            result.is_ok()
        });
        result
    }

    /// One above the largest external variable index in use.
    pub fn vars(&self) -> usize {
        self.ctx.variables.external_watermark()
    }

    /// Number of variables active in the search, neither fixed nor removed.
    pub fn active(&self) -> usize {
        let variables = &self.ctx.variables;
        variables
            .external_var_iter()
            .filter(|&var| {
                let data = variables.var_data_external(var);
                !data.removed() && data.unit.is_none()
            })
            .count()
    }

    /// Number of redundant clauses.
    pub fn redundant(&self) -> usize {
        self.ctx.clause_db.redundant_count()
    }

    /// Number of irredundant clauses, including remembered units.
    pub fn irredundant(&self) -> usize {
        self.ctx.clause_db.count_by_tier(crate::clause::Tier::Irred)
            + self.ctx.variables.fixed_count()
    }

    /// Number of variables fixed at the root level.
    pub fn fixed(&self) -> usize {
        self.ctx.variables.fixed_count()
    }

    /// Log a summary of the search statistics.
    pub fn statistics(&self) {
        self.ctx.stats.log_summary();
    }

    /// Search statistics counters.
    pub fn stats(&self) -> &crate::stats::Stats {
        &self.ctx.stats
    }
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("state", &self.state)
            .field("vars", &self.vars())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use ipasat_dimacs::write_dimacs;
    use ipasat_formula::cnf::strategy::cnf_formula as cnf_strategy;
    use ipasat_formula::{cnf_formula, lits, test::*};

    #[test]
    fn simple_sat() {
        let mut solver = Solver::new();

        solver.add_formula(&cnf_formula![
            1, 2;
            -1, 2;
        ]);

        assert_eq!(solver.solve(), Status::Satisfiable);
        assert!(solver.value(Lit::from_dimacs(2)));
    }

    #[test]
    fn empty_formula_is_sat() {
        let mut solver = Solver::new();
        assert_eq!(solver.solve(), Status::Satisfiable);
    }

    #[test]
    #[should_panic(expected = "API contract violation")]
    fn value_outside_satisfied_state() {
        let mut solver = Solver::new();
        solver.add_clause(&lits![1]);
        solver.value(Lit::from_dimacs(1));
    }

    #[test]
    #[should_panic(expected = "API contract violation")]
    fn failed_outside_unsatisfied_state() {
        let solver = Solver::new();
        solver.failed(Lit::from_dimacs(1));
    }

    #[test]
    #[should_panic(expected = "API contract violation")]
    fn solve_during_open_clause() {
        let mut solver = Solver::new();
        solver.add(1);
        solver.solve();
    }

    #[test]
    #[should_panic(expected = "API contract violation")]
    fn set_after_clauses() {
        let mut solver = Solver::new();
        solver.add_clause(&lits![1, 2]);
        solver.set("elim", 0.0).unwrap();
    }

    #[test]
    #[should_panic(expected = "API contract violation")]
    fn melt_without_freeze() {
        let mut solver = Solver::new();
        solver.melt(Var::from_dimacs(1));
    }

    #[test]
    fn terminator_interrupts() {
        let mut solver = Solver::new();

        solver.add_formula(&cnf_formula![
            1, 2, 3;
            -1, -2;
            -2, -3;
            -1, -3;
        ]);

        solver.set_terminator(|| true);
        assert_eq!(solver.solve(), Status::Unknown);

        solver.clear_terminator();
        assert_eq!(solver.solve(), Status::Satisfiable);
    }

    #[test]
    fn terminate_handle_interrupts() {
        let mut solver = Solver::new();

        solver.add_formula(&cnf_formula![
            1, 2;
            -1, 2;
        ]);

        let handle = solver.terminate_handle();
        handle.terminate();
        // The flag is cleared when a new solve starts, so this solve runs.
        assert_eq!(solver.solve(), Status::Satisfiable);
    }

    #[test]
    fn conflict_limit_returns_unknown() {
        let mut solver = Solver::new();

        let formula = cnf_formula![
            1, 2, 3;
            -1, -2;
            -2, -3;
            -1, -3;
            1, -2, 3;
            -3, 2;
        ];
        solver.add_formula(&formula);
        solver.limit("conflicts", Some(0));

        // With no conflicts allowed the search stops before reaching a result.
        assert_eq!(solver.solve(), Status::Unknown);

        solver.limit("conflicts", None);
        assert_eq!(solver.solve(), Status::Satisfiable);
    }

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Status::Unsatisfiable);
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Status::Satisfiable);

            let model = solver.model();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sat_via_dimacs(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            let mut dimacs = vec![];

            write_dimacs(&mut dimacs, &formula).unwrap();

            solver.add_dimacs(&mut &dimacs[..], Strict::Normal).unwrap();

            prop_assert_eq!(solver.solve(), Status::Satisfiable);

            let model = solver.model();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sgen_unsat_incremental_clauses(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            let mut last_status = Status::Satisfiable;

            for clause in formula.iter() {
                solver.add_clause(clause);

                let status = solver.solve();
                if status != last_status {
                    prop_assert_eq!(status, Status::Unsatisfiable);
                    prop_assert_eq!(last_status, Status::Satisfiable);
                    last_status = status;
                }
            }

            prop_assert_eq!(last_status, Status::Unsatisfiable);
        }

        #[test]
        fn pigeon_hole_unsat_assumption_core(
            (enable_row, columns, formula) in conditional_pigeon_hole(1..5usize, 1..5usize),
        ) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Status::Satisfiable);

            for &lit in enable_row.iter() {
                solver.assume_lit(lit);
            }

            prop_assert_eq!(solver.solve(), Status::Unsatisfiable);

            let mut candidates: Vec<Lit> = enable_row
                .iter()
                .cloned()
                .filter(|&lit| solver.failed(lit))
                .collect();

            prop_assert!(!candidates.is_empty());

            // Iteratively shrink the core by dropping the last candidate and adding it as a
            // clause when the rest is satisfiable.
            let mut core: Vec<Lit> = vec![];

            loop {
                for &lit in candidates[0..candidates.len() - 1].iter() {
                    solver.assume_lit(lit);
                }

                match solver.solve() {
                    Status::Unknown => unreachable!(),
                    Status::Unsatisfiable => {
                        let new_candidates: Vec<Lit> = candidates
                            .iter()
                            .cloned()
                            .filter(|&lit| solver.failed(lit))
                            .collect();
                        if new_candidates.is_empty() {
                            break;
                        }
                        candidates = new_candidates;
                        if candidates.len() == 1 {
                            solver.add_clause(&[candidates[0]]);
                            core.push(candidates[0]);
                            break;
                        }
                    }
                    Status::Satisfiable => {
                        let skipped = *candidates.last().unwrap();
                        core.push(skipped);
                        solver.add_clause(&[skipped]);
                        candidates.pop();
                        if candidates.is_empty() {
                            break;
                        }
                    }
                }
            }

            prop_assert!(core.len() <= columns + 1);
        }

        #[test]
        fn solve_is_idempotent(formula in sat_formula(4..10usize, 5..40usize, 0.1..0.3, 0.8..1.0)) {
            let mut solver = Solver::new();
            solver.add_formula(&formula);

            let first = solver.solve();
            let second = solver.solve();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn dimacs_roundtrip_equisatisfiable(formula in cnf_strategy(2..20usize, 1..100, 1..6)) {
            let mut solver = Solver::new();
            solver.add_formula(&formula);

            let mut written = vec![];
            solver.write_dimacs(&mut written).unwrap();

            let mut reparsed = Solver::new();
            reparsed.add_dimacs(&written[..], Strict::Lenient).unwrap();

            prop_assert_eq!(solver.solve(), reparsed.solve());
        }
    }
}
