//! An incremental CDCL based SAT solver.
//!
//! Given a propositional formula in conjunctive normal form, [`Solver`] decides satisfiability,
//! produces a model when satisfiable and a subset of the assumptions explaining
//! unsatisfiability otherwise. Solving is incremental: clauses can be added and assumptions
//! changed between repeated solve calls, learned information is kept across calls and
//! inprocessing runs interleaved with the search.
//!
//! ```rust
//! use ipasat::{Solver, Status};
//! use ipasat_formula::Lit;
//!
//! let mut solver = Solver::new();
//!
//! solver.add(1);
//! solver.add(2);
//! solver.add(0);
//! solver.add(-1);
//! solver.add(0);
//!
//! assert_eq!(solver.solve(), Status::Satisfiable);
//! assert!(solver.value(Lit::from_dimacs(2)));
//!
//! solver.assume(-2);
//! assert_eq!(solver.solve(), Status::Unsatisfiable);
//! assert!(solver.failed(Lit::from_dimacs(-2)));
//! ```

pub mod config;
pub mod proof;
pub mod solver;
pub mod state;

mod analyze_conflict;
mod callbacks;
mod cdcl;
mod clause;
mod context;
mod cube;
mod decision;
mod extend;
mod glue;
mod incremental;
mod inprocess;
mod load;
mod model;
mod prop;
mod schedule;
mod simplify;
mod stats;
mod tmp;
mod trace;
mod variables;

pub use callbacks::{LearnSource, Learner, Terminator};
pub use config::{ConfigError, OptDef, OptKind, SolverConfig, CONFIGURATIONS, OPTIONS};
pub use proof::{ProofError, ProofFormat};
pub use solver::{Solver, State, Status};
pub use state::TerminateHandle;
pub use stats::Stats;
pub use trace::API_TRACE_ENV;

pub use ipasat_dimacs as dimacs;
pub use ipasat_formula::{CnfFormula, Lit, Var};

/// The version of this solver library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
