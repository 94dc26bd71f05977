//! End to end tests of the public solver API.

use std::io::Read;

use ipasat::dimacs::Strict;
use ipasat::{ProofFormat, Solver, Status};
use ipasat_formula::{lits, CnfFormula, Lit, Var};

fn lit(number: isize) -> Lit {
    Lit::from_dimacs(number)
}

/// The running example: only t = false, s = true satisfies all three clauses.
fn forced_pair_solver() -> Solver {
    let mut solver = Solver::new();
    solver.add_clause(&lits![-1, 2]);
    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![-1, -2]);
    solver
}

#[test]
fn forced_pair_model() {
    let mut solver = forced_pair_solver();

    assert_eq!(solver.solve(), Status::Satisfiable);
    assert!(!solver.value(lit(1)));
    assert!(solver.value(lit(2)));
}

#[test]
fn forced_pair_failed_assumption() {
    let mut solver = forced_pair_solver();
    assert_eq!(solver.solve(), Status::Satisfiable);

    solver.assume(1);
    assert_eq!(solver.solve(), Status::Unsatisfiable);
    assert!(solver.failed(lit(1)));
    assert!(!solver.failed(lit(2)));
}

#[test]
fn forced_pair_failed_negative_assumption() {
    let mut solver = forced_pair_solver();

    solver.assume(1);
    assert_eq!(solver.solve(), Status::Unsatisfiable);

    solver.assume(-2);
    assert_eq!(solver.solve(), Status::Unsatisfiable);
    assert!(solver.failed(lit(-2)));
    assert!(!solver.failed(lit(1)));
}

#[test]
fn empty_clause_refutation_proof() {
    let tmp = tempfile::tempdir().unwrap();
    let proof_path = tmp.path().join("proof.drat");

    let mut solver = Solver::new();
    solver.write_proof_path(&proof_path, ProofFormat::Drat).unwrap();

    solver.add(0);
    assert_eq!(solver.solve(), Status::Unsatisfiable);
    solver.close_proof().unwrap();

    let mut proof = String::new();
    std::fs::File::open(&proof_path)
        .unwrap()
        .read_to_string(&mut proof)
        .unwrap();

    assert_eq!(proof, "0\n");
}

#[test]
fn single_tautology_is_sat() {
    let mut solver = Solver::new();
    solver.add_clause(&lits![1, -1]);

    assert_eq!(solver.solve(), Status::Satisfiable);

    let value = solver.value(lit(1));
    assert_eq!(solver.value(lit(-1)), !value);

    // The value stays consistent over repeated solves without mutation.
    assert_eq!(solver.solve(), Status::Satisfiable);
    assert_eq!(solver.value(lit(1)), value);
}

#[test]
fn implication_chain_core() {
    let mut solver = Solver::new();
    solver.reserve(1000);

    for i in 1..1000isize {
        solver.add(-i);
        solver.add(i + 1);
        solver.add(0);
    }

    solver.assume(1);
    solver.assume(-1000);

    assert_eq!(solver.solve(), Status::Unsatisfiable);
    assert!(solver.failed(lit(1)));
    assert!(solver.failed(lit(-1000)));
}

#[test]
fn assumption_independence() {
    let mut solver = forced_pair_solver();

    solver.assume(1);
    assert_eq!(solver.solve(), Status::Unsatisfiable);

    // Assumptions are cleared on return from solve, so the formula is satisfiable again.
    assert_eq!(solver.solve(), Status::Satisfiable);
}

#[test]
fn unsat_refutation_proof_ends_with_empty_clause() {
    let tmp = tempfile::tempdir().unwrap();
    let proof_path = tmp.path().join("proof.drat");

    let mut solver = Solver::new();
    solver.write_proof_path(&proof_path, ProofFormat::Drat).unwrap();

    // x1 forced both ways through x2
    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![1, -2]);
    solver.add_clause(&lits![-1, 2]);
    solver.add_clause(&lits![-1, -2]);

    assert_eq!(solver.solve(), Status::Unsatisfiable);
    solver.close_proof().unwrap();

    let mut proof = String::new();
    std::fs::File::open(&proof_path)
        .unwrap()
        .read_to_string(&mut proof)
        .unwrap();

    let lines: Vec<&str> = proof.lines().collect();
    assert!(!lines.is_empty());
    assert_eq!(*lines.last().unwrap(), "0");
    for line in lines {
        let line = line.strip_prefix("d ").unwrap_or(line);
        assert!(line.ends_with('0'));
    }
}

#[test]
fn write_and_reread_dimacs() {
    let mut solver = forced_pair_solver();

    let mut output = vec![];
    solver.write_dimacs(&mut output).unwrap();

    let mut reread = Solver::new();
    reread.add_dimacs(&output[..], Strict::Lenient).unwrap();

    assert_eq!(solver.solve(), reread.solve());
    assert_eq!(reread.solve(), Status::Satisfiable);
    assert!(!reread.value(lit(1)));
    assert!(reread.value(lit(2)));
}

#[test]
fn frozen_variables_survive_simplification() {
    let mut solver = Solver::new();

    solver.freeze(Var::from_dimacs(3));

    // Variable 3 occurs only positively and would be removed as a pure literal otherwise.
    solver.add_clause(&lits![3, 1]);
    solver.add_clause(&lits![3, -1, 2]);
    solver.add_clause(&lits![-1, 2]);

    assert_eq!(solver.simplify(1), Status::Unknown);
    assert!(solver.frozen(Var::from_dimacs(3)));

    solver.add_clause(&lits![-3, 1]);

    assert_eq!(solver.solve(), Status::Satisfiable);

    solver.melt(Var::from_dimacs(3));
}

#[test]
fn simplification_preserves_models() {
    let mut solver = Solver::new();

    let formula = CnfFormula::from(vec![
        lits![1, 2, 3].to_vec(),
        lits![-1, 2].to_vec(),
        lits![-2, 3].to_vec(),
        lits![4, -3].to_vec(),
        lits![5, 6].to_vec(),
        lits![-5, -6].to_vec(),
        lits![-4, 5, 6].to_vec(),
    ]);

    solver.add_formula(&formula);

    assert_eq!(solver.simplify(1), Status::Unknown);
    assert_eq!(solver.solve(), Status::Satisfiable);

    let model = solver.model();
    for clause in formula.iter() {
        assert!(
            clause.iter().any(|l| model.contains(l)),
            "clause {:?} not satisfied by {:?}",
            clause,
            model
        );
    }
}

#[test]
fn witness_traversal_covers_eliminated_clauses() {
    let mut solver = Solver::new();

    // Variable 1 occurs in few clauses and is a prime elimination candidate.
    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![-1, 3]);
    solver.add_clause(&lits![2, 3, 4]);
    solver.add_clause(&lits![-2, -3]);

    solver.simplify(1);

    let mut forward = vec![];
    assert!(solver.traverse_witnesses_forward(|witness, clause| {
        assert!(!witness.is_empty());
        assert!(witness.iter().all(|lit| clause.contains(lit)));
        forward.push((witness.to_vec(), clause.to_vec()));
        true
    }));

    let mut backward = vec![];
    assert!(solver.traverse_witnesses_backward(|witness, clause| {
        backward.push((witness.to_vec(), clause.to_vec()));
        true
    }));

    backward.reverse();
    assert_eq!(forward, backward);

    // Aborting the traversal propagates.
    if !forward.is_empty() {
        assert!(!solver.traverse_witnesses_forward(|_, _| false));
    }
}

#[test]
fn clause_traversal_elides_fixed_literals() {
    let mut solver = Solver::new();

    solver.add_clause(&lits![1]);
    solver.add_clause(&lits![-1, 2, 3]);
    solver.add_clause(&lits![1, 4, 5]);

    assert_eq!(solver.solve(), Status::Satisfiable);

    let mut clauses = vec![];
    solver.traverse_clauses(|clause| {
        clauses.push(clause.to_vec());
        true
    });

    // The unit is reported, the satisfied clause is dropped and the false literal is elided.
    assert!(clauses.contains(&lits![1].to_vec()));
    assert!(clauses.iter().all(|clause| !clause.contains(&lit(-1))));
    assert!(!clauses.iter().any(|clause| clause.contains(&lit(4))));
}

#[test]
fn incremental_reuse_after_elimination() {
    let mut solver = Solver::new();

    // This formula forces variable 3 and admits eliminating 1 and 2.
    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![-1, 3]);
    solver.add_clause(&lits![-2, 3]);

    solver.simplify(1);

    // Mentioning variable 1 again restores its recorded clauses, so the new clause constrains
    // the original formula.
    solver.add_clause(&lits![-1, -3]);

    assert_eq!(solver.solve(), Status::Satisfiable);
    assert!(solver.value(lit(3)));
    assert!(!solver.value(lit(1)));
    assert!(solver.value(lit(2)));

    solver.assume(1);
    assert_eq!(solver.solve(), Status::Unsatisfiable);
    assert!(solver.failed(lit(1)));
}

#[test]
fn learner_receives_clauses() {
    use std::sync::{Arc, Mutex};

    struct Collect(Arc<Mutex<Vec<Vec<Lit>>>>);

    impl ipasat::Learner for Collect {
        fn learning(&mut self, size: usize) -> bool {
            size <= 4
        }

        fn learn(&mut self, clause: &[Lit]) {
            self.0.lock().unwrap().push(clause.to_vec());
        }
    }

    let collected = Arc::new(Mutex::new(vec![]));

    let mut solver = Solver::new();
    solver.set_learner(Collect(collected.clone()));

    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![1, -2]);
    solver.add_clause(&lits![-1, 2]);
    solver.add_clause(&lits![-1, -2]);

    assert_eq!(solver.solve(), Status::Unsatisfiable);

    let collected = collected.lock().unwrap();
    assert!(!collected.is_empty());
}

#[test]
fn learn_source_injects_clauses() {
    struct Source {
        clauses: Vec<Vec<Lit>>,
    }

    impl ipasat::LearnSource for Source {
        fn has_next_clause(&mut self) -> bool {
            !self.clauses.is_empty()
        }

        fn next_clause(&mut self, clause: &mut Vec<Lit>) {
            clause.extend(self.clauses.pop().unwrap());
        }
    }

    let mut solver = Solver::new();

    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![-1, 2]);

    // The unit 2 is implied by the formula.
    solver.set_learn_source(Source {
        clauses: vec![lits![2].to_vec()],
    });

    assert_eq!(solver.solve(), Status::Satisfiable);
    assert!(solver.value(lit(2)));
}

#[test]
fn lookahead_on_open_formula() {
    let mut solver = Solver::new();

    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&lits![-1, 2]);
    solver.add_clause(&lits![3, 4]);

    let decision = solver.lookahead();
    assert!(decision.is_some());
}

#[test]
fn lookahead_on_decided_formula() {
    let mut solver = Solver::new();

    solver.add_clause(&lits![1]);
    solver.add_clause(&lits![-1, 2]);

    assert_eq!(solver.lookahead(), None);
}

#[test]
fn cubes_split_the_search_space() {
    let mut solver = Solver::new();

    let clauses = [
        lits![1, 2, 3].to_vec(),
        lits![-1, 2, -3].to_vec(),
        lits![1, -2].to_vec(),
    ];
    for clause in clauses.iter() {
        solver.add_clause(clause);
    }

    let (status, cubes) = solver.generate_cubes(4, 1);

    match status {
        Status::Unknown => {
            assert!(!cubes.is_empty());
            assert!(cubes.len() <= 4);

            // The cubes are pairwise incompatible.
            for (index, cube) in cubes.iter().enumerate() {
                for other in cubes[index + 1..].iter() {
                    assert!(
                        cube.iter().any(|&lit| other.contains(&!lit)),
                        "cubes {:?} and {:?} overlap",
                        cube,
                        other
                    );
                }
            }

            // Solving remains possible after cube generation.
            assert_eq!(solver.solve(), Status::Satisfiable);
        }
        Status::Satisfiable => {
            // A branch decided the formula, so a model must be available.
            assert!(cubes.is_empty());

            let model = solver.model();
            for clause in clauses.iter() {
                assert!(
                    clause.iter().any(|l| model.contains(l)),
                    "clause {:?} not satisfied by {:?}",
                    clause,
                    model
                );
            }
        }
        Status::Unsatisfiable => panic!("satisfiable formula refuted"),
    }
}

#[test]
fn inccnf_input_returns_cubes() {
    let mut solver = Solver::new();

    let input = b"p inccnf\n1 2 0\n-1 2 0\na 1 0\na -1 0\n";
    let cubes = solver.add_dimacs(&input[..], Strict::Normal).unwrap();

    assert_eq!(cubes.len(), 2);

    for cube in cubes {
        for lit in cube {
            solver.assume_lit(lit);
        }
        assert_eq!(solver.solve(), Status::Satisfiable);
        assert!(solver.value(lit(2)));
    }
}

#[test]
fn phase_override_directs_model() {
    let mut solver = Solver::new();

    // Variable 1 is unconstrained, so its decision follows the forced phase.
    solver.add_clause(&lits![2]);
    solver.add_clause(&lits![1, 2]);

    solver.phase(lit(1));
    assert_eq!(solver.solve(), Status::Satisfiable);
    assert!(solver.value(lit(1)));

    solver.phase(lit(-1));
    assert_eq!(solver.solve(), Status::Satisfiable);
    assert!(!solver.value(lit(1)));

    solver.unphase(Var::from_dimacs(1));
    assert_eq!(solver.solve(), Status::Satisfiable);
}

#[test]
fn fixed_values_are_reported() {
    let mut solver = Solver::new();

    solver.add_clause(&lits![1]);
    solver.add_clause(&lits![-1, 2]);

    assert_eq!(solver.solve(), Status::Satisfiable);

    assert_eq!(solver.fixed_value(lit(1)), Some(true));
    assert_eq!(solver.fixed_value(lit(-1)), Some(false));
    assert_eq!(solver.fixed_value(lit(2)), Some(true));
    assert_eq!(solver.fixed_value(lit(7)), None);
    assert!(solver.fixed() >= 2);
}
