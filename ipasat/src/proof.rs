//! DRAT proof generation.
//!
//! The tracer records every learned clause and derived unit as an addition and every clause
//! removed from the database as a deletion. Additions are emitted before the clause becomes
//! usable, deletions after the clause became unreachable. Literals are mapped to the external
//! encoding so the proof matches the formula the user supplied.
//!
//! A write failure does not abort the search. The trace is marked broken and the failure is
//! reported when the proof is closed.

use std::io::{self, sink, BufWriter, Write};

use partial_ref::{partial, PartialRef};

use thiserror::Error;

use ipasat_formula::Lit;

use crate::context::{parts::*, Context};
use crate::variables::Variables;

/// Proof formats that can be generated during solving.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ProofFormat {
    Drat,
    BinaryDrat,
}

/// Errors reported when closing a proof.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("writing the proof failed: {}", source)]
    Io {
        #[from]
        source: io::Error,
    },
}

/// DRAT proof generation.
pub struct Proof {
    format: Option<ProofFormat>,
    target: BufWriter<Box<dyn Write>>,
    error: Option<io::Error>,
    map_buf: Vec<Lit>,
}

impl Default for Proof {
    fn default() -> Proof {
        Proof {
            format: None,
            target: BufWriter::new(Box::new(sink())),
            error: None,
            map_buf: vec![],
        }
    }
}

impl Proof {
    /// Start writing proof steps to the given target with the given format.
    pub fn write_proof(&mut self, target: impl Write + 'static, format: ProofFormat) {
        self.format = Some(format);
        self.error = None;
        self.target = BufWriter::new(Box::new(target))
    }

    /// Stop writing proof steps.
    ///
    /// Returns an error when any write, including the final flush, failed.
    pub fn close_proof(&mut self) -> Result<(), ProofError> {
        if self.format.is_some() && self.error.is_none() {
            let result = self.target.flush();
            self.handle_io_errors(result);
        }
        self.format = None;
        self.target = BufWriter::new(Box::new(sink()));
        match self.error.take() {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    /// Flush buffered proof steps to the sink.
    pub fn flush_proof(&mut self) {
        if self.is_active() {
            let result = self.target.flush();
            self.handle_io_errors(result);
        }
    }

    /// Whether proof generation is active.
    pub fn is_active(&self) -> bool {
        self.format.is_some() && self.error.is_none()
    }

    /// Whether a write failure broke the trace.
    pub fn is_broken(&self) -> bool {
        self.error.is_some()
    }

    /// Emit an addition step, mapping the literals to the external encoding.
    pub fn add_clause(&mut self, variables: &Variables, internal_lits: &[Lit]) {
        if !self.is_active() {
            return;
        }
        let mut lits = std::mem::replace(&mut self.map_buf, vec![]);
        lits.clear();
        lits.extend(
            internal_lits
                .iter()
                .map(|&lit| variables.external_from_internal_lit(lit)),
        );
        self.step_prefix(b"a", b"");
        self.step_lits(&lits);
        self.map_buf = lits;
    }

    /// Emit a deletion step, mapping the literals to the external encoding.
    pub fn delete_clause(&mut self, variables: &Variables, internal_lits: &[Lit]) {
        if !self.is_active() {
            return;
        }
        let mut lits = std::mem::replace(&mut self.map_buf, vec![]);
        lits.clear();
        lits.extend(
            internal_lits
                .iter()
                .map(|&lit| variables.external_from_internal_lit(lit)),
        );
        self.step_prefix(b"d", b"d ");
        self.step_lits(&lits);
        self.map_buf = lits;
    }

    /// Writes the step prefix for the active format.
    fn step_prefix(&mut self, binary: &[u8], ascii: &[u8]) {
        if self.format == Some(ProofFormat::BinaryDrat) {
            let result = self.target.write_all(binary);
            self.handle_io_errors(result);
        } else if !ascii.is_empty() {
            let result = self.target.write_all(ascii);
            self.handle_io_errors(result);
        }
    }

    /// Writes the literals of a proof step, in external encoding.
    fn step_lits(&mut self, lits: &[Lit]) {
        if self.format == Some(ProofFormat::BinaryDrat) {
            for &lit in lits {
                let drat_code = lit.code() as u64 + 2;
                let result = leb128::write::unsigned(&mut self.target, drat_code);
                self.handle_io_errors(result);
            }
            let result = self.target.write_all(&[0]);
            self.handle_io_errors(result);
        } else {
            for &lit in lits {
                let result = itoa::write(&mut self.target, lit.to_dimacs());
                self.handle_io_errors(result);
                let result = self.target.write_all(b" ");
                self.handle_io_errors(result);
            }
            let result = self.target.write_all(b"0\n");
            self.handle_io_errors(result);
        }
    }

    /// Record an IO failure, marking the trace as broken.
    ///
    /// Search continues, the failure surfaces when the proof is closed.
    fn handle_io_errors<V, E: Into<io::Error>>(&mut self, result: Result<V, E>) {
        if let Err(error) = result {
            if self.error.is_none() {
                self.error = Some(error.into());
            }
        }
    }
}

/// Emit an addition step for a clause in internal encoding.
pub fn add_internal_clause(
    mut ctx: partial!(Context, mut ProofP, VariablesP),
    lits: &[Lit],
) {
    let (variables, mut ctx) = ctx.split_part(VariablesP);
    ctx.part_mut(ProofP).add_clause(variables, lits);
}

/// Emit a deletion step for a clause in internal encoding.
pub fn delete_internal_clause(
    mut ctx: partial!(Context, mut ProofP, VariablesP),
    lits: &[Lit],
) {
    let (variables, mut ctx) = ctx.split_part(VariablesP);
    ctx.part_mut(ProofP).delete_clause(variables, lits);
}

/// Emit the empty clause, terminating a refutation.
pub fn add_empty_clause(mut ctx: partial!(Context, mut ProofP, VariablesP)) {
    add_internal_clause(ctx.borrow(), &[]);
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    /// A shared writer used to inspect emitted proofs in tests.
    #[derive(Clone, Default)]
    pub struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl SharedSink {
        pub fn contents(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn ascii_steps() {
        let sink = SharedSink::default();
        let mut proof = Proof::default();
        let variables = Variables::default();

        proof.write_proof(sink.clone(), ProofFormat::Drat);
        proof.add_clause(&variables, &[Lit::from_dimacs(1), Lit::from_dimacs(-2)]);
        proof.delete_clause(&variables, &[Lit::from_dimacs(3)]);
        proof.add_clause(&variables, &[]);
        proof.close_proof().unwrap();

        assert_eq!(sink.contents(), b"1 -2 0\nd 3 0\n0\n");
    }

    #[test]
    fn binary_steps() {
        let sink = SharedSink::default();
        let mut proof = Proof::default();
        let variables = Variables::default();

        proof.write_proof(sink.clone(), ProofFormat::BinaryDrat);
        proof.add_clause(&variables, &[Lit::from_dimacs(1), Lit::from_dimacs(-2)]);
        proof.delete_clause(&variables, &[Lit::from_dimacs(3)]);
        proof.close_proof().unwrap();

        assert_eq!(sink.contents(), b"a\x02\x05\x00d\x06\x00");
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "no space"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "no space"))
        }
    }

    #[test]
    fn broken_trace_reported_on_close() {
        let mut proof = Proof::default();
        let variables = Variables::default();

        proof.write_proof(FailingSink, ProofFormat::Drat);
        for _ in 0..10000 {
            proof.add_clause(&variables, &[Lit::from_dimacs(1)]);
        }

        assert!(proof.is_broken());
        assert!(!proof.is_active());
        assert!(proof.close_proof().is_err());
    }
}
