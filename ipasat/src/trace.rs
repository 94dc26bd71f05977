//! Replayable API call tracing.
//!
//! When the environment variable `IPASAT_API_TRACE` names a file, the first solver instance
//! constructed in the process records its API calls there, one call per line, before the call's
//! contract check runs. The resulting trace can be replayed to reproduce a solver run.

use std::env;
use std::fmt::Arguments;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;

/// The environment variable naming the trace file.
pub const API_TRACE_ENV: &str = "IPASAT_API_TRACE";

static TRACE_CLAIMED: AtomicBool = AtomicBool::new(false);

/// Records API calls of one solver instance.
#[derive(Default)]
pub struct ApiTrace {
    target: Option<BufWriter<File>>,
}

impl ApiTrace {
    /// Claim the trace file named by the environment for this solver.
    ///
    /// Only the first constructed solver records a trace, later instances are not traced.
    pub fn from_env() -> ApiTrace {
        let path = match env::var(API_TRACE_ENV) {
            Ok(path) if !path.is_empty() => path,
            _ => return ApiTrace::default(),
        };

        if TRACE_CLAIMED.swap(true, Ordering::SeqCst) {
            return ApiTrace::default();
        }

        match File::create(&path) {
            Ok(file) => ApiTrace {
                target: Some(BufWriter::new(file)),
            },
            Err(error) => {
                warn!("could not open API trace file {}: {}", path, error);
                ApiTrace::default()
            }
        }
    }

    /// Record one API call.
    pub fn record(&mut self, call: Arguments) {
        if let Some(target) = &mut self.target {
            if writeln!(target, "{}", call).and_then(|_| target.flush()).is_err() {
                warn!("writing the API trace failed, tracing stopped");
                self.target = None;
            }
        }
    }
}
