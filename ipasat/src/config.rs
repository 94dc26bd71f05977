//! Solver configuration and option registry.
use thiserror::Error;

/// Value kind of an option.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OptKind {
    Bool,
    Int,
    Double,
}

/// A single configurable option.
///
/// Values are uniformly carried as `f64`; `kind` records how they are interpreted. `set` clamps
/// into `[min, max]`.
#[derive(Copy, Clone, Debug)]
pub struct OptDef {
    pub name: &'static str,
    pub kind: OptKind,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub category: &'static str,
}

const fn bool_opt(name: &'static str, default: bool, category: &'static str) -> OptDef {
    OptDef {
        name,
        kind: OptKind::Bool,
        min: 0.0,
        max: 1.0,
        default: default as u8 as f64,
        category,
    }
}

const fn int_opt(
    name: &'static str,
    min: u64,
    max: u64,
    default: u64,
    category: &'static str,
) -> OptDef {
    OptDef {
        name,
        kind: OptKind::Int,
        min: min as f64,
        max: max as f64,
        default: default as f64,
        category,
    }
}

const fn double_opt(
    name: &'static str,
    min: f64,
    max: f64,
    default: f64,
    category: &'static str,
) -> OptDef {
    OptDef {
        name,
        kind: OptKind::Double,
        min,
        max,
        default,
        category,
    }
}

/// All options understood by [`SolverConfig::set`].
pub static OPTIONS: &[OptDef] = &[
    double_opt("vsids-decay", 0.5, 0.999, 0.95, "decision"),
    double_opt("clause-decay", 0.5, 0.9999, 0.999, "reduce"),
    int_opt("reduce-locals-interval", 100, 1 << 32, 15000, "reduce"),
    int_opt("reduce-mids-interval", 100, 1 << 32, 10000, "reduce"),
    int_opt("restart-interval", 1, 1 << 20, 128, "restart"),
    int_opt("restart-min-interval", 1, 1 << 20, 50, "restart"),
    double_opt("restart-glue-margin", 1.0, 2.0, 1.15, "restart"),
    double_opt("glue-ema-fast", 1e-6, 1.0, 1.0 / 32.0, "restart"),
    double_opt("glue-ema-slow", 1e-6, 1.0, 1.0 / 4096.0, "restart"),
    bool_opt("inprocess", true, "inprocess"),
    int_opt("inprocess-interval", 100, 1 << 32, 10000, "inprocess"),
    bool_opt("elim", true, "inprocess"),
    int_opt("elim-steps", 100, 1 << 40, 200_000, "inprocess"),
    int_opt("elim-occurrence-limit", 1, 1 << 20, 100, "inprocess"),
    int_opt("elim-resolvent-limit", 2, 1 << 20, 20, "inprocess"),
    int_opt("elim-grow-limit", 0, 1 << 20, 0, "inprocess"),
    bool_opt("subsume", true, "inprocess"),
    int_opt("subsume-steps", 100, 1 << 40, 100_000, "inprocess"),
    bool_opt("substitute", true, "inprocess"),
    bool_opt("bce", true, "inprocess"),
    int_opt("bce-steps", 100, 1 << 40, 50_000, "inprocess"),
    bool_opt("probe", true, "inprocess"),
    int_opt("probe-steps", 100, 1 << 40, 50_000, "inprocess"),
    bool_opt("vivify", true, "inprocess"),
    int_opt("vivify-steps", 100, 1 << 40, 10_000, "inprocess"),
    double_opt("compact-fraction", 0.0, 1.0, 0.5, "inprocess"),
    bool_opt("phase-default", false, "decision"),
    int_opt("lookahead-candidates", 1, 1 << 20, 64, "lookahead"),
];

/// Look up an option definition by name.
pub fn option_def(name: &str) -> Option<&'static OptDef> {
    OPTIONS.iter().find(|def| def.name == name)
}

/// Names of the presets understood by [`SolverConfig::configure`].
pub static CONFIGURATIONS: &[&str] = &["default", "plain", "sat", "unsat"];

/// Errors of [`SolverConfig::set`] and [`SolverConfig::set_long_option`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown option '{}'", name)]
    UnknownOption { name: String },
    #[error("unknown configuration preset '{}'", name)]
    UnknownPreset { name: String },
    #[error("cannot parse option value '{}'", value)]
    InvalidValue { value: String },
    #[error("cannot parse long option '{}'", option)]
    InvalidLongOption { option: String },
}

/// Configurable parameters used during solving.
///
/// Field values mirror the entries of [`OPTIONS`]; [`SolverConfig::set`] is the only mutation
/// path besides the presets.
pub struct SolverConfig {
    /// Multiplicative decay for the VSIDS decision heuristic.
    pub vsids_decay: f32,

    /// Multiplicative decay for clause activities.
    pub clause_activity_decay: f32,

    /// Number of conflicts between local clause reductions.
    pub reduce_locals_interval: u64,

    /// Number of conflicts between mid clause reductions.
    pub reduce_mids_interval: u64,

    /// Scaling factor for luby sequence based restarts (number of conflicts).
    pub luby_restart_interval_scale: u64,

    /// Minimal number of conflicts between two glue triggered restarts.
    pub restart_min_interval: u64,

    /// A restart is forced when the fast glue average exceeds the slow average times this margin.
    pub restart_glue_margin: f64,

    /// Exponential moving average weight for the short term glue average.
    pub glue_ema_fast: f64,

    /// Exponential moving average weight for the long term glue average.
    pub glue_ema_slow: f64,

    /// Whether inprocessing runs between search bursts.
    pub inprocess: bool,

    /// Number of conflicts between inprocessing rounds.
    pub inprocess_interval: u64,

    /// Whether bounded variable elimination is enabled.
    pub elim: bool,

    /// Work budget for one elimination pass.
    pub elim_steps: u64,

    /// Variables occurring more often than this are not elimination candidates.
    pub elim_occurrence_limit: u64,

    /// Resolvents longer than this block elimination of their variable.
    pub elim_resolvent_limit: u64,

    /// Number of extra resolvents allowed beyond the number of deleted clauses.
    pub elim_grow_limit: u64,

    /// Whether backward subsumption and strengthening are enabled.
    pub subsume: bool,

    /// Work budget for one subsumption pass.
    pub subsume_steps: u64,

    /// Whether equivalent literal substitution is enabled.
    pub substitute: bool,

    /// Whether blocked clause elimination is enabled.
    pub bce: bool,

    /// Work budget for one blocked clause elimination pass.
    pub bce_steps: u64,

    /// Whether failed literal probing is enabled.
    pub probe: bool,

    /// Work budget for one probing pass.
    pub probe_steps: u64,

    /// Whether clause vivification is enabled.
    pub vivify: bool,

    /// Work budget for one vivification pass.
    pub vivify_steps: u64,

    /// Fraction of unmapped internal variables that triggers a compaction.
    pub compact_fraction: f64,

    /// Initial phase for variables that were never assigned.
    pub phase_default: bool,

    /// Number of candidate literals scored by a lookahead.
    pub lookahead_candidates: u64,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        let mut config = SolverConfig {
            vsids_decay: 0.0,
            clause_activity_decay: 0.0,
            reduce_locals_interval: 0,
            reduce_mids_interval: 0,
            luby_restart_interval_scale: 0,
            restart_min_interval: 0,
            restart_glue_margin: 0.0,
            glue_ema_fast: 0.0,
            glue_ema_slow: 0.0,
            inprocess: false,
            inprocess_interval: 0,
            elim: false,
            elim_steps: 0,
            elim_occurrence_limit: 0,
            elim_resolvent_limit: 0,
            elim_grow_limit: 0,
            subsume: false,
            subsume_steps: 0,
            substitute: false,
            bce: false,
            bce_steps: 0,
            probe: false,
            probe_steps: 0,
            vivify: false,
            vivify_steps: 0,
            compact_fraction: 0.0,
            phase_default: false,
            lookahead_candidates: 0,
        };
        for def in OPTIONS {
            config
                .set_clamped(def.name, def.default)
                .expect("default for unknown option");
        }
        config
    }
}

impl SolverConfig {
    /// Current value of the named option.
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "vsids-decay" => f64::from(self.vsids_decay),
            "clause-decay" => f64::from(self.clause_activity_decay),
            "reduce-locals-interval" => self.reduce_locals_interval as f64,
            "reduce-mids-interval" => self.reduce_mids_interval as f64,
            "restart-interval" => self.luby_restart_interval_scale as f64,
            "restart-min-interval" => self.restart_min_interval as f64,
            "restart-glue-margin" => self.restart_glue_margin,
            "glue-ema-fast" => self.glue_ema_fast,
            "glue-ema-slow" => self.glue_ema_slow,
            "inprocess" => self.inprocess as u8 as f64,
            "inprocess-interval" => self.inprocess_interval as f64,
            "elim" => self.elim as u8 as f64,
            "elim-steps" => self.elim_steps as f64,
            "elim-occurrence-limit" => self.elim_occurrence_limit as f64,
            "elim-resolvent-limit" => self.elim_resolvent_limit as f64,
            "elim-grow-limit" => self.elim_grow_limit as f64,
            "subsume" => self.subsume as u8 as f64,
            "subsume-steps" => self.subsume_steps as f64,
            "substitute" => self.substitute as u8 as f64,
            "bce" => self.bce as u8 as f64,
            "bce-steps" => self.bce_steps as f64,
            "probe" => self.probe as u8 as f64,
            "probe-steps" => self.probe_steps as f64,
            "vivify" => self.vivify as u8 as f64,
            "vivify-steps" => self.vivify_steps as f64,
            "compact-fraction" => self.compact_fraction,
            "phase-default" => self.phase_default as u8 as f64,
            "lookahead-candidates" => self.lookahead_candidates as f64,
            _ => return None,
        };
        Some(value)
    }

    /// Set the named option, clamping the value into the option's range.
    ///
    /// Returns the clamped value that was stored.
    pub fn set(&mut self, name: &str, value: f64) -> Result<f64, ConfigError> {
        self.set_clamped(name, value)
    }

    fn set_clamped(&mut self, name: &str, value: f64) -> Result<f64, ConfigError> {
        let def = option_def(name).ok_or_else(|| ConfigError::UnknownOption {
            name: name.to_owned(),
        })?;
        let value = value.max(def.min).min(def.max);

        match name {
            "vsids-decay" => self.vsids_decay = value as f32,
            "clause-decay" => self.clause_activity_decay = value as f32,
            "reduce-locals-interval" => self.reduce_locals_interval = value as u64,
            "reduce-mids-interval" => self.reduce_mids_interval = value as u64,
            "restart-interval" => self.luby_restart_interval_scale = value as u64,
            "restart-min-interval" => self.restart_min_interval = value as u64,
            "restart-glue-margin" => self.restart_glue_margin = value,
            "glue-ema-fast" => self.glue_ema_fast = value,
            "glue-ema-slow" => self.glue_ema_slow = value,
            "inprocess" => self.inprocess = value != 0.0,
            "inprocess-interval" => self.inprocess_interval = value as u64,
            "elim" => self.elim = value != 0.0,
            "elim-steps" => self.elim_steps = value as u64,
            "elim-occurrence-limit" => self.elim_occurrence_limit = value as u64,
            "elim-resolvent-limit" => self.elim_resolvent_limit = value as u64,
            "elim-grow-limit" => self.elim_grow_limit = value as u64,
            "subsume" => self.subsume = value != 0.0,
            "subsume-steps" => self.subsume_steps = value as u64,
            "substitute" => self.substitute = value != 0.0,
            "bce" => self.bce = value != 0.0,
            "bce-steps" => self.bce_steps = value as u64,
            "probe" => self.probe = value != 0.0,
            "probe-steps" => self.probe_steps = value as u64,
            "vivify" => self.vivify = value != 0.0,
            "vivify-steps" => self.vivify_steps = value as u64,
            "compact-fraction" => self.compact_fraction = value,
            "phase-default" => self.phase_default = value != 0.0,
            "lookahead-candidates" => self.lookahead_candidates = value as u64,
            _ => unreachable!("option in registry but not dispatched"),
        }

        Ok(value)
    }

    /// Parse and apply a long option of the form `--name`, `--no-name` or `--name=value`.
    pub fn set_long_option(&mut self, option: &str) -> Result<f64, ConfigError> {
        let body = option
            .strip_prefix("--")
            .ok_or_else(|| ConfigError::InvalidLongOption {
                option: option.to_owned(),
            })?;

        if let Some(eq) = body.find('=') {
            let (name, value) = body.split_at(eq);
            let value = &value[1..];
            let parsed: f64 = match value {
                "true" => 1.0,
                "false" => 0.0,
                _ => value.parse().map_err(|_| ConfigError::InvalidValue {
                    value: value.to_owned(),
                })?,
            };
            self.set(name, parsed)
        } else if let Some(name) = body.strip_prefix("no-") {
            self.set(name, 0.0)
        } else {
            self.set(body, 1.0)
        }
    }

    /// Apply a named configuration preset.
    pub fn configure(&mut self, preset: &str) -> Result<(), ConfigError> {
        match preset {
            "default" => *self = SolverConfig::default(),
            "plain" => {
                self.inprocess = false;
                self.elim = false;
                self.subsume = false;
                self.substitute = false;
                self.bce = false;
                self.probe = false;
                self.vivify = false;
            }
            "sat" => {
                self.phase_default = true;
                self.reduce_locals_interval = 30000;
                self.restart_glue_margin = 1.4;
            }
            "unsat" => {
                self.phase_default = false;
                self.luby_restart_interval_scale = 64;
                self.restart_glue_margin = 1.05;
            }
            _ => {
                return Err(ConfigError::UnknownPreset {
                    name: preset.to_owned(),
                })
            }
        }
        Ok(())
    }

    /// Scale all inprocessing step budgets by `10^clamp(level, 0, 9)`.
    pub fn optimize(&mut self, level: i32) {
        let exponent = level.max(0).min(9) as u32;
        let factor = 10u64.saturating_pow(exponent);
        self.elim_steps = self.elim_steps.saturating_mul(factor);
        self.subsume_steps = self.subsume_steps.saturating_mul(factor);
        self.bce_steps = self.bce_steps.saturating_mul(factor);
        self.probe_steps = self.probe_steps.saturating_mul(factor);
        self.vivify_steps = self.vivify_steps.saturating_mul(factor);
    }
}

/// Records which options changed in a configuration update.
///
/// Passed to [`config_changed`](crate::context::config_changed) so dependent structures can be
/// refreshed.
#[derive(Default)]
pub struct SolverConfigUpdate {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_registry() {
        let config = SolverConfig::default();
        for def in OPTIONS {
            let value = config.get(def.name).expect("registered option");
            assert!(
                (value - def.default).abs() < 1e-9,
                "{} default mismatch",
                def.name
            );
        }
    }

    #[test]
    fn set_clamps() {
        let mut config = SolverConfig::default();
        assert_eq!(config.set("restart-interval", 0.0).unwrap(), 1.0);
        assert_eq!(config.set("restart-interval", 1e18).unwrap(), (1u64 << 20) as f64);
        assert!(config.set("not-an-option", 1.0).is_err());
    }

    #[test]
    fn long_options() {
        let mut config = SolverConfig::default();
        config.set_long_option("--no-elim").unwrap();
        assert!(!config.elim);
        config.set_long_option("--elim").unwrap();
        assert!(config.elim);
        config.set_long_option("--restart-interval=256").unwrap();
        assert_eq!(config.luby_restart_interval_scale, 256);
        assert!(config.set_long_option("--restart-interval=x").is_err());
        assert!(config.set_long_option("elim").is_err());
    }

    #[test]
    fn presets() {
        let mut config = SolverConfig::default();
        config.configure("plain").unwrap();
        assert!(!config.inprocess);
        assert!(config.configure("nonsense").is_err());
    }

    #[test]
    fn optimize_scales_budgets() {
        let mut config = SolverConfig::default();
        let base = config.vivify_steps;
        config.optimize(2);
        assert_eq!(config.vivify_steps, base * 100);
        config.configure("default").unwrap();
        config.optimize(100);
        assert_eq!(config.vivify_steps, 10_000u64.saturating_mul(10u64.pow(9)));
    }
}
