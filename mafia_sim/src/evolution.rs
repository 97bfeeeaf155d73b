//! Hill-climbing optimiser for policy parameters.
//!
//! A [`FitnessProvider`] scores a [`SimConfig`]; [`optimise_parameter`]
//! nudges one parameter up and down by `step`, keeps whichever direction
//! scores better and halves the step when neither does. [`optimise_all`]
//! repeats that over every planned parameter in coordinate-descent rounds.

use crate::config::{PolicySpec, SimConfig};
use crate::error::{ConfigError, RunnerError};
use crate::runner::{BatchRunner, DEFAULT_ROUND_LIMIT};
use crate::scenarios::RosterPreset;
use mafia_core::{Alignment, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Scores a policy configuration. Higher is better.
pub trait FitnessProvider: Send + Sync {
    fn evaluate(&self, config: &SimConfig) -> Result<f64, RunnerError>;

    /// Returns the name of this provider.
    fn name(&self) -> &str;
}

/// Win rate of one alignment over a fixed batch of seeded games.
///
/// Every evaluation replays the same seeds, so two configurations are
/// compared on identical rosters.
#[derive(Debug, Clone)]
pub struct WinRateFitness {
    seed: u64,
    games: usize,
    target: Alignment,
    preset: RosterPreset,
    round_limit: u32,
}

impl WinRateFitness {
    pub fn new(seed: u64, games: usize, target: Alignment) -> Self {
        Self {
            seed,
            games,
            target,
            preset: RosterPreset::default(),
            round_limit: DEFAULT_ROUND_LIMIT,
        }
    }

    pub fn with_preset(mut self, preset: RosterPreset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_round_limit(mut self, limit: u32) -> Self {
        self.round_limit = limit;
        self
    }

    /// Fitness matching the batch settings of `plan`.
    pub fn from_plan(plan: &OptimisationConfig) -> Self {
        Self::new(plan.seed, plan.games, plan.target)
            .with_preset(plan.preset)
            .with_round_limit(plan.round_limit)
    }
}

impl FitnessProvider for WinRateFitness {
    fn evaluate(&self, config: &SimConfig) -> Result<f64, RunnerError> {
        let summary = BatchRunner::new(self.seed)
            .with_config(config.clone())
            .with_preset(self.preset)
            .with_round_limit(self.round_limit)
            .run(self.games, |_| Ok(()))?;
        Ok(summary.win_rate(self.target))
    }

    fn name(&self) -> &str {
        "win_rate"
    }
}

/// Outcome of optimising one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptimisationResult {
    pub value: f64,
    pub win_rate: f64,
}

/// Which parameter of which role is being tuned.
#[derive(Debug, Clone, Copy)]
pub struct ParameterRef<'a> {
    pub role: Role,
    pub strategy: &'a str,
    pub param: &'a str,
}

/// Hill-climbs a single parameter, starting from `start`.
///
/// Values stay inside [0, 1]. The returned rate is never lower than the
/// rate measured at the (clamped) start.
pub fn optimise_parameter<F: FitnessProvider + ?Sized>(
    fitness: &F,
    base: &SimConfig,
    target: ParameterRef<'_>,
    start: f64,
    mut step: f64,
    iterations: usize,
) -> Result<OptimisationResult, RunnerError> {
    let evaluate = |value: f64| -> Result<f64, RunnerError> {
        let mut config = base.clone();
        config.set_param(target.role, target.strategy, target.param, value);
        let rate = fitness.evaluate(&config)?;
        debug!("{}.{} = {:.4} -> {:.4}", target.role, target.param, value, rate);
        Ok(rate)
    };

    let mut current = start.clamp(0.0, 1.0);
    let mut best_rate = evaluate(current)?;

    for _ in 0..iterations {
        let mut improved = false;
        for direction in [-1.0, 1.0] {
            let trial = (current + direction * step).clamp(0.0, 1.0);
            if trial == current {
                continue;
            }
            let rate = evaluate(trial)?;
            if rate > best_rate {
                current = trial;
                best_rate = rate;
                improved = true;
            }
        }
        if !improved {
            step /= 2.0;
        }
    }

    Ok(OptimisationResult {
        value: current,
        win_rate: best_rate,
    })
}

/// Parameters to tune for one role.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterPlan {
    pub strategy: String,

    /// Starting value of every tuned parameter
    pub starts: BTreeMap<String, f64>,
}

/// Settings of an optimisation run, usually loaded from JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisationConfig {
    pub params: BTreeMap<Role, ParameterPlan>,

    /// Fixed policies of the roles not being tuned
    pub base: SimConfig,

    pub step: f64,
    pub games: usize,
    pub rounds: usize,
    pub target: Alignment,
    pub seed: u64,
    pub preset: RosterPreset,
    pub round_limit: u32,
}

impl Default for OptimisationConfig {
    fn default() -> Self {
        Self {
            params: BTreeMap::new(),
            base: SimConfig::default(),
            step: 0.1,
            games: 50,
            rounds: 3,
            target: Alignment::Civilian,
            seed: 42,
            preset: RosterPreset::default(),
            round_limit: DEFAULT_ROUND_LIMIT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    strategy: String,
    #[serde(default)]
    params: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    param: Option<String>,
    #[serde(default)]
    start: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawOptimisation {
    #[serde(default)]
    params: BTreeMap<String, RawPlan>,
    #[serde(default)]
    base: BTreeMap<String, PolicySpec>,
    step: Option<f64>,
    games: Option<usize>,
    rounds: Option<usize>,
    target: Option<String>,
    seed: Option<u64>,
    preset: Option<String>,
    round_limit: Option<u32>,
}

impl OptimisationConfig {
    /// Loads and validates an optimisation plan.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_json(&text)
    }

    /// Parses an optimisation plan.
    ///
    /// Each entry under `params` lists its parameters either as a `params`
    /// map of start values or as a single `param`/`start` pair.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawOptimisation = serde_json::from_str(text)?;
        let defaults = Self::default();

        let mut params = BTreeMap::new();
        for (name, plan) in raw.params {
            let role = Role::from_str(&name).map_err(|_| ConfigError::UnknownRole(name.clone()))?;
            let starts = match (plan.params, plan.param, plan.start) {
                (Some(map), _, _) => map,
                (None, Some(param), Some(start)) => BTreeMap::from([(param, start)]),
                _ => {
                    return Err(ConfigError::InvalidPlan(format!(
                        "{} needs 'params' or 'param' and 'start'",
                        name
                    )))
                }
            };
            params.insert(
                role,
                ParameterPlan {
                    strategy: plan.strategy,
                    starts,
                },
            );
        }

        let target = match raw.target {
            Some(name) => parse_target(&name)?,
            None => defaults.target,
        };
        let preset = match raw.preset {
            Some(name) => name.parse().map_err(|_| ConfigError::UnknownPreset(name))?,
            None => defaults.preset,
        };

        let config = Self {
            params,
            base: SimConfig::from_raw(raw.base)?,
            step: raw.step.unwrap_or(defaults.step),
            games: raw.games.unwrap_or(defaults.games),
            rounds: raw.rounds.unwrap_or(defaults.rounds),
            target,
            seed: raw.seed.unwrap_or(defaults.seed),
            preset,
            round_limit: raw.round_limit.unwrap_or(defaults.round_limit),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the run settings and every planned parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step.is_nan() || self.step <= 0.0 {
            return Err(ConfigError::InvalidPlan(format!("step must be positive, got {}", self.step)));
        }
        if self.games == 0 {
            return Err(ConfigError::InvalidPlan("games must be at least 1".into()));
        }
        self.initial_config().validate()
    }

    /// Base configuration with every tuned parameter at its start value.
    pub fn initial_config(&self) -> SimConfig {
        let mut config = self.base.clone();
        for (role, plan) in &self.params {
            for (param, start) in &plan.starts {
                config.set_param(*role, &plan.strategy, param, *start);
            }
        }
        config
    }
}

/// Accepts an alignment name, or a role name standing for its alignment.
fn parse_target(name: &str) -> Result<Alignment, ConfigError> {
    Alignment::from_str(name)
        .or_else(|_| Role::from_str(name).map(Role::alignment))
        .map_err(|_| ConfigError::UnknownRole(name.to_string()))
}

/// Results of [`optimise_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisationReport {
    pub results: BTreeMap<Role, BTreeMap<String, OptimisationResult>>,

    /// Configuration with every tuned parameter at its final value
    pub config: SimConfig,
}

/// Coordinate descent over every parameter in `plan`.
///
/// Each round optimises every parameter for one iteration, feeding improved
/// values into later evaluations, then halves the step.
pub fn optimise_all<F: FitnessProvider + ?Sized>(
    fitness: &F,
    plan: &OptimisationConfig,
) -> Result<OptimisationReport, RunnerError> {
    let mut config = plan.initial_config();
    config.validate()?;

    let mut results: BTreeMap<Role, BTreeMap<String, OptimisationResult>> = BTreeMap::new();
    let mut step = plan.step;

    for round in 0..plan.rounds {
        for (role, role_plan) in &plan.params {
            for (param, start) in &role_plan.starts {
                let current = results
                    .get(role)
                    .and_then(|r| r.get(param))
                    .map_or(*start, |r| r.value);
                let target = ParameterRef {
                    role: *role,
                    strategy: &role_plan.strategy,
                    param,
                };

                let result = optimise_parameter(fitness, &config, target, current, step, 1)?;
                config.set_param(*role, &role_plan.strategy, param, result.value);
                results.entry(*role).or_default().insert(param.clone(), result);
            }
        }
        info!("Optimisation round {} done (step {:.4})", round + 1, step);
        step /= 2.0;
    }

    Ok(OptimisationReport { results, config })
}
