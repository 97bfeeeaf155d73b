//! Static table of named policies.
//!
//! Configuration files name policies by string; this table is the only place
//! those names are resolved. Adding a policy means adding one row.

use crate::error::ConfigError;
use crate::policies::{
    CivilianPolicy, DonPolicy, MafiaPolicy, RandomPolicy, SheriffPolicy,
    SingleSheriffCivilianPolicy, SingleSheriffDonPolicy, SingleSheriffMafiaPolicy,
    SingleSheriffSheriffPolicy, DEFAULT_NOMINATION_PROB, DEFAULT_REVEAL_PROBABILITY,
};
use mafia_core::{Policy, Role};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Numeric policy parameters by name.
pub type PolicyParams = BTreeMap<String, f64>;

/// Builds a policy from its parameters and RNG stream.
pub type PolicyConstructor = fn(&PolicyParams, ChaCha8Rng) -> Result<Box<dyn Policy>, ConfigError>;

/// Every registered policy, by name.
pub static POLICIES: &[(&str, PolicyConstructor)] = &[
    ("random", build_random),
    ("civilian", build_civilian),
    ("sheriff", build_sheriff),
    ("mafia", build_mafia),
    ("don", build_don),
    ("single_sheriff_civilian", build_single_sheriff_civilian),
    ("single_sheriff_sheriff", build_single_sheriff_sheriff),
    ("single_sheriff_mafia", build_single_sheriff_mafia),
    ("single_sheriff_don", build_single_sheriff_don),
];

/// Looks up a constructor by name.
pub fn lookup(name: &str) -> Result<PolicyConstructor, ConfigError> {
    POLICIES
        .iter()
        .find(|(entry, _)| *entry == name)
        .map(|(_, ctor)| *ctor)
        .ok_or_else(|| ConfigError::UnknownPolicy(name.to_string()))
}

/// Builds the policy registered as `name`.
pub fn build(
    name: &str,
    params: &PolicyParams,
    rng: ChaCha8Rng,
) -> Result<Box<dyn Policy>, ConfigError> {
    lookup(name)?(params, rng)
}

/// Registered names, in table order.
pub fn names() -> Vec<&'static str> {
    POLICIES.iter().map(|(name, _)| *name).collect()
}

/// Policy used for `role` when a configuration does not name one.
pub fn default_policy(role: Role) -> &'static str {
    match role {
        Role::Civilian => "civilian",
        Role::Sheriff => "sheriff",
        Role::Mafia => "mafia",
        Role::Don => "don",
    }
}

/// Reads the parameters a policy accepts, falling back to defaults.
///
/// Unknown names and values outside [0, 1] are rejected.
fn read_params<const N: usize>(
    policy: &str,
    params: &PolicyParams,
    accepted: [(&str, f64); N],
) -> Result<[f64; N], ConfigError> {
    if let Some(unknown) = params
        .keys()
        .find(|key| !accepted.iter().any(|(name, _)| *name == key.as_str()))
    {
        return Err(ConfigError::unknown_parameter(policy, unknown));
    }

    let mut values = [0.0; N];
    for (slot, (name, default)) in values.iter_mut().zip(accepted) {
        let value = params.get(name).copied().unwrap_or(default);
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::OutOfRange {
                param: name.to_string(),
                value,
            });
        }
        *slot = value;
    }
    Ok(values)
}

fn build_random(params: &PolicyParams, rng: ChaCha8Rng) -> Result<Box<dyn Policy>, ConfigError> {
    read_params("random", params, [])?;
    Ok(Box::new(RandomPolicy::new(rng)))
}

fn build_civilian(params: &PolicyParams, rng: ChaCha8Rng) -> Result<Box<dyn Policy>, ConfigError> {
    let [prob] = read_params("civilian", params, [("nomination_prob", DEFAULT_NOMINATION_PROB)])?;
    Ok(Box::new(CivilianPolicy::new(rng).with_nomination_prob(prob)))
}

fn build_sheriff(params: &PolicyParams, rng: ChaCha8Rng) -> Result<Box<dyn Policy>, ConfigError> {
    let [prob] = read_params("sheriff", params, [("nomination_prob", DEFAULT_NOMINATION_PROB)])?;
    Ok(Box::new(SheriffPolicy::new(rng).with_nomination_prob(prob)))
}

fn build_mafia(params: &PolicyParams, rng: ChaCha8Rng) -> Result<Box<dyn Policy>, ConfigError> {
    let [prob] = read_params("mafia", params, [("nomination_prob", DEFAULT_NOMINATION_PROB)])?;
    Ok(Box::new(MafiaPolicy::new(rng).with_nomination_prob(prob)))
}

fn build_don(params: &PolicyParams, rng: ChaCha8Rng) -> Result<Box<dyn Policy>, ConfigError> {
    let [prob] = read_params("don", params, [("nomination_prob", DEFAULT_NOMINATION_PROB)])?;
    Ok(Box::new(DonPolicy::new(rng).with_nomination_prob(prob)))
}

fn build_single_sheriff_civilian(
    params: &PolicyParams,
    rng: ChaCha8Rng,
) -> Result<Box<dyn Policy>, ConfigError> {
    let [chance] = read_params(
        "single_sheriff_civilian",
        params,
        [("random_nomination_chance", DEFAULT_NOMINATION_PROB)],
    )?;
    Ok(Box::new(
        SingleSheriffCivilianPolicy::new(rng).with_random_nomination_chance(chance),
    ))
}

fn build_single_sheriff_sheriff(
    params: &PolicyParams,
    rng: ChaCha8Rng,
) -> Result<Box<dyn Policy>, ConfigError> {
    let [reveal, prob] = read_params(
        "single_sheriff_sheriff",
        params,
        [
            ("reveal_probability", DEFAULT_REVEAL_PROBABILITY),
            ("nomination_prob", DEFAULT_NOMINATION_PROB),
        ],
    )?;
    Ok(Box::new(
        SingleSheriffSheriffPolicy::new(rng)
            .with_reveal_probability(reveal)
            .with_nomination_prob(prob),
    ))
}

fn build_single_sheriff_mafia(
    params: &PolicyParams,
    rng: ChaCha8Rng,
) -> Result<Box<dyn Policy>, ConfigError> {
    let [prob] = read_params(
        "single_sheriff_mafia",
        params,
        [("nomination_prob", DEFAULT_NOMINATION_PROB)],
    )?;
    Ok(Box::new(SingleSheriffMafiaPolicy::new(rng).with_nomination_prob(prob)))
}

fn build_single_sheriff_don(
    params: &PolicyParams,
    rng: ChaCha8Rng,
) -> Result<Box<dyn Policy>, ConfigError> {
    let [prob] = read_params(
        "single_sheriff_don",
        params,
        [("nomination_prob", DEFAULT_NOMINATION_PROB)],
    )?;
    Ok(Box::new(SingleSheriffDonPolicy::new(rng).with_nomination_prob(prob)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(0)
    }

    fn params(entries: &[(&str, f64)]) -> PolicyParams {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_every_entry_builds_with_defaults() {
        for name in names() {
            let policy = build(name, &PolicyParams::new(), rng()).unwrap();
            assert_eq!(policy.name(), name);
        }
    }

    #[test]
    fn test_defaults_are_registered() {
        for role in Role::ALL {
            assert!(lookup(default_policy(role)).is_ok());
        }
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let err = build("telepath", &PolicyParams::new(), rng()).err().unwrap();
        assert!(matches!(err, ConfigError::UnknownPolicy(name) if name == "telepath"));
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let err = build("civilian", &params(&[("aggression", 0.5)]), rng())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ConfigError::UnknownParameter { ref policy, ref param }
                if policy == "civilian" && param == "aggression"
        ));

        // The random policy takes no parameters at all
        assert!(build("random", &params(&[("nomination_prob", 0.1)]), rng()).is_err());
    }

    #[test]
    fn test_out_of_range_parameter_rejected() {
        let err = build("single_sheriff_sheriff", &params(&[("reveal_probability", 1.5)]), rng())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::OutOfRange { value, .. } if value == 1.5));
    }

    #[test]
    fn test_names_are_unique() {
        let mut all = names();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), POLICIES.len());
    }
}
