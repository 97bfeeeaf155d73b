//! File-based policy configuration.
//!
//! A configuration is a JSON object keyed by role name:
//!
//! ```json
//! {
//!     "CIVILIAN": { "strategy": "single_sheriff_civilian",
//!                   "params": { "random_nomination_chance": 0.2 } },
//!     "SHERIFF":  { "strategy": "single_sheriff_sheriff" }
//! }
//! ```
//!
//! Roles that are not listed use the registry default for that role.

use crate::error::ConfigError;
use crate::registry::{self, PolicyParams};
use mafia_core::{Policy, Role};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// A policy name plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    /// Registered policy name
    pub strategy: String,

    #[serde(default)]
    pub params: PolicyParams,
}

impl PolicySpec {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            params: PolicyParams::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Builds the policy, checking its name and parameters.
    pub fn build(&self, rng: ChaCha8Rng) -> Result<Box<dyn Policy>, ConfigError> {
        registry::build(&self.strategy, &self.params, rng)
    }

    /// Default policy for `role`.
    pub fn default_for(role: Role) -> Self {
        Self::new(registry::default_policy(role))
    }
}

/// Policy choice per role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimConfig {
    roles: BTreeMap<Role, PolicySpec>,
}

impl SimConfig {
    /// A configuration using the default policy for every role.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_json(&text)
    }

    /// Parses and validates a configuration document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, PolicySpec> = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    /// Builds a configuration from role names, as found in config files.
    pub fn from_raw(raw: BTreeMap<String, PolicySpec>) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        for (name, spec) in raw {
            let role = Role::from_str(&name).map_err(|_| ConfigError::UnknownRole(name))?;
            config.roles.insert(role, spec);
        }
        config.validate()?;
        Ok(config)
    }

    /// Sets the policy for `role`.
    pub fn with_role(mut self, role: Role, spec: PolicySpec) -> Self {
        self.roles.insert(role, spec);
        self
    }

    /// Sets one parameter of `role`'s policy, switching it to `strategy`.
    ///
    /// Other parameters are kept when the strategy does not change.
    pub fn set_param(&mut self, role: Role, strategy: &str, param: &str, value: f64) {
        let spec = self
            .roles
            .entry(role)
            .or_insert_with(|| PolicySpec::new(strategy));
        if spec.strategy != strategy {
            *spec = PolicySpec::new(strategy);
        }
        spec.params.insert(param.to_string(), value);
    }

    /// The explicitly configured policy for `role`, if any.
    pub fn get(&self, role: Role) -> Option<&PolicySpec> {
        self.roles.get(&role)
    }

    /// The policy `role` will use.
    pub fn spec_for(&self, role: Role) -> PolicySpec {
        self.roles
            .get(&role)
            .cloned()
            .unwrap_or_else(|| PolicySpec::default_for(role))
    }

    /// Builds the policy for `role`.
    pub fn build_policy(&self, role: Role, rng: ChaCha8Rng) -> Result<Box<dyn Policy>, ConfigError> {
        match self.roles.get(&role) {
            Some(spec) => spec.build(rng),
            None => PolicySpec::default_for(role).build(rng),
        }
    }

    /// Checks every configured policy name and parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        use rand::SeedableRng;
        for spec in self.roles.values() {
            spec.build(ChaCha8Rng::seed_from_u64(0))?;
        }
        Ok(())
    }

    /// Configured roles and their policies, in role order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &PolicySpec)> + '_ {
        self.roles.iter().map(|(&role, spec)| (role, spec))
    }

    /// Role-name keyed form, as written to config files.
    pub fn to_raw(&self) -> BTreeMap<String, PolicySpec> {
        self.iter()
            .map(|(role, spec)| (role.name().to_string(), spec.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_parse_config_document() {
        let config = SimConfig::from_json(
            r#"{
                "CIVILIAN": {
                    "strategy": "single_sheriff_civilian",
                    "params": { "random_nomination_chance": 0.2 }
                },
                "SHERIFF": { "strategy": "single_sheriff_sheriff" }
            }"#,
        )
        .unwrap();

        let civilian = config.get(Role::Civilian).unwrap();
        assert_eq!(civilian.strategy, "single_sheriff_civilian");
        assert_eq!(civilian.params["random_nomination_chance"], 0.2);
        assert!(config.get(Role::Sheriff).unwrap().params.is_empty());
    }

    #[test]
    fn test_missing_roles_use_defaults() {
        let config = SimConfig::from_json(r#"{ "DON": { "strategy": "single_sheriff_don" } }"#)
            .unwrap();

        assert_eq!(config.spec_for(Role::Mafia).strategy, "mafia");
        assert_eq!(config.spec_for(Role::Don).strategy, "single_sheriff_don");

        let policy = config
            .build_policy(Role::Civilian, ChaCha8Rng::seed_from_u64(1))
            .unwrap();
        assert_eq!(policy.name(), "civilian");
    }

    #[test]
    fn test_unknown_role_rejected() {
        let err = SimConfig::from_json(r#"{ "WEREWOLF": { "strategy": "random" } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRole(name) if name == "WEREWOLF"));
    }

    #[test]
    fn test_unknown_policy_rejected_at_load() {
        let err = SimConfig::from_json(r#"{ "MAFIA": { "strategy": "MindReader" } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPolicy(_)));
    }

    #[test]
    fn test_malformed_document_rejected() {
        let err = SimConfig::from_json(r#"{ "MAFIA": { "params": {} } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_set_param_keeps_or_replaces_strategy() {
        let mut config = SimConfig::new().with_role(
            Role::Civilian,
            PolicySpec::new("civilian").with_param("nomination_prob", 0.1),
        );

        config.set_param(Role::Civilian, "civilian", "nomination_prob", 0.4);
        assert_eq!(config.get(Role::Civilian).unwrap().params["nomination_prob"], 0.4);

        config.set_param(
            Role::Civilian,
            "single_sheriff_civilian",
            "random_nomination_chance",
            0.6,
        );
        let spec = config.get(Role::Civilian).unwrap();
        assert_eq!(spec.strategy, "single_sheriff_civilian");
        assert_eq!(spec.params.len(), 1);
    }

    #[test]
    fn test_raw_roundtrip() {
        let config = SimConfig::new().with_role(Role::Don, PolicySpec::new("single_sheriff_don"));
        let back = SimConfig::from_raw(config.to_raw()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SimConfig::load("/nonexistent/mafia.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/mafia.json"));
    }
}
