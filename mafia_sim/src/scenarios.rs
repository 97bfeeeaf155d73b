//! Roster presets.

use mafia_core::Role;
use rand::seq::SliceRandom;
use rand::Rng;

/// Roster presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterPreset {
    /// Ten seats: sheriff, six civilians, don, two mafia
    Classic,

    /// Six seats: sheriff, three civilians, don, one mafia
    Compact,

    /// Thirteen seats: sheriff, eight civilians, don, three mafia
    Extended,

    /// Ten seats without a don: the mafia decide the kill by majority
    Leaderless,

    /// Ten seats without a sheriff
    Blind,
}

impl RosterPreset {
    /// Returns every preset.
    pub fn all() -> Vec<RosterPreset> {
        vec![
            RosterPreset::Classic,
            RosterPreset::Compact,
            RosterPreset::Extended,
            RosterPreset::Leaderless,
            RosterPreset::Blind,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            RosterPreset::Classic => "classic",
            RosterPreset::Compact => "compact",
            RosterPreset::Extended => "extended",
            RosterPreset::Leaderless => "leaderless",
            RosterPreset::Blind => "blind",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RosterPreset::Classic => "10 players: 1 sheriff, 6 civilians, 1 don, 2 mafia",
            RosterPreset::Compact => "6 players: 1 sheriff, 3 civilians, 1 don, 1 mafia",
            RosterPreset::Extended => "13 players: 1 sheriff, 8 civilians, 1 don, 3 mafia",
            RosterPreset::Leaderless => "10 players: 1 sheriff, 6 civilians, 3 mafia, no don",
            RosterPreset::Blind => "10 players: 7 civilians, 1 don, 2 mafia, no sheriff",
        }
    }

    /// Role counts as (sheriffs, civilians, dons, mafia).
    fn counts(&self) -> (usize, usize, usize, usize) {
        match self {
            RosterPreset::Classic => (1, 6, 1, 2),
            RosterPreset::Compact => (1, 3, 1, 1),
            RosterPreset::Extended => (1, 8, 1, 3),
            RosterPreset::Leaderless => (1, 6, 0, 3),
            RosterPreset::Blind => (0, 7, 1, 2),
        }
    }

    /// Roles in canonical order: sheriff, civilians, don, mafia.
    pub fn roles(&self) -> Vec<Role> {
        let (sheriffs, civilians, dons, mafia) = self.counts();
        let mut roles = Vec::with_capacity(self.size());
        roles.extend(std::iter::repeat(Role::Sheriff).take(sheriffs));
        roles.extend(std::iter::repeat(Role::Civilian).take(civilians));
        roles.extend(std::iter::repeat(Role::Don).take(dons));
        roles.extend(std::iter::repeat(Role::Mafia).take(mafia));
        roles
    }

    /// Roles shuffled into seats.
    pub fn shuffled<R: Rng>(&self, rng: &mut R) -> Vec<Role> {
        let mut roles = self.roles();
        roles.shuffle(rng);
        roles
    }

    pub fn size(&self) -> usize {
        let (sheriffs, civilians, dons, mafia) = self.counts();
        sheriffs + civilians + dons + mafia
    }
}

impl Default for RosterPreset {
    fn default() -> Self {
        RosterPreset::Classic
    }
}

impl std::fmt::Display for RosterPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for RosterPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classic" | "default" => Ok(RosterPreset::Classic),
            "compact" | "small" => Ok(RosterPreset::Compact),
            "extended" | "large" => Ok(RosterPreset::Extended),
            "leaderless" | "no_don" => Ok(RosterPreset::Leaderless),
            "blind" | "no_sheriff" => Ok(RosterPreset::Blind),
            _ => Err(format!("Unknown roster preset: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_classic_roster() {
        let roles = RosterPreset::Classic.roles();
        assert_eq!(roles.len(), 10);
        assert_eq!(roles.iter().filter(|r| **r == Role::Sheriff).count(), 1);
        assert_eq!(roles.iter().filter(|r| **r == Role::Civilian).count(), 6);
        assert_eq!(roles.iter().filter(|r| **r == Role::Don).count(), 1);
        assert_eq!(roles.iter().filter(|r| **r == Role::Mafia).count(), 2);
    }

    #[test]
    fn test_presets_start_undecided() {
        for preset in RosterPreset::all() {
            let roles = preset.roles();
            let mafia = roles.iter().filter(|r| r.is_mafia()).count();
            assert!(mafia > 0, "{preset} has no mafia");
            assert!(mafia < roles.len() - mafia, "{preset} starts decided");
            assert_eq!(roles.len(), preset.size());
        }
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let a = RosterPreset::Classic.shuffled(&mut ChaCha8Rng::seed_from_u64(5));
        let b = RosterPreset::Classic.shuffled(&mut ChaCha8Rng::seed_from_u64(5));
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort();
        let mut canonical = RosterPreset::Classic.roles();
        canonical.sort();
        assert_eq!(sorted, canonical);
    }

    #[test]
    fn test_preset_names_parse() {
        for preset in RosterPreset::all() {
            assert_eq!(preset.name().parse::<RosterPreset>().unwrap(), preset);
        }
        assert!("huge".parse::<RosterPreset>().is_err());
    }
}
