//! Roles, alignments and per-role night behaviour.
//!
//! The engine never asks "is this the sheriff?". Each role resolves to a
//! static [`NightBehavior`] object, and the night phase only talks to that
//! interface: who may decide a kill, who investigates and in which order,
//! and whose death is deferred to the end of the night.

use crate::actions::{CheckResult, DonCheckResult};
use crate::participant::{Participant, PlayerId};
use crate::session::GameSession;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four roles of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Civilian,
    Mafia,
    Sheriff,
    Don,
}

impl Role {
    /// All roles in declaration order.
    pub const ALL: [Role; 4] = [Role::Civilian, Role::Mafia, Role::Sheriff, Role::Don];

    pub fn is_mafia(self) -> bool {
        matches!(self, Role::Mafia | Role::Don)
    }

    pub fn is_civilian(self) -> bool {
        !self.is_mafia()
    }

    /// The side this role plays for.
    pub fn alignment(self) -> Alignment {
        if self.is_mafia() {
            Alignment::Mafia
        } else {
            Alignment::Civilian
        }
    }

    /// Canonical upper-case name, as used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Role::Civilian => "CIVILIAN",
            Role::Mafia => "MAFIA",
            Role::Sheriff => "SHERIFF",
            Role::Don => "DON",
        }
    }

    /// The night behaviour attached to this role.
    pub fn night_behavior(self) -> &'static dyn NightBehavior {
        match self {
            Role::Civilian => &NoNightAction,
            Role::Mafia => &MafiaNight,
            Role::Sheriff => &SheriffNight,
            Role::Don => &DonNight,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CIVILIAN" => Ok(Role::Civilian),
            "MAFIA" => Ok(Role::Mafia),
            "SHERIFF" => Ok(Role::Sheriff),
            "DON" => Ok(Role::Don),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// The two sides of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Alignment {
    Mafia,
    Civilian,
}

impl Alignment {
    pub fn name(self) -> &'static str {
        match self {
            Alignment::Mafia => "MAFIA",
            Alignment::Civilian => "CIVILIAN",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MAFIA" => Ok(Alignment::Mafia),
            "CIVILIAN" => Ok(Alignment::Civilian),
            _ => Err(format!("Unknown alignment: {}", s)),
        }
    }
}

// ============================================================================
// NIGHT BEHAVIOUR
// ============================================================================

/// How much say a role has in the night kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillAuthority {
    /// Takes no part in the kill
    None,

    /// Proposes a target; the most common proposal wins
    Suggest,

    /// Decides the target alone, overriding any suggestions
    Decide,
}

/// Result of a night investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Investigation {
    Sheriff(CheckResult),
    Don(DonCheckResult),
}

/// Uniform night-action interface implemented once per role.
pub trait NightBehavior: Sync {
    /// Say this role has in the night kill.
    fn kill_authority(&self) -> KillAuthority {
        KillAuthority::None
    }

    /// Asks the actor's policy for a kill target among `candidates`.
    fn propose_kill(
        &self,
        _actor: &Participant,
        _session: &GameSession,
        _candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        None
    }

    /// Position of this role's investigation in the night order, if it has one.
    fn investigation_rank(&self) -> Option<u8> {
        None
    }

    /// Runs the actor's investigation.
    ///
    /// Candidates are the participants alive right now, minus the actor and
    /// the target of tonight's kill.
    fn investigate(
        &self,
        _actor: &Participant,
        _session: &GameSession,
        _kill_target: Option<PlayerId>,
    ) -> Option<Investigation> {
        None
    }

    /// Whether a night kill on this role only takes effect once every
    /// investigation of the night has run.
    fn delays_night_death(&self) -> bool {
        false
    }
}

/// Roles with nothing to do at night.
pub struct NoNightAction;

impl NightBehavior for NoNightAction {}

/// Ordinary mafia member: suggests kills.
pub struct MafiaNight;

impl NightBehavior for MafiaNight {
    fn kill_authority(&self) -> KillAuthority {
        KillAuthority::Suggest
    }

    fn propose_kill(
        &self,
        actor: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        actor.propose_kill(session, candidates)
    }
}

/// The sheriff: checks one participant's alignment each night.
pub struct SheriffNight;

impl NightBehavior for SheriffNight {
    fn investigation_rank(&self) -> Option<u8> {
        Some(1)
    }

    fn investigate(
        &self,
        actor: &Participant,
        session: &GameSession,
        kill_target: Option<PlayerId>,
    ) -> Option<Investigation> {
        let candidates = investigation_candidates(actor, session, kill_target);
        if candidates.is_empty() {
            return None;
        }
        let target = actor.investigate_as_sheriff(session, &candidates)?;
        if !candidates.contains(&target) {
            return None;
        }
        let is_mafia = session.participant(target)?.role().is_mafia();
        let result = CheckResult {
            checker: actor.id(),
            target,
            is_mafia,
        };
        actor.remember_sheriff_result(&result);
        Some(Investigation::Sheriff(result))
    }

    fn delays_night_death(&self) -> bool {
        true
    }
}

/// The don: decides the kill and searches for the sheriff.
pub struct DonNight;

impl NightBehavior for DonNight {
    fn kill_authority(&self) -> KillAuthority {
        KillAuthority::Decide
    }

    fn propose_kill(
        &self,
        actor: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        actor.propose_kill(session, candidates)
    }

    fn investigation_rank(&self) -> Option<u8> {
        Some(0)
    }

    fn investigate(
        &self,
        actor: &Participant,
        session: &GameSession,
        kill_target: Option<PlayerId>,
    ) -> Option<Investigation> {
        let candidates = investigation_candidates(actor, session, kill_target);
        if candidates.is_empty() {
            return None;
        }
        let target = actor.investigate_as_don(session, &candidates)?;
        if !candidates.contains(&target) {
            return None;
        }
        let is_sheriff = session.participant(target)?.role() == Role::Sheriff;
        let result = DonCheckResult {
            checker: actor.id(),
            target,
            is_sheriff,
        };
        actor.remember_don_check(&result);
        Some(Investigation::Don(result))
    }
}

fn investigation_candidates(
    actor: &Participant,
    session: &GameSession,
    kill_target: Option<PlayerId>,
) -> Vec<PlayerId> {
    session
        .alive_participants()
        .map(Participant::id)
        .filter(|&id| id != actor.id() && Some(id) != kill_target)
        .collect()
}
