//! Immutable records describing what happened during a game.
//!
//! Everything the engine logs is a plain value: speeches, votes and
//! investigation results are collected into per-day and per-night logs, and
//! the two are paired into a [`RoundLog`] once the round is over.

use crate::participant::PlayerId;
use crate::roles::Role;
use serde::{Deserialize, Serialize};

/// A public, unverified statement about another participant's alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheriffClaim {
    /// Participant making the claim
    pub claimant: PlayerId,

    /// Participant the claim is about
    pub target: PlayerId,

    /// Asserted alignment of the target
    pub is_mafia: bool,
}

impl SheriffClaim {
    /// Creates a new claim.
    pub fn new(claimant: PlayerId, target: PlayerId, is_mafia: bool) -> Self {
        Self { claimant, target, is_mafia }
    }
}

/// What a participant says during a speech.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechAction {
    /// Participant put forward for the vote, if any
    pub nomination: Option<PlayerId>,

    /// Claims made during the speech, in order
    #[serde(default)]
    pub claims: Vec<SheriffClaim>,
}

impl SpeechAction {
    /// A speech that neither nominates nor claims anything.
    pub fn silent() -> Self {
        Self::default()
    }

    /// A speech nominating `target`.
    pub fn nominate(target: PlayerId) -> Self {
        Self {
            nomination: Some(target),
            claims: Vec::new(),
        }
    }

    /// Appends a claim to the speech.
    pub fn with_claim(mut self, claim: SheriffClaim) -> Self {
        self.claims.push(claim);
        self
    }

    /// Drops the nomination, keeping the claims.
    ///
    /// Used for speeches where nominating is not allowed (posthumous
    /// speeches, tie speeches and last words).
    pub fn without_nomination(mut self) -> Self {
        self.nomination = None;
        self
    }
}

/// A speech as it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechLog {
    pub speaker: PlayerId,
    pub action: SpeechAction,
}

impl SpeechLog {
    pub fn new(speaker: PlayerId, action: SpeechAction) -> Self {
        Self { speaker, action }
    }
}

/// A single day vote. `target` is `None` only when nobody was nominated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: PlayerId,
    pub target: Option<PlayerId>,
}

/// Outcome of the sheriff's night investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub checker: PlayerId,
    pub target: PlayerId,
    pub is_mafia: bool,
}

/// Outcome of the don's night search for the sheriff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonCheckResult {
    pub checker: PlayerId,
    pub target: PlayerId,
    pub is_sheriff: bool,
}

/// Everything that happened during one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayLog {
    /// Speeches in the order they were given
    pub speeches: Vec<SpeechLog>,

    /// Votes in the order they were cast, across all voting rounds
    pub votes: Vec<Vote>,

    /// Participants removed by the vote (empty when nobody was eliminated)
    pub eliminated: Vec<PlayerId>,
}

impl DayLog {
    /// Returns true if the day ended with at least one elimination.
    pub fn has_elimination(&self) -> bool {
        !self.eliminated.is_empty()
    }

    /// Number of speeches that carried a nomination.
    pub fn nomination_count(&self) -> usize {
        self.speeches
            .iter()
            .filter(|s| s.action.nomination.is_some())
            .count()
    }
}

/// Everything that happened during one night.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightLog {
    pub sheriff_check: Option<CheckResult>,
    pub don_check: Option<DonCheckResult>,
    pub kill: Option<PlayerId>,
}

impl NightLog {
    /// Copy of this night as seen by a participant holding `viewer_role`.
    ///
    /// The kill is public. Investigation results stay visible only to the
    /// role that performed them.
    pub fn redacted_for(&self, viewer_role: Option<Role>) -> NightLog {
        NightLog {
            sheriff_check: self
                .sheriff_check
                .filter(|_| viewer_role == Some(Role::Sheriff)),
            don_check: self.don_check.filter(|_| viewer_role == Some(Role::Don)),
            kill: self.kill,
        }
    }
}

/// One full round: a day and, unless the day decided the game, a night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundLog {
    pub day: DayLog,
    pub night: Option<NightLog>,
}

impl RoundLog {
    /// Copy of this round as seen by a participant holding `viewer_role`.
    pub fn redacted_for(&self, viewer_role: Option<Role>) -> RoundLog {
        RoundLog {
            day: self.day.clone(),
            night: self.night.as_ref().map(|n| n.redacted_for(viewer_role)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_night() -> NightLog {
        NightLog {
            sheriff_check: Some(CheckResult { checker: 0, target: 1, is_mafia: true }),
            don_check: Some(DonCheckResult { checker: 1, target: 0, is_sheriff: true }),
            kill: Some(2),
        }
    }

    #[test]
    fn test_without_nomination_keeps_claims() {
        let action = SpeechAction::nominate(3)
            .with_claim(SheriffClaim::new(0, 3, true))
            .without_nomination();

        assert_eq!(action.nomination, None);
        assert_eq!(action.claims.len(), 1);
    }

    #[test]
    fn test_night_redaction_per_role() {
        let night = full_night();

        let civilian = night.redacted_for(Some(Role::Civilian));
        assert!(civilian.sheriff_check.is_none());
        assert!(civilian.don_check.is_none());
        assert_eq!(civilian.kill, Some(2));

        let sheriff = night.redacted_for(Some(Role::Sheriff));
        assert!(sheriff.sheriff_check.is_some());
        assert!(sheriff.don_check.is_none());

        let don = night.redacted_for(Some(Role::Don));
        assert!(don.sheriff_check.is_none());
        assert!(don.don_check.is_some());

        let mafia = night.redacted_for(Some(Role::Mafia));
        assert!(mafia.don_check.is_none());
    }

    #[test]
    fn test_round_serializes_to_json() {
        let round = RoundLog {
            day: DayLog {
                speeches: vec![SpeechLog::new(0, SpeechAction::nominate(1))],
                votes: vec![Vote { voter: 0, target: Some(1) }],
                eliminated: vec![1],
            },
            night: Some(full_night()),
        };

        let json = serde_json::to_string(&round).unwrap();
        let back: RoundLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, round);
        assert!(json.contains("\"eliminated\":[1]"));
    }
}
