//! The decision-policy contract.
//!
//! A policy decides everything a participant does: whom to nominate, how to
//! vote, whom to check or kill at night. The engine only ever calls the
//! methods below and never looks at the concrete type behind them.
//!
//! Every method receives the asking participant and a read-only view of the
//! session. A policy may keep whatever memory it likes, but it can only change
//! its own state; liveness and history belong to the engine.

use crate::actions::{CheckResult, DonCheckResult, SpeechAction, SpeechLog};
use crate::participant::{Participant, PlayerId};
use crate::session::GameSession;

/// Decision-making capability bound to a participant.
///
/// `Send` so a whole game can be moved onto a worker thread.
pub trait Policy: Send {
    /// Short name used in logs and exports.
    fn name(&self) -> &str {
        "policy"
    }

    /// Day speech: an optional nomination plus any claims.
    fn speak(&mut self, _me: &Participant, _session: &GameSession) -> SpeechAction {
        SpeechAction::silent()
    }

    /// Day vote among `candidates`.
    ///
    /// Returning `None` or a non-candidate does not abstain: the engine
    /// forces such votes onto the last candidate.
    fn vote(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        _candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        None
    }

    /// Yes/no vote on eliminating every candidate of a stable tie.
    fn vote_on_mass_elimination(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        _tied: &[PlayerId],
    ) -> bool {
        false
    }

    /// Sheriff's night check target.
    fn investigate_as_sheriff(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        _candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        None
    }

    /// Don's night search target.
    fn investigate_as_don(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        _candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        None
    }

    /// Night kill proposal (a decision when the participant is the don).
    fn propose_kill(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        _candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        None
    }

    /// Final speech after elimination or a night death.
    fn last_words(&mut self, _me: &Participant, _session: &GameSession) -> SpeechAction {
        SpeechAction::silent()
    }

    /// Called with the result of this participant's own sheriff check.
    fn remember_sheriff_result(&mut self, _result: &CheckResult) {}

    /// Called with the result of this participant's own don check.
    fn remember_don_check(&mut self, _result: &DonCheckResult) {}

    /// Called on every living mafia-aligned participant when the don finds
    /// the sheriff.
    fn learn_sheriff_identity(&mut self, _sheriff: PlayerId) {}

    /// Called for every speech as soon as it is recorded.
    ///
    /// `index` is the speech's position within the day, so a policy can skip
    /// speeches it has already processed.
    fn on_speech(&mut self, _day: u32, _index: usize, _speech: &SpeechLog) {}
}

/// Facts the engine has established for the whole mafia faction.
///
/// Written only by the engine, readable only by mafia-aligned participants
/// through [`GameSession::faction_knowledge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactionKnowledge {
    known_sheriff: Option<PlayerId>,
}

impl FactionKnowledge {
    /// The sheriff, once the don has found them.
    pub fn known_sheriff(&self) -> Option<PlayerId> {
        self.known_sheriff
    }

    pub(crate) fn record_sheriff(&mut self, sheriff: PlayerId) {
        self.known_sheriff = Some(sheriff);
    }
}
