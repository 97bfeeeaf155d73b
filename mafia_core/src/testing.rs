//! Scripted policies for engine tests.

use crate::actions::{CheckResult, DonCheckResult, SheriffClaim, SpeechAction};
use crate::participant::{Participant, PlayerId};
use crate::policy::Policy;
use crate::roles::Role;
use crate::session::GameSession;
use std::sync::{Arc, Mutex};

/// Shared notebook a scripted policy writes to.
pub type Notes = Arc<Mutex<Vec<String>>>;

pub fn notes() -> Notes {
    Arc::new(Mutex::new(Vec::new()))
}

/// Policy that replays fixed decisions.
///
/// Votes are consumed one per voting round; the last one repeats.
#[derive(Clone, Default)]
pub struct Scripted {
    nomination: Option<PlayerId>,
    claims: Vec<SheriffClaim>,
    votes: Vec<Option<PlayerId>>,
    vote_round: usize,
    mass: bool,
    kill: Option<PlayerId>,
    check: Option<PlayerId>,
    watch: Option<PlayerId>,
    notes: Option<Notes>,
}

impl Scripted {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nominates(mut self, target: PlayerId) -> Self {
        self.nomination = Some(target);
        self
    }

    pub fn claims(mut self, claim: SheriffClaim) -> Self {
        self.claims.push(claim);
        self
    }

    pub fn votes(mut self, votes: &[Option<PlayerId>]) -> Self {
        self.votes = votes.to_vec();
        self
    }

    pub fn votes_for(self, target: PlayerId) -> Self {
        self.votes(&[Some(target)])
    }

    pub fn mass(mut self, yes: bool) -> Self {
        self.mass = yes;
        self
    }

    pub fn kills(mut self, target: PlayerId) -> Self {
        self.kill = Some(target);
        self
    }

    pub fn checks(mut self, target: PlayerId) -> Self {
        self.check = Some(target);
        self
    }

    /// Notes whether `id` is alive whenever this policy investigates.
    pub fn watches(mut self, id: PlayerId) -> Self {
        self.watch = Some(id);
        self
    }

    pub fn noting(mut self, notes: &Notes) -> Self {
        self.notes = Some(Arc::clone(notes));
        self
    }

    fn note(&self, line: String) {
        if let Some(notes) = &self.notes {
            notes.lock().unwrap().push(line);
        }
    }

    fn watch(&self, session: &GameSession) {
        if let Some(id) = self.watch {
            self.note(format!("alive {} {}", id, session.is_alive(id)));
        }
    }
}

impl Policy for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn speak(&mut self, _me: &Participant, _session: &GameSession) -> SpeechAction {
        SpeechAction {
            nomination: self.nomination,
            claims: self.claims.clone(),
        }
    }

    fn vote(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        _candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        let choice = self
            .votes
            .get(self.vote_round)
            .or_else(|| self.votes.last())
            .copied()
            .flatten();
        self.vote_round += 1;
        choice
    }

    fn vote_on_mass_elimination(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        _tied: &[PlayerId],
    ) -> bool {
        self.mass
    }

    fn investigate_as_sheriff(
        &mut self,
        _me: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.watch(session);
        self.check.or_else(|| candidates.first().copied())
    }

    fn investigate_as_don(
        &mut self,
        _me: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.watch(session);
        self.check.or_else(|| candidates.first().copied())
    }

    fn propose_kill(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        _candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.kill
    }

    fn last_words(&mut self, _me: &Participant, _session: &GameSession) -> SpeechAction {
        SpeechAction {
            nomination: self.nomination,
            claims: self.claims.clone(),
        }
    }

    fn remember_sheriff_result(&mut self, result: &CheckResult) {
        self.note(format!("sheriff {} {}", result.target, result.is_mafia));
    }

    fn remember_don_check(&mut self, result: &DonCheckResult) {
        self.note(format!("don {} {}", result.target, result.is_sheriff));
    }

    fn learn_sheriff_identity(&mut self, sheriff: PlayerId) {
        self.note(format!("learned {}", sheriff));
    }
}

/// Seats scripted policies in order, ids from 0.
pub fn roster(seats: Vec<(Role, Scripted)>) -> Vec<Participant> {
    seats
        .into_iter()
        .enumerate()
        .map(|(id, (role, policy))| Participant::new(id, role, Box::new(policy)))
        .collect()
}
