//! A seat at the table: identity, role, policy and liveness.

use crate::actions::{CheckResult, DonCheckResult, SpeechAction, SpeechLog};
use crate::policy::Policy;
use crate::roles::Role;
use crate::session::GameSession;
use std::cell::RefCell;
use std::fmt;

/// Stable participant identifier, dense from 0.
pub type PlayerId = usize;

/// A participant in one game.
///
/// The policy sits behind a `RefCell` so it can be asked for a decision while
/// the rest of the session is borrowed read-only. A policy must not call back
/// into its own participant's decision methods.
pub struct Participant {
    id: PlayerId,
    role: Role,
    alive: bool,
    policy: RefCell<Box<dyn Policy>>,
}

impl Participant {
    /// Creates a living participant.
    pub fn new(id: PlayerId, role: Role, policy: Box<dyn Policy>) -> Self {
        Self {
            id,
            role,
            alive: true,
            policy: RefCell::new(policy),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Name reported by the policy.
    pub fn policy_name(&self) -> String {
        self.policy.borrow().name().to_string()
    }

    /// Marks the participant dead. There is no way back.
    pub(crate) fn eliminate(&mut self) {
        self.alive = false;
    }

    // ------------------------------------------------------------------
    // Decision queries, forwarded to the policy

    pub fn speak(&self, session: &GameSession) -> SpeechAction {
        self.policy.borrow_mut().speak(self, session)
    }

    pub fn vote(&self, session: &GameSession, candidates: &[PlayerId]) -> Option<PlayerId> {
        self.policy.borrow_mut().vote(self, session, candidates)
    }

    pub fn vote_on_mass_elimination(&self, session: &GameSession, tied: &[PlayerId]) -> bool {
        self.policy
            .borrow_mut()
            .vote_on_mass_elimination(self, session, tied)
    }

    pub fn investigate_as_sheriff(
        &self,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.policy
            .borrow_mut()
            .investigate_as_sheriff(self, session, candidates)
    }

    pub fn investigate_as_don(
        &self,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.policy
            .borrow_mut()
            .investigate_as_don(self, session, candidates)
    }

    pub fn propose_kill(&self, session: &GameSession, candidates: &[PlayerId]) -> Option<PlayerId> {
        self.policy.borrow_mut().propose_kill(self, session, candidates)
    }

    pub fn last_words(&self, session: &GameSession) -> SpeechAction {
        self.policy.borrow_mut().last_words(self, session)
    }

    // ------------------------------------------------------------------
    // Memory hooks

    pub(crate) fn remember_sheriff_result(&self, result: &CheckResult) {
        self.policy.borrow_mut().remember_sheriff_result(result);
    }

    pub(crate) fn remember_don_check(&self, result: &DonCheckResult) {
        self.policy.borrow_mut().remember_don_check(result);
    }

    pub(crate) fn learn_sheriff_identity(&self, sheriff: PlayerId) {
        self.policy.borrow_mut().learn_sheriff_identity(sheriff);
    }

    pub(crate) fn notify_speech(&self, day: u32, index: usize, speech: &SpeechLog) {
        self.policy.borrow_mut().on_speech(day, index, speech);
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("alive", &self.alive)
            .field(
                "policy",
                &self.policy.try_borrow().map(|p| p.name().to_string()).ok(),
            )
            .finish()
    }
}
