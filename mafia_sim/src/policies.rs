//! Built-in decision policies.
//!
//! Two families are provided:
//!
//! - the **basic** policies (`civilian`, `sheriff`, `mafia`, `don`) play
//!   mostly at random, with the sheriff pushing the mafia it found and the
//!   mafia hunting a discovered sheriff;
//! - the **single-sheriff** policies assume exactly one sheriff claim is
//!   truthful. Civilians trust the first claimant and follow its lead, the
//!   sheriff decides each day whether to reveal itself, and the mafia kill
//!   the claimant and then everyone it cleared.
//!
//! Every policy draws from its own seeded [`ChaCha8Rng`] stream.

use mafia_core::{
    CheckResult, DonCheckResult, GameSession, Participant, PlayerId, Policy, SheriffClaim,
    SpeechAction, SpeechLog,
};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet};

/// Default probability of an uninformed nomination.
pub const DEFAULT_NOMINATION_PROB: f64 = 0.3;

/// Default daily probability that a hidden single-sheriff reveals itself.
pub const DEFAULT_REVEAL_PROBABILITY: f64 = 0.5;

fn choose(rng: &mut ChaCha8Rng, options: &[PlayerId]) -> Option<PlayerId> {
    options.choose(rng).copied()
}

/// Nominates a random entry of `pool` with probability `prob`.
///
/// No random number is drawn when the pool is empty.
fn maybe_nominate(rng: &mut ChaCha8Rng, pool: &[PlayerId], prob: f64) -> SpeechAction {
    if !pool.is_empty() && rng.gen::<f64>() < prob {
        SpeechAction {
            nomination: choose(rng, pool),
            claims: Vec::new(),
        }
    } else {
        SpeechAction::silent()
    }
}

fn others_alive(me: &Participant, session: &GameSession) -> Vec<PlayerId> {
    session
        .alive_participants()
        .map(Participant::id)
        .filter(|&id| id != me.id())
        .collect()
}

fn is_mafia(session: &GameSession, id: PlayerId) -> bool {
    session.participant(id).map_or(false, |p| p.role().is_mafia())
}

/// `preferred` if non-empty, otherwise `fallback`.
fn prefer<'a>(preferred: &'a [PlayerId], fallback: &'a [PlayerId]) -> &'a [PlayerId] {
    if preferred.is_empty() {
        fallback
    } else {
        preferred
    }
}

// ============================================================================
// BASIC POLICIES
// ============================================================================

/// Votes for a random candidate and does nothing else.
pub struct RandomPolicy {
    rng: ChaCha8Rng,
}

impl RandomPolicy {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self { rng }
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &str {
        "random"
    }

    fn vote(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        choose(&mut self.rng, candidates)
    }
}

/// Occasionally nominates a random living player; votes at random.
pub struct CivilianPolicy {
    rng: ChaCha8Rng,
    nomination_prob: f64,
}

impl CivilianPolicy {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            rng,
            nomination_prob: DEFAULT_NOMINATION_PROB,
        }
    }

    pub fn with_nomination_prob(mut self, prob: f64) -> Self {
        self.nomination_prob = prob;
        self
    }
}

impl Policy for CivilianPolicy {
    fn name(&self) -> &str {
        "civilian"
    }

    fn speak(&mut self, me: &Participant, session: &GameSession) -> SpeechAction {
        maybe_nominate(&mut self.rng, &others_alive(me, session), self.nomination_prob)
    }

    fn vote(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        choose(&mut self.rng, candidates)
    }
}

/// Checks players it has not checked yet and pushes the mafia it finds.
pub struct SheriffPolicy {
    rng: ChaCha8Rng,
    nomination_prob: f64,

    /// Check results by target
    known: BTreeMap<PlayerId, bool>,

    /// Target of the most recent check
    last_check: Option<PlayerId>,
}

impl SheriffPolicy {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            rng,
            nomination_prob: DEFAULT_NOMINATION_PROB,
            known: BTreeMap::new(),
            last_check: None,
        }
    }

    pub fn with_nomination_prob(mut self, prob: f64) -> Self {
        self.nomination_prob = prob;
        self
    }

    fn known_mafia(&self, session: &GameSession) -> Option<PlayerId> {
        self.known
            .iter()
            .find(|(&id, &is_mafia)| is_mafia && session.is_alive(id))
            .map(|(&id, _)| id)
    }

    /// Claims for every check made so far.
    fn all_claims(&self, me: &Participant) -> Vec<SheriffClaim> {
        self.known
            .iter()
            .map(|(&target, &is_mafia)| SheriffClaim::new(me.id(), target, is_mafia))
            .collect()
    }

    fn vote_known_mafia(&mut self, candidates: &[PlayerId]) -> Option<PlayerId> {
        let mafia: Vec<PlayerId> = candidates
            .iter()
            .copied()
            .filter(|id| self.known.get(id) == Some(&true))
            .collect();
        choose(&mut self.rng, prefer(&mafia, candidates))
    }
}

impl Policy for SheriffPolicy {
    fn name(&self) -> &str {
        "sheriff"
    }

    fn speak(&mut self, me: &Participant, session: &GameSession) -> SpeechAction {
        match self.known_mafia(session) {
            Some(target) => {
                SpeechAction::nominate(target).with_claim(SheriffClaim::new(me.id(), target, true))
            }
            None => maybe_nominate(&mut self.rng, &others_alive(me, session), self.nomination_prob),
        }
    }

    fn vote(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.vote_known_mafia(candidates)
    }

    fn investigate_as_sheriff(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        let unknown: Vec<PlayerId> = candidates
            .iter()
            .copied()
            .filter(|id| !self.known.contains_key(id))
            .collect();
        choose(&mut self.rng, prefer(&unknown, candidates))
    }

    fn remember_sheriff_result(&mut self, result: &CheckResult) {
        self.known.insert(result.target, result.is_mafia);
        self.last_check = Some(result.target);
    }
}

/// Nominates and kills civilians; goes after a discovered sheriff first.
pub struct MafiaPolicy {
    rng: ChaCha8Rng,
    nomination_prob: f64,
    known_sheriff: Option<PlayerId>,
}

impl MafiaPolicy {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            rng,
            nomination_prob: DEFAULT_NOMINATION_PROB,
            known_sheriff: None,
        }
    }

    pub fn with_nomination_prob(mut self, prob: f64) -> Self {
        self.nomination_prob = prob;
        self
    }

    /// Sheriff identity from this policy's memory or the faction's.
    fn sheriff(&self, me: &Participant, session: &GameSession) -> Option<PlayerId> {
        self.known_sheriff.or_else(|| {
            session
                .faction_knowledge(me)
                .and_then(|knowledge| knowledge.known_sheriff())
        })
    }

    fn kill_options(session: &GameSession, candidates: &[PlayerId]) -> Vec<PlayerId> {
        candidates
            .iter()
            .copied()
            .filter(|&id| !is_mafia(session, id))
            .collect()
    }
}

impl Policy for MafiaPolicy {
    fn name(&self) -> &str {
        "mafia"
    }

    fn speak(&mut self, _me: &Participant, session: &GameSession) -> SpeechAction {
        let civilians: Vec<PlayerId> = session
            .alive_participants()
            .filter(|p| !p.role().is_mafia())
            .map(Participant::id)
            .collect();
        maybe_nominate(&mut self.rng, &civilians, self.nomination_prob)
    }

    fn vote(
        &mut self,
        _me: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        let civilians = Self::kill_options(session, candidates);
        choose(&mut self.rng, prefer(&civilians, candidates))
    }

    fn propose_kill(
        &mut self,
        me: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        let options = Self::kill_options(session, candidates);
        if let Some(sheriff) = self.sheriff(me, session) {
            if options.contains(&sheriff) {
                return Some(sheriff);
            }
        }
        choose(&mut self.rng, &options)
    }

    fn learn_sheriff_identity(&mut self, sheriff: PlayerId) {
        self.known_sheriff = Some(sheriff);
    }
}

/// Don's nightly search: prefers players not checked before.
#[derive(Debug, Default)]
struct SheriffSearch {
    checked: BTreeSet<PlayerId>,
}

impl SheriffSearch {
    fn pick(&self, rng: &mut ChaCha8Rng, candidates: &[PlayerId]) -> Option<PlayerId> {
        let fresh: Vec<PlayerId> = candidates
            .iter()
            .copied()
            .filter(|id| !self.checked.contains(id))
            .collect();
        choose(rng, prefer(&fresh, candidates))
    }

    fn record(&mut self, result: &DonCheckResult) {
        self.checked.insert(result.target);
    }
}

/// [`MafiaPolicy`] plus the don's search for the sheriff.
pub struct DonPolicy {
    mafia: MafiaPolicy,
    search: SheriffSearch,
}

impl DonPolicy {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            mafia: MafiaPolicy::new(rng),
            search: SheriffSearch::default(),
        }
    }

    pub fn with_nomination_prob(mut self, prob: f64) -> Self {
        self.mafia = self.mafia.with_nomination_prob(prob);
        self
    }
}

impl Policy for DonPolicy {
    fn name(&self) -> &str {
        "don"
    }

    fn speak(&mut self, me: &Participant, session: &GameSession) -> SpeechAction {
        self.mafia.speak(me, session)
    }

    fn vote(
        &mut self,
        me: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.mafia.vote(me, session, candidates)
    }

    fn propose_kill(
        &mut self,
        me: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.mafia.propose_kill(me, session, candidates)
    }

    fn investigate_as_don(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.search.pick(&mut self.mafia.rng, candidates)
    }

    fn remember_don_check(&mut self, result: &DonCheckResult) {
        self.search.record(result);
    }

    fn learn_sheriff_identity(&mut self, sheriff: PlayerId) {
        self.mafia.learn_sheriff_identity(sheriff);
    }
}

// ============================================================================
// SINGLE-SHERIFF POLICIES
// ============================================================================

/// What a civilian believes after hearing sheriff claims.
///
/// The first claimant is trusted; claims by anyone else are ignored.
#[derive(Debug, Default)]
struct ClaimTracker {
    sheriff: Option<PlayerId>,
    checked_mafia: BTreeSet<PlayerId>,
    checked_civilians: BTreeSet<PlayerId>,
}

impl ClaimTracker {
    fn observe(&mut self, speech: &SpeechLog) {
        for claim in &speech.action.claims {
            let sheriff = *self.sheriff.get_or_insert(claim.claimant);
            if claim.claimant != sheriff {
                continue;
            }
            if claim.is_mafia {
                self.checked_mafia.insert(claim.target);
            } else {
                self.checked_civilians.insert(claim.target);
            }
        }
    }

    /// Today's nomination by the trusted sheriff, unless it targets `me`.
    fn sheriff_nomination(&self, me: &Participant, session: &GameSession) -> Option<PlayerId> {
        let sheriff = self.sheriff?;
        session
            .current_speeches()
            .iter()
            .find(|s| s.speaker == sheriff)
            .and_then(|s| s.action.nomination)
            .filter(|&target| target != me.id())
    }
}

/// Civilian that trusts the first sheriff claim and follows its lead.
pub struct SingleSheriffCivilianPolicy {
    rng: ChaCha8Rng,
    random_nomination_chance: f64,
    claims: ClaimTracker,
}

impl SingleSheriffCivilianPolicy {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            rng,
            random_nomination_chance: DEFAULT_NOMINATION_PROB,
            claims: ClaimTracker::default(),
        }
    }

    pub fn with_random_nomination_chance(mut self, chance: f64) -> Self {
        self.random_nomination_chance = chance;
        self
    }

    /// Trusted sheriff, if one has claimed.
    pub fn trusted_sheriff(&self) -> Option<PlayerId> {
        self.claims.sheriff
    }
}

impl Policy for SingleSheriffCivilianPolicy {
    fn name(&self) -> &str {
        "single_sheriff_civilian"
    }

    fn speak(&mut self, me: &Participant, session: &GameSession) -> SpeechAction {
        if let Some(&target) = self
            .claims
            .checked_mafia
            .iter()
            .find(|&&id| id != me.id() && session.is_alive(id))
        {
            return SpeechAction::nominate(target);
        }
        if let Some(target) = self.claims.sheriff_nomination(me, session) {
            return SpeechAction::nominate(target);
        }

        let pool: Vec<PlayerId> = others_alive(me, session)
            .into_iter()
            .filter(|id| !self.claims.checked_civilians.contains(id))
            .filter(|&id| Some(id) != self.claims.sheriff)
            .collect();
        maybe_nominate(&mut self.rng, &pool, self.random_nomination_chance)
    }

    fn vote(
        &mut self,
        me: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        if let Some(target) = self.claims.sheriff_nomination(me, session) {
            if candidates.contains(&target) {
                return Some(target);
            }
        }

        let mafia: Vec<PlayerId> = candidates
            .iter()
            .copied()
            .filter(|&id| id != me.id() && self.claims.checked_mafia.contains(&id))
            .collect();
        let uncleared: Vec<PlayerId> = candidates
            .iter()
            .copied()
            .filter(|&id| id != me.id() && !self.claims.checked_civilians.contains(&id))
            .collect();
        choose(&mut self.rng, prefer(&mafia, &uncleared))
    }

    fn on_speech(&mut self, _day: u32, _index: usize, speech: &SpeechLog) {
        self.claims.observe(speech);
    }
}

/// Sheriff that reveals itself on a random day and then shares every check.
pub struct SingleSheriffSheriffPolicy {
    sheriff: SheriffPolicy,
    reveal_probability: f64,
    revealed: bool,
}

impl SingleSheriffSheriffPolicy {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            sheriff: SheriffPolicy::new(rng),
            reveal_probability: DEFAULT_REVEAL_PROBABILITY,
            revealed: false,
        }
    }

    pub fn with_reveal_probability(mut self, prob: f64) -> Self {
        self.reveal_probability = prob;
        self
    }

    pub fn with_nomination_prob(mut self, prob: f64) -> Self {
        self.sheriff = self.sheriff.with_nomination_prob(prob);
        self
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }
}

impl Policy for SingleSheriffSheriffPolicy {
    fn name(&self) -> &str {
        "single_sheriff_sheriff"
    }

    fn speak(&mut self, me: &Participant, session: &GameSession) -> SpeechAction {
        if !self.revealed && self.sheriff.rng.gen::<f64>() < self.reveal_probability {
            self.revealed = true;
        }
        if !self.revealed {
            let pool = others_alive(me, session);
            return maybe_nominate(&mut self.sheriff.rng, &pool, self.sheriff.nomination_prob);
        }

        let nomination = self
            .sheriff
            .last_check
            .filter(|id| self.sheriff.known.get(id) == Some(&true));
        SpeechAction {
            nomination,
            claims: self.sheriff.all_claims(me),
        }
    }

    fn vote(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        if self.revealed {
            self.sheriff.vote_known_mafia(candidates)
        } else {
            choose(&mut self.sheriff.rng, candidates)
        }
    }

    fn investigate_as_sheriff(
        &mut self,
        me: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.sheriff.investigate_as_sheriff(me, session, candidates)
    }

    /// Publishes every check, revealed or not.
    fn last_words(&mut self, me: &Participant, _session: &GameSession) -> SpeechAction {
        SpeechAction {
            nomination: None,
            claims: self.sheriff.all_claims(me),
        }
    }

    fn remember_sheriff_result(&mut self, result: &CheckResult) {
        self.sheriff.remember_sheriff_result(result);
    }
}

/// Mafia that kills the claimed sheriff, then the players it cleared.
pub struct SingleSheriffMafiaPolicy {
    mafia: MafiaPolicy,
    claimed_sheriff: Option<PlayerId>,

    /// Publicly cleared civilians, in the order they were cleared
    kill_queue: Vec<PlayerId>,
}

impl SingleSheriffMafiaPolicy {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            mafia: MafiaPolicy::new(rng),
            claimed_sheriff: None,
            kill_queue: Vec::new(),
        }
    }

    pub fn with_nomination_prob(mut self, prob: f64) -> Self {
        self.mafia = self.mafia.with_nomination_prob(prob);
        self
    }

    fn observe(&mut self, speech: &SpeechLog) {
        for claim in &speech.action.claims {
            if self.claimed_sheriff.is_none() && self.mafia.known_sheriff.is_none() {
                self.claimed_sheriff = Some(claim.claimant);
            }
            let trusted = Some(claim.claimant) == self.claimed_sheriff
                || Some(claim.claimant) == self.mafia.known_sheriff;
            if trusted && !claim.is_mafia && !self.kill_queue.contains(&claim.target) {
                self.kill_queue.push(claim.target);
            }
        }
    }
}

impl Policy for SingleSheriffMafiaPolicy {
    fn name(&self) -> &str {
        "single_sheriff_mafia"
    }

    fn speak(&mut self, me: &Participant, session: &GameSession) -> SpeechAction {
        self.mafia.speak(me, session)
    }

    fn vote(
        &mut self,
        me: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.mafia.vote(me, session, candidates)
    }

    fn propose_kill(
        &mut self,
        me: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.kill_queue.retain(|&id| session.is_alive(id));
        let options = MafiaPolicy::kill_options(session, candidates);

        let priority = [self.mafia.sheriff(me, session), self.claimed_sheriff];
        if let Some(target) = priority.into_iter().flatten().find(|id| options.contains(id)) {
            return Some(target);
        }
        if !self.kill_queue.is_empty() {
            let target = self.kill_queue.remove(0);
            if options.contains(&target) {
                return Some(target);
            }
        }
        choose(&mut self.mafia.rng, &options)
    }

    fn learn_sheriff_identity(&mut self, sheriff: PlayerId) {
        self.mafia.learn_sheriff_identity(sheriff);
    }

    fn on_speech(&mut self, _day: u32, _index: usize, speech: &SpeechLog) {
        self.observe(speech);
    }
}

/// Don variant of [`SingleSheriffMafiaPolicy`].
pub struct SingleSheriffDonPolicy {
    inner: SingleSheriffMafiaPolicy,
    search: SheriffSearch,
}

impl SingleSheriffDonPolicy {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            inner: SingleSheriffMafiaPolicy::new(rng),
            search: SheriffSearch::default(),
        }
    }

    pub fn with_nomination_prob(mut self, prob: f64) -> Self {
        self.inner = self.inner.with_nomination_prob(prob);
        self
    }
}

impl Policy for SingleSheriffDonPolicy {
    fn name(&self) -> &str {
        "single_sheriff_don"
    }

    fn speak(&mut self, me: &Participant, session: &GameSession) -> SpeechAction {
        self.inner.speak(me, session)
    }

    fn vote(
        &mut self,
        me: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.inner.vote(me, session, candidates)
    }

    fn propose_kill(
        &mut self,
        me: &Participant,
        session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.inner.propose_kill(me, session, candidates)
    }

    fn investigate_as_don(
        &mut self,
        _me: &Participant,
        _session: &GameSession,
        candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.search.pick(&mut self.inner.mafia.rng, candidates)
    }

    fn remember_don_check(&mut self, result: &DonCheckResult) {
        self.search.record(result);
    }

    fn learn_sheriff_identity(&mut self, sheriff: PlayerId) {
        self.inner.learn_sheriff_identity(sheriff);
    }

    fn on_speech(&mut self, day: u32, index: usize, speech: &SpeechLog) {
        self.inner.on_speech(day, index, speech);
    }
}
