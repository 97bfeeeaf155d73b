//! Game session: the roster, the accumulated history and derived counts.
//!
//! The session is what policies get to look at. The engine is the only code
//! that mutates it; every mutating method here is crate-private.

use crate::actions::{RoundLog, SpeechLog};
use crate::error::SetupError;
use crate::participant::{Participant, PlayerId};
use crate::policy::FactionKnowledge;
use crate::roles::{Alignment, Role};

/// Roster plus history of one game.
#[derive(Debug)]
pub struct GameSession {
    participants: Vec<Participant>,
    history: Vec<RoundLog>,
    next_first_speaker: PlayerId,
    current_day: u32,
    current_speeches: Vec<SpeechLog>,
    faction: FactionKnowledge,
}

impl GameSession {
    /// Validates the roster and creates a session.
    ///
    /// Ids must be dense from 0 and in order; there can be at most one don
    /// and at most one sheriff.
    pub fn new(participants: Vec<Participant>) -> Result<Self, SetupError> {
        if participants.is_empty() {
            return Err(SetupError::EmptyRoster);
        }
        for (position, p) in participants.iter().enumerate() {
            if p.id() != position {
                return Err(SetupError::NonDenseIds {
                    position,
                    found: p.id(),
                });
            }
        }
        for unique in [Role::Don, Role::Sheriff] {
            let mut holders = participants.iter().filter(|p| p.role() == unique);
            if let (Some(first), Some(second)) = (holders.next(), holders.next()) {
                return Err(SetupError::DuplicateRole {
                    role: unique.name(),
                    first: first.id(),
                    second: second.id(),
                });
            }
        }

        Ok(Self {
            participants,
            history: Vec::new(),
            next_first_speaker: 0,
            current_day: 0,
            current_speeches: Vec::new(),
            faction: FactionKnowledge::default(),
        })
    }

    // ------------------------------------------------------------------
    // Roster

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, id: PlayerId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn alive_participants(&self) -> impl Iterator<Item = &Participant> + '_ {
        self.participants.iter().filter(|p| p.is_alive())
    }

    pub fn alive_ids(&self) -> Vec<PlayerId> {
        self.alive_participants().map(Participant::id).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.alive_participants().count()
    }

    /// False for dead and for unknown ids.
    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.participant(id).map_or(false, Participant::is_alive)
    }

    /// First participant holding `role`.
    pub fn find_role(&self, role: Role) -> Option<&Participant> {
        self.participants.iter().find(|p| p.role() == role)
    }

    /// Ids of every participant holding `role`, dead or alive.
    pub fn ids_with_role(&self, role: Role) -> Vec<PlayerId> {
        self.participants
            .iter()
            .filter(|p| p.role() == role)
            .map(Participant::id)
            .collect()
    }

    /// Roles in seat order.
    pub fn roles(&self) -> Vec<Role> {
        self.participants.iter().map(Participant::role).collect()
    }

    // ------------------------------------------------------------------
    // Counts and win check

    /// Living mafia-aligned participants.
    pub fn mafia_count(&self) -> usize {
        self.alive_participants().filter(|p| p.role().is_mafia()).count()
    }

    /// Living civilian-aligned participants.
    pub fn civilian_count(&self) -> usize {
        self.alive_participants()
            .filter(|p| p.role().is_civilian())
            .count()
    }

    /// Winner of the game so far, if any.
    ///
    /// Civilians win once no mafia is left; mafia wins as soon as it is at
    /// least as numerous as the civilians.
    pub fn check_win(&self) -> Option<Alignment> {
        let mafia = self.mafia_count();
        if mafia == 0 {
            return Some(Alignment::Civilian);
        }
        if mafia >= self.civilian_count() {
            return Some(Alignment::Mafia);
        }
        None
    }

    // ------------------------------------------------------------------
    // History

    /// Full, unredacted history.
    pub fn history(&self) -> &[RoundLog] {
        &self.history
    }

    /// Number of completed rounds.
    pub fn rounds_played(&self) -> usize {
        self.history.len()
    }

    /// History as `viewer` is allowed to see it.
    ///
    /// Built fresh on every call. Day sections are public; night kills are
    /// public; sheriff checks are kept for the sheriff only and don checks
    /// for the don only. An unknown viewer sees no private results.
    pub fn history_for(&self, viewer: PlayerId) -> Vec<RoundLog> {
        let role = self.participant(viewer).map(Participant::role);
        self.history.iter().map(|r| r.redacted_for(role)).collect()
    }

    /// Victim of the most recent night kill, if the last round had one.
    pub fn last_night_kill(&self) -> Option<PlayerId> {
        self.history.last()?.night.as_ref()?.kill
    }

    /// Day currently being played (0 before the first day).
    pub fn current_day(&self) -> u32 {
        self.current_day
    }

    /// Speeches given so far today.
    pub fn current_speeches(&self) -> &[SpeechLog] {
        &self.current_speeches
    }

    // ------------------------------------------------------------------
    // Rotation

    /// Id that opens the next day's speeches (or the first alive id after it).
    pub fn next_first_speaker(&self) -> PlayerId {
        self.next_first_speaker
    }

    /// Living participants in today's speaking order.
    ///
    /// Starts at the first living id at or after the rotation pointer and
    /// wraps around to the lowest ids.
    pub fn speaking_order(&self) -> Vec<PlayerId> {
        let alive = self.alive_ids();
        let start = alive
            .iter()
            .position(|&id| id >= self.next_first_speaker)
            .unwrap_or(0);
        alive[start..].iter().chain(&alive[..start]).copied().collect()
    }

    // ------------------------------------------------------------------
    // Faction knowledge

    /// Shared mafia knowledge, visible to mafia-aligned viewers only.
    pub fn faction_knowledge(&self, viewer: &Participant) -> Option<&FactionKnowledge> {
        viewer.role().is_mafia().then_some(&self.faction)
    }

    // ------------------------------------------------------------------
    // Engine-side mutation

    pub(crate) fn participant_mut(&mut self, id: PlayerId) -> Option<&mut Participant> {
        self.participants.get_mut(id)
    }

    pub(crate) fn eliminate(&mut self, id: PlayerId) {
        if let Some(p) = self.participant_mut(id) {
            p.eliminate();
        }
    }

    pub(crate) fn begin_day(&mut self, day: u32) {
        self.current_day = day;
        self.current_speeches.clear();
    }

    pub(crate) fn push_speech(&mut self, speech: SpeechLog) -> usize {
        self.current_speeches.push(speech);
        self.current_speeches.len() - 1
    }

    pub(crate) fn push_round(&mut self, round: RoundLog) {
        self.history.push(round);
    }

    /// Moves the rotation pointer past `first_speaker`.
    ///
    /// The new pointer is the lowest living id above `first_speaker`, or the
    /// lowest living id overall when there is none.
    pub(crate) fn advance_rotation(&mut self, first_speaker: PlayerId) {
        let alive = self.alive_ids();
        self.next_first_speaker = alive
            .iter()
            .copied()
            .find(|&id| id > first_speaker)
            .or_else(|| alive.first().copied())
            .unwrap_or(0);
    }

    pub(crate) fn record_known_sheriff(&mut self, sheriff: PlayerId) {
        self.faction.record_sheriff(sheriff);
    }
}
