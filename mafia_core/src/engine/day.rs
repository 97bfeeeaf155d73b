//! Day phase: speeches, nominations, voting and tie escalation.
//!
//! ```text
//! POSTHUMOUS_SPEECH? → SPEECHES → VOTE ─┬─ single leader ─────────────┐
//!                                       └─ tie → TIE_SPEECHES → REVOTE │
//!                                            ├─ narrower tie: repeat   │
//!                                            └─ same tie → MASS_VOTE ──┤
//!                                                                      ▼
//!                                              LAST_WORDS → ROTATION UPDATE
//! ```

use super::RoundEngine;
use crate::actions::{DayLog, SpeechLog, Vote};
use crate::error::GameError;
use crate::events::GameEvent;
use crate::participant::PlayerId;
use std::collections::BTreeSet;
use tracing::{debug, trace};

impl RoundEngine {
    /// Runs the day phase of round `day` and returns its log.
    pub fn day_phase(&mut self, day: u32) -> Result<DayLog, GameError> {
        self.emit(GameEvent::DayStarted { day })?;
        self.session.begin_day(day);

        // Last night's victim opens the day but cannot nominate
        if let Some(victim) = self.session.last_night_kill() {
            if let Some(p) = self.session.participant(victim) {
                let action = p.last_words(&self.session).without_nomination();
                self.add_speech(day, SpeechLog::new(victim, action))?;
            }
        }

        let order = self.session.speaking_order();
        let mut nominations: Vec<PlayerId> = Vec::new();
        for &id in &order {
            let action = self.living(id)?.speak(&self.session);
            if let Some(target) = action.nomination {
                if self.session.is_alive(target) && !nominations.contains(&target) {
                    nominations.push(target);
                }
            }
            self.add_speech(day, SpeechLog::new(id, action))?;
        }
        debug!("Day {}: nominations {:?}", day, nominations);

        let mut votes = Vec::new();
        let eliminated = if day == 1 && nominations.len() == 1 {
            debug!("Day 1 with a single nomination: no vote");
            Vec::new()
        } else {
            self.run_vote(day, &nominations, &mut votes)?
        };

        if eliminated.is_empty() {
            self.emit(GameEvent::NoElimination { day })?;
        } else {
            for &id in &eliminated {
                self.session.eliminate(id);
            }
            self.emit(GameEvent::PlayersEliminated {
                day,
                ids: eliminated.clone(),
            })?;
            for &id in &eliminated {
                if let Some(p) = self.session.participant(id) {
                    let action = p.last_words(&self.session).without_nomination();
                    self.add_speech(day, SpeechLog::new(id, action))?;
                }
            }
        }

        if let Some(&first) = order.first() {
            self.session.advance_rotation(first);
        }

        Ok(DayLog {
            speeches: self.session.current_speeches().to_vec(),
            votes,
            eliminated,
        })
    }

    /// Voting loop with tie escalation. Returns the eliminated ids in
    /// nomination order.
    fn run_vote(
        &mut self,
        day: u32,
        nominations: &[PlayerId],
        votes: &mut Vec<Vote>,
    ) -> Result<Vec<PlayerId>, GameError> {
        if nominations.is_empty() {
            for voter in self.session.alive_ids() {
                votes.push(Vote { voter, target: None });
                self.emit(GameEvent::VoteCast {
                    day,
                    voter_id: voter,
                    target_id: None,
                })?;
            }
            return Ok(Vec::new());
        }

        let mut candidates = nominations.to_vec();
        let mut previous_tie: Option<BTreeSet<PlayerId>> = None;

        loop {
            let counts = self.cast_votes(day, &candidates, votes)?;
            let max = counts.iter().copied().max().unwrap_or(0);
            let top: Vec<PlayerId> = candidates
                .iter()
                .zip(&counts)
                .filter(|(_, &count)| count == max)
                .map(|(&id, _)| id)
                .collect();

            if top.len() == 1 {
                return Ok(top);
            }
            debug!("Day {}: tie between {:?}", day, top);

            // Tied nominees get one more speech each
            for &id in nominations.iter().filter(|id| top.contains(id)) {
                let action = self.living(id)?.speak(&self.session).without_nomination();
                self.add_speech(day, SpeechLog::new(id, action))?;
            }

            let tie: BTreeSet<PlayerId> = top.iter().copied().collect();
            if previous_tie.as_ref() == Some(&tie) {
                return self.mass_elimination_vote(day, top);
            }
            previous_tie = Some(tie);
            candidates = top;
        }
    }

    /// One voting round over `candidates`; returns the tally in candidate
    /// order. Votes naming anything but a candidate go to the last candidate.
    fn cast_votes(
        &mut self,
        day: u32,
        candidates: &[PlayerId],
        votes: &mut Vec<Vote>,
    ) -> Result<Vec<usize>, GameError> {
        let mut counts = vec![0usize; candidates.len()];
        let last = candidates.len() - 1;

        for voter in self.session.alive_ids() {
            let choice = self.living(voter)?.vote(&self.session, candidates);
            let slot = choice
                .and_then(|target| candidates.iter().position(|&c| c == target))
                .unwrap_or(last);
            if choice != Some(candidates[slot]) {
                trace!("Vote of {} forced onto {}", voter, candidates[slot]);
            }
            counts[slot] += 1;

            let target = candidates[slot];
            votes.push(Vote { voter, target: Some(target) });
            self.emit(GameEvent::VoteCast {
                day,
                voter_id: voter,
                target_id: Some(target),
            })?;
        }
        Ok(counts)
    }

    /// Yes/no vote on removing every tied candidate at once. A strict
    /// majority of the living is needed.
    fn mass_elimination_vote(
        &mut self,
        day: u32,
        tied: Vec<PlayerId>,
    ) -> Result<Vec<PlayerId>, GameError> {
        let voters = self.session.alive_ids();
        let mut yes = 0;
        for &voter in &voters {
            if self.living(voter)?.vote_on_mass_elimination(&self.session, &tied) {
                yes += 1;
            }
        }
        debug!(
            "Day {}: {} of {} vote to eliminate {:?}",
            day,
            yes,
            voters.len(),
            tied
        );

        if yes * 2 > voters.len() {
            Ok(tied)
        } else {
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::{NightLog, RoundLog, SheriffClaim};
    use crate::engine::RoundEngine;
    use crate::roles::Role;
    use crate::testing::{roster, Scripted};

    fn engine(seats: Vec<(Role, Scripted)>) -> RoundEngine {
        RoundEngine::from_participants(roster(seats)).unwrap()
    }

    fn alive(engine: &RoundEngine) -> Vec<bool> {
        engine
            .session()
            .participants()
            .iter()
            .map(|p| p.is_alive())
            .collect()
    }

    #[test]
    fn test_players_cannot_abstain_when_candidates_exist() {
        let mut engine = engine(vec![
            (Role::Civilian, Scripted::new().nominates(1)),
            (Role::Civilian, Scripted::new()),
        ]);

        // Day 2 so the single-nomination skip does not apply
        let day = engine.day_phase(2).unwrap();

        assert_eq!(day.votes.len(), 2);
        assert!(day.votes.iter().all(|v| v.target == Some(1)));
        assert_eq!(day.eliminated, vec![1]);
    }

    #[test]
    fn test_abstaining_vote_defaults_to_last_nominee() {
        let mut engine = engine(vec![
            (Role::Civilian, Scripted::new().nominates(1)),
            (Role::Civilian, Scripted::new().nominates(2)),
            (Role::Civilian, Scripted::new()),
        ]);

        let day = engine.day_phase(1).unwrap();

        assert!(day.votes.iter().all(|v| v.target == Some(2)));
        assert_eq!(day.eliminated, vec![2]);
        assert!(!engine.session().is_alive(2));
    }

    #[test]
    fn test_single_nomination_first_day_skips_vote() {
        let mut engine = engine(vec![
            (Role::Civilian, Scripted::new().nominates(1).votes_for(1)),
            (Role::Civilian, Scripted::new().votes_for(1)),
        ]);

        let day = engine.day_phase(1).unwrap();

        assert!(day.votes.is_empty());
        assert!(day.eliminated.is_empty());
        assert_eq!(alive(&engine), vec![true, true]);
    }

    #[test]
    fn test_no_nominations_records_abstentions() {
        let mut engine = engine(vec![
            (Role::Civilian, Scripted::new()),
            (Role::Civilian, Scripted::new()),
            (Role::Mafia, Scripted::new()),
        ]);

        let day = engine.day_phase(1).unwrap();

        assert_eq!(day.votes.len(), 3);
        assert!(day.votes.iter().all(|v| v.target.is_none()));
        assert!(day.eliminated.is_empty());
    }

    #[test]
    fn test_nominations_ignore_unknown_and_duplicates() {
        let mut engine = engine(vec![
            (Role::Civilian, Scripted::new().nominates(2).votes_for(2)),
            (Role::Civilian, Scripted::new().nominates(2).votes_for(2)),
            (Role::Civilian, Scripted::new().nominates(7).votes_for(2)),
        ]);

        let day = engine.day_phase(1).unwrap();

        // One distinct valid nomination on day 1: no vote
        assert_eq!(day.nomination_count(), 3);
        assert!(day.votes.is_empty());
    }

    fn tie_roster(mass: [bool; 4]) -> Vec<(Role, Scripted)> {
        vec![
            (Role::Civilian, Scripted::new().nominates(1).votes_for(1).mass(mass[0])),
            (Role::Civilian, Scripted::new().nominates(2).votes_for(2).mass(mass[1])),
            (Role::Civilian, Scripted::new().nominates(1).votes_for(1).mass(mass[2])),
            (Role::Civilian, Scripted::new().votes_for(2).mass(mass[3])),
        ]
    }

    #[test]
    fn test_tied_candidates_eliminated_after_majority() {
        let mut engine = engine(tie_roster([true, false, true, true]));

        let day = engine.day_phase(1).unwrap();

        assert_eq!(day.eliminated, vec![1, 2]);
        assert_eq!(alive(&engine), vec![true, false, false, true]);
        assert_eq!(day.votes.len(), 8);
    }

    #[test]
    fn test_tied_candidates_spared_without_majority() {
        let mut engine = engine(tie_roster([false, false, true, false]));

        let day = engine.day_phase(1).unwrap();

        assert!(day.eliminated.is_empty());
        assert_eq!(alive(&engine), vec![true; 4]);
        assert_eq!(day.votes.len(), 8);
    }

    #[test]
    fn test_half_is_not_a_majority() {
        let mut engine = engine(tie_roster([true, false, true, false]));

        let day = engine.day_phase(1).unwrap();

        assert!(day.eliminated.is_empty());
    }

    #[test]
    fn test_tie_speeches_follow_nomination_order() {
        let mut engine = engine(tie_roster([false; 4]));

        let day = engine.day_phase(1).unwrap();

        let speakers: Vec<_> = day.speeches.iter().map(|s| s.speaker).collect();
        // Four regular speeches, then two rounds of tie speeches
        assert_eq!(speakers, vec![0, 1, 2, 3, 1, 2, 1, 2]);
        assert!(day.speeches[4..].iter().all(|s| s.action.nomination.is_none()));
    }

    #[test]
    fn test_revote_until_stable_tie() {
        let mut engine = engine(vec![
            (Role::Civilian, Scripted::new().nominates(1).votes_for(1).mass(true)),
            (Role::Civilian, Scripted::new().nominates(2).votes_for(2)),
            (
                Role::Civilian,
                Scripted::new().nominates(3).votes(&[Some(3), Some(1), Some(1)]),
            ),
            (Role::Civilian, Scripted::new().votes_for(1).mass(true)),
            (Role::Civilian, Scripted::new().votes_for(2).mass(true)),
            (
                Role::Civilian,
                Scripted::new().votes(&[Some(3), Some(2), Some(2)]).mass(true),
            ),
        ]);

        let day = engine.day_phase(1).unwrap();

        // Three-way tie, then the same two-way tie twice
        assert_eq!(day.votes.len(), 18);
        assert_eq!(day.eliminated, vec![1, 2]);
        assert!(!engine.session().is_alive(1));
        assert!(!engine.session().is_alive(2));
        assert!(engine.session().is_alive(3));
    }

    #[test]
    fn test_eliminated_players_give_last_words() {
        let claim = SheriffClaim::new(1, 0, true);
        let mut engine = engine(vec![
            (Role::Civilian, Scripted::new().nominates(1).votes_for(1)),
            (Role::Sheriff, Scripted::new().nominates(0).votes_for(1).claims(claim.clone())),
            (Role::Civilian, Scripted::new().votes_for(1)),
        ]);

        let day = engine.day_phase(1).unwrap();

        assert_eq!(day.eliminated, vec![1]);
        let last = day.speeches.last().unwrap();
        assert_eq!(last.speaker, 1);
        assert_eq!(last.action.nomination, None);
        assert_eq!(last.action.claims, vec![claim]);
    }

    #[test]
    fn test_night_victim_speaks_next_day() {
        let mut engine = engine(vec![
            (Role::Civilian, Scripted::new().nominates(2)),
            (Role::Don, Scripted::new().kills(0)),
            (Role::Civilian, Scripted::new()),
            (Role::Civilian, Scripted::new()),
        ]);

        let day1 = engine.day_phase(1).unwrap();
        let night1 = engine.night_phase(1).unwrap();
        assert_eq!(night1.kill, Some(0));
        engine.record_round(RoundLog { day: day1, night: Some(night1) });

        let day2 = engine.day_phase(2).unwrap();

        assert_eq!(day2.speeches[0].speaker, 0);
        assert_eq!(day2.speeches[0].action.nomination, None);
        // The dead victim does not speak again in the regular round
        assert_eq!(day2.speeches.iter().filter(|s| s.speaker == 0).count(), 1);
    }

    #[test]
    fn test_speaking_order_rotates_each_day() {
        let mut engine = engine(vec![
            (Role::Civilian, Scripted::new()),
            (Role::Civilian, Scripted::new()),
            (Role::Civilian, Scripted::new()),
            (Role::Mafia, Scripted::new()),
        ]);

        let first: Vec<_> = engine.day_phase(1).unwrap().speeches.iter().map(|s| s.speaker).collect();
        engine.record_round(RoundLog {
            day: Default::default(),
            night: Some(NightLog::default()),
        });
        let second: Vec<_> = engine.day_phase(2).unwrap().speeches.iter().map(|s| s.speaker).collect();

        assert_eq!(first, vec![0, 1, 2, 3]);
        assert_eq!(second, vec![1, 2, 3, 0]);
        assert_eq!(engine.session().next_first_speaker(), 2);
    }
}
