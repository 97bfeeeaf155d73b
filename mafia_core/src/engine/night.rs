//! Night phase: the mafia kill, then investigations, then deferred deaths.
//!
//! Roles take part through their [`NightBehavior`](crate::roles::NightBehavior);
//! this module only knows about kill authority and investigation rank.

use super::RoundEngine;
use crate::actions::NightLog;
use crate::error::GameError;
use crate::events::{GameEvent, NightActionEvent};
use crate::participant::{Participant, PlayerId};
use crate::roles::{Investigation, KillAuthority};
use std::collections::BTreeMap;
use tracing::{debug, trace};

impl RoundEngine {
    /// Runs night `night` and returns its log.
    pub fn night_phase(&mut self, night: u32) -> Result<NightLog, GameError> {
        self.emit(GameEvent::NightStarted { night })?;
        let mut log = NightLog::default();

        // ====================================================================
        // KILL
        // ====================================================================

        let candidates = self.session.alive_ids();
        let target = self
            .choose_kill(&candidates)
            .filter(|id| candidates.contains(id));

        let mut deferred = None;
        if let Some(id) = target {
            let delayed = self
                .session
                .participant(id)
                .map_or(false, |p| p.role().night_behavior().delays_night_death());
            if delayed {
                deferred = Some(id);
            } else {
                self.session.eliminate(id);
            }
        }
        log.kill = target;
        debug!("Night {}: kill target {:?}", night, target);
        self.emit(GameEvent::NightAction {
            night,
            action: NightActionEvent::MafiaKill {
                target,
                success: target.is_some(),
            },
        })?;

        // ====================================================================
        // INVESTIGATIONS
        // ====================================================================

        let mut investigators: Vec<(u8, PlayerId)> = self
            .session
            .alive_participants()
            .filter_map(|p| {
                p.role()
                    .night_behavior()
                    .investigation_rank()
                    .map(|rank| (rank, p.id()))
            })
            .collect();
        investigators.sort_unstable();

        for (_, actor) in investigators {
            let Some(investigator) = self.session.participant(actor) else {
                continue;
            };
            let outcome = investigator
                .role()
                .night_behavior()
                .investigate(investigator, &self.session, target);

            match outcome {
                Some(Investigation::Don(result)) => {
                    log.don_check = Some(result);
                    self.emit(GameEvent::NightAction {
                        night,
                        action: NightActionEvent::DonCheck {
                            checker: result.checker,
                            target: result.target,
                            is_sheriff: result.is_sheriff,
                        },
                    })?;
                    if result.is_sheriff {
                        self.share_sheriff_identity(result.target);
                    }
                }
                Some(Investigation::Sheriff(result)) => {
                    log.sheriff_check = Some(result);
                    self.emit(GameEvent::NightAction {
                        night,
                        action: NightActionEvent::SheriffCheck {
                            checker: result.checker,
                            target: result.target,
                            is_mafia: result.is_mafia,
                        },
                    })?;
                }
                None => trace!("Night {}: no investigation by {}", night, actor),
            }
        }

        if let Some(id) = deferred {
            self.session.eliminate(id);
        }

        Ok(log)
    }

    /// Resolves tonight's kill target.
    ///
    /// A living don decides alone, even when it chooses nobody. Otherwise
    /// the most common suggestion among the living mafia wins, lowest id on
    /// a tie.
    fn choose_kill(&self, candidates: &[PlayerId]) -> Option<PlayerId> {
        let voters: Vec<(&Participant, KillAuthority)> = self
            .session
            .alive_participants()
            .map(|p| (p, p.role().night_behavior().kill_authority()))
            .filter(|(_, authority)| *authority != KillAuthority::None)
            .collect();

        if let Some((don, _)) = voters
            .iter()
            .find(|(_, authority)| *authority == KillAuthority::Decide)
        {
            return don
                .role()
                .night_behavior()
                .propose_kill(don, &self.session, candidates);
        }

        let mut tally: BTreeMap<PlayerId, usize> = BTreeMap::new();
        for (p, _) in &voters {
            if let Some(target) = p.role().night_behavior().propose_kill(p, &self.session, candidates) {
                *tally.entry(target).or_insert(0) += 1;
            }
        }

        let mut best: Option<(PlayerId, usize)> = None;
        for (target, count) in tally {
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((target, count));
            }
        }
        best.map(|(target, _)| target)
    }

    /// Stores a discovered sheriff in faction memory and tells every living
    /// mafia member.
    fn share_sheriff_identity(&mut self, sheriff: PlayerId) {
        self.session.record_known_sheriff(sheriff);
        for p in self.session.alive_participants() {
            if p.role().is_mafia() {
                p.learn_sheriff_identity(sheriff);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::RoundEngine;
    use crate::events::{EventKind, GameEvent, NightActionEvent};
    use crate::roles::Role;
    use crate::testing::{notes, roster, Scripted};
    use std::sync::{Arc, Mutex};

    fn engine(seats: Vec<(Role, Scripted)>) -> RoundEngine {
        RoundEngine::from_participants(roster(seats)).unwrap()
    }

    #[test]
    fn test_killed_sheriff_still_checks() {
        let notes = notes();
        let mut engine = engine(vec![
            (Role::Sheriff, Scripted::new().watches(0).noting(&notes)),
            (Role::Civilian, Scripted::new()),
            (Role::Don, Scripted::new().kills(0).checks(1)),
            (Role::Civilian, Scripted::new()),
        ]);

        let night = engine.night_phase(1).unwrap();

        assert_eq!(night.kill, Some(0));
        let check = night.sheriff_check.unwrap();
        assert_eq!(check.checker, 0);
        assert_eq!(check.target, 1);
        assert!(!check.is_mafia);
        assert!(!engine.session().is_alive(0));

        let notes = notes.lock().unwrap();
        assert_eq!(*notes, vec!["alive 0 true", "sheriff 1 false"]);
    }

    #[test]
    fn test_investigations_skip_kill_target() {
        let mut engine = engine(vec![
            (Role::Sheriff, Scripted::new()),
            (Role::Civilian, Scripted::new()),
            (Role::Don, Scripted::new().kills(0)),
            (Role::Civilian, Scripted::new()),
        ]);

        let night = engine.night_phase(1).unwrap();

        // First candidate for either investigator, minus self and victim
        assert_eq!(night.don_check.unwrap().target, 1);
        assert_eq!(night.sheriff_check.unwrap().target, 1);
    }

    #[test]
    fn test_civilian_dies_before_investigations() {
        let notes = notes();
        let mut engine = engine(vec![
            (Role::Sheriff, Scripted::new().watches(1).noting(&notes)),
            (Role::Civilian, Scripted::new()),
            (Role::Don, Scripted::new().kills(1)),
            (Role::Civilian, Scripted::new()),
        ]);

        engine.night_phase(1).unwrap();

        assert_eq!(notes.lock().unwrap().first().map(String::as_str), Some("alive 1 false"));
    }

    #[test]
    fn test_don_finding_sheriff_informs_mafia() {
        let notes = notes();
        let mut engine = engine(vec![
            (Role::Sheriff, Scripted::new()),
            (Role::Mafia, Scripted::new().noting(&notes)),
            (Role::Don, Scripted::new().checks(0)),
            (Role::Civilian, Scripted::new()),
        ]);

        let night = engine.night_phase(1).unwrap();

        let check = night.don_check.unwrap();
        assert_eq!((check.checker, check.target, check.is_sheriff), (2, 0, true));
        assert_eq!(*notes.lock().unwrap(), vec!["learned 0"]);

        let session = engine.session();
        let mafia = session.participant(1).unwrap();
        let knowledge = session.faction_knowledge(mafia).unwrap();
        assert_eq!(knowledge.known_sheriff(), Some(0));
        assert!(session.faction_knowledge(session.participant(3).unwrap()).is_none());
    }

    #[test]
    fn test_don_overrides_suggestions() {
        let mut engine = engine(vec![
            (Role::Civilian, Scripted::new()),
            (Role::Civilian, Scripted::new()),
            (Role::Mafia, Scripted::new().kills(0)),
            (Role::Don, Scripted::new()),
        ]);

        let night = engine.night_phase(1).unwrap();

        // The don chose nobody
        assert_eq!(night.kill, None);
        assert!(engine.session().is_alive(0));
    }

    #[test]
    fn test_suggestion_tie_goes_to_lowest_id() {
        let mut engine = engine(vec![
            (Role::Civilian, Scripted::new()),
            (Role::Civilian, Scripted::new()),
            (Role::Civilian, Scripted::new()),
            (Role::Mafia, Scripted::new().kills(2)),
            (Role::Mafia, Scripted::new().kills(1)),
        ]);

        let night = engine.night_phase(1).unwrap();

        assert_eq!(night.kill, Some(1));
    }

    #[test]
    fn test_mafia_decides_after_don_dies() {
        let mut engine = engine(vec![
            (Role::Sheriff, Scripted::new().checks(1)),
            (Role::Mafia, Scripted::new().kills(3)),
            (Role::Don, Scripted::new().kills(0).checks(3)),
            (Role::Civilian, Scripted::new()),
        ]);
        engine.session.eliminate(2);

        let night = engine.night_phase(1).unwrap();

        assert_eq!(night.kill, Some(3));
        assert!(night.don_check.is_none());
        assert!(night.sheriff_check.unwrap().is_mafia);
    }

    #[test]
    fn test_invalid_kill_target_is_discarded() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut engine = engine(vec![
            (Role::Civilian, Scripted::new()),
            (Role::Civilian, Scripted::new()),
            (Role::Don, Scripted::new().kills(9)),
        ]);
        let sink = Arc::clone(&events);
        engine.subscribe(EventKind::NightAction, move |e| {
            sink.lock().unwrap().push(e.clone());
            Ok(())
        });

        let night = engine.night_phase(1).unwrap();

        assert_eq!(night.kill, None);
        let events = events.lock().unwrap();
        assert!(matches!(
            &events[0],
            GameEvent::NightAction {
                action: NightActionEvent::MafiaKill { target: None, success: false },
                ..
            }
        ));
    }
}
