//! Human-readable game log.
//!
//! [`EventRenderer`] turns every engine event into one line of text and sends
//! it to `tracing` (when echo is on) and to an optional log file.

use mafia_core::{EventBus, GameEvent, NightActionEvent, PlayerId, SheriffClaim, SpeechLog};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Renders events as text lines.
#[derive(Debug, Clone, Default)]
pub struct EventRenderer {
    file: Option<Arc<Mutex<File>>>,
    echo: bool,
}

impl EventRenderer {
    /// A renderer that writes nowhere until configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also writes every line to `path`, truncating it first.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> io::Result<Self> {
        self.file = Some(Arc::new(Mutex::new(File::create(path)?)));
        Ok(self)
    }

    /// Emits every line through `tracing` at info level.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn is_active(&self) -> bool {
        self.echo || self.file.is_some()
    }

    /// Writes one line to every configured sink.
    pub fn log_line(&self, line: &str) -> io::Result<()> {
        if self.echo {
            info!("{}", line);
        }
        if let Some(file) = &self.file {
            let mut file = file
                .lock()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
            writeln!(file, "{}", line)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Subscribes the renderer to every event on `bus`.
    ///
    /// A write failure is returned from the handler and aborts the game.
    pub fn attach(&self, bus: &mut EventBus) {
        let renderer = self.clone();
        bus.subscribe_all(move |event| {
            renderer.log_line(&render(event))?;
            Ok(())
        });
    }
}

/// One line describing `event`.
pub fn render(event: &GameEvent) -> String {
    match event {
        GameEvent::GameStarted {
            mafia_ids,
            don_id,
            sheriff_id,
        } => format!(
            "Game started: mafia [{}], don {}, sheriff {}",
            join(mafia_ids),
            optional(*don_id),
            optional(*sheriff_id)
        ),
        GameEvent::DayStarted { day } => format!("Day {} begins", day),
        GameEvent::NightStarted { night } => format!("Night {} begins", night),
        GameEvent::SpeechAdded { speech, .. } => render_speech(speech),
        GameEvent::VoteCast {
            voter_id,
            target_id: Some(target),
            ..
        } => format!("Player {} votes for {}", voter_id, target),
        GameEvent::VoteCast { voter_id, .. } => format!("Player {} abstains", voter_id),
        GameEvent::NightAction { action, .. } => match action {
            NightActionEvent::MafiaKill {
                target: Some(target),
                success: true,
            } => format!("Mafia kill player {}", target),
            NightActionEvent::MafiaKill { .. } => "Mafia kill nobody".to_string(),
            NightActionEvent::DonCheck {
                checker,
                target,
                is_sheriff,
            } => format!(
                "Don {} checks {}: {}",
                checker,
                target,
                if *is_sheriff { "sheriff" } else { "not sheriff" }
            ),
            NightActionEvent::SheriffCheck {
                checker,
                target,
                is_mafia,
            } => format!(
                "Sheriff {} checks {}: {}",
                checker,
                target,
                if *is_mafia { "mafia" } else { "civilian" }
            ),
        },
        GameEvent::PlayersEliminated { day, ids } => {
            format!("Day {}: eliminated {}", day, join(ids))
        }
        GameEvent::NoElimination { day } => format!("Day {}: nobody eliminated", day),
        GameEvent::GameEnded { winner, rounds } => {
            format!("{} wins after {} rounds", winner, rounds)
        }
    }
}

fn render_speech(speech: &SpeechLog) -> String {
    let claims = speech
        .action
        .claims
        .iter()
        .map(render_claim)
        .collect::<Vec<_>>()
        .join(", ");

    match (speech.action.nomination, claims.is_empty()) {
        (Some(target), true) => format!("Player {} nominates {}", speech.speaker, target),
        (Some(target), false) => format!(
            "Player {} nominates {} and claims {}",
            speech.speaker, target, claims
        ),
        (None, false) => format!("Player {} claims {}", speech.speaker, claims),
        (None, true) => format!("Player {} has no claims", speech.speaker),
    }
}

fn render_claim(claim: &SheriffClaim) -> String {
    format!(
        "{} is {}",
        claim.target,
        if claim.is_mafia { "mafia" } else { "civilian" }
    )
}

fn join(ids: &[PlayerId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn optional(id: Option<PlayerId>) -> String {
    id.map_or_else(|| "none".to_string(), |id| id.to_string())
}
