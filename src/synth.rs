//! Character delivery strategies.
//!
//! A synthesizer turns one character into the interaction(s) a target surface
//! receives. Two strategies exist and are chosen by configuration:
//!
//! - [`CommandSynthesizer`] issues one native "insert text" (or "insert line
//!   break") command per character.
//! - [`KeySequenceSynthesizer`] dispatches `keydown → keypress → keyup`, wrapped
//!   in Shift down/up when the character needs it; a newline is an Enter
//!   down/up pair.
//!
//! Both refuse to touch the surface unless the session is Running at the moment
//! of delivery, and both turn surface errors into [`Delivery::Failed`].

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::keyboard::{keystroke_for_output_char, KEY_ENTER, KEY_LEFTSHIFT};
use crate::model::SessionState;
use crate::surface::{Key, KeyEvent, KeyPhase, SurfaceLocator, TargetSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStrategy {
    #[default]
    Command,
    KeySequence,
}

impl DeliveryStrategy {
    pub fn synthesizer(self) -> Box<dyn EventSynthesizer> {
        match self {
            DeliveryStrategy::Command => Box::new(CommandSynthesizer),
            DeliveryStrategy::KeySequence => Box::new(KeySequenceSynthesizer::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The session was not Running; nothing was sent.
    Refused,
    /// The locator found no surface.
    Unavailable,
    /// The surface rejected the input or the character cannot be expressed.
    Failed,
}

pub trait EventSynthesizer: Send {
    fn deliver(
        &mut self,
        ch: char,
        state: SessionState,
        locator: &mut dyn SurfaceLocator,
    ) -> Delivery;
}

fn locate<'a>(
    ch: char,
    state: SessionState,
    locator: &'a mut dyn SurfaceLocator,
) -> Result<&'a mut dyn TargetSurface, Delivery> {
    if state != SessionState::Running {
        debug!(?ch, ?state, "delivery refused");
        return Err(Delivery::Refused);
    }
    locator.locate().ok_or(Delivery::Unavailable)
}

fn outcome(ch: char, result: crate::Result<()>) -> Delivery {
    match result {
        Ok(()) => Delivery::Delivered,
        Err(err) => {
            warn!(?ch, "delivery failed: {err}");
            Delivery::Failed
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CommandSynthesizer;

impl EventSynthesizer for CommandSynthesizer {
    fn deliver(
        &mut self,
        ch: char,
        state: SessionState,
        locator: &mut dyn SurfaceLocator,
    ) -> Delivery {
        let surface = match locate(ch, state, locator) {
            Ok(surface) => surface,
            Err(delivery) => return delivery,
        };

        let result = if ch == '\n' {
            surface.insert_line_break()
        } else {
            surface.insert_text(ch.encode_utf8(&mut [0u8; 4]))
        };
        outcome(ch, result)
    }
}

/// Shift brackets every character the US layout types with Shift held: upper-case
/// letters and shifted symbols such as `!`, `?` and `"`.
#[derive(Debug, Clone)]
pub struct KeySequenceSynthesizer {
    origin: Instant,
}

impl Default for KeySequenceSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySequenceSynthesizer {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    fn event(&self, phase: KeyPhase, key: Key, keycode: u32, shift: bool) -> KeyEvent {
        KeyEvent {
            phase,
            key,
            keycode,
            shift,
            time_ms: self.origin.elapsed().as_millis().try_into().unwrap_or(u32::MAX),
        }
    }

    fn type_enter(&self, surface: &mut dyn TargetSurface) -> crate::Result<()> {
        surface.dispatch_key(&self.event(KeyPhase::Down, Key::Enter, KEY_ENTER, false))?;
        surface.dispatch_key(&self.event(KeyPhase::Up, Key::Enter, KEY_ENTER, false))
    }

    fn type_printable(
        &self,
        surface: &mut dyn TargetSurface,
        typed: char,
        keycode: u32,
        shift: bool,
    ) -> crate::Result<()> {
        if shift {
            surface.dispatch_key(&self.event(KeyPhase::Down, Key::Shift, KEY_LEFTSHIFT, true))?;
        }

        let result = [KeyPhase::Down, KeyPhase::Press, KeyPhase::Up]
            .into_iter()
            .try_for_each(|phase| {
                surface.dispatch_key(&self.event(phase, Key::Char(typed), keycode, shift))
            });

        if shift {
            let release = self.event(KeyPhase::Up, Key::Shift, KEY_LEFTSHIFT, false);
            match &result {
                Ok(()) => surface.dispatch_key(&release)?,
                // Never leave Shift held after a partial sequence.
                Err(_) => {
                    let _ = surface.dispatch_key(&release);
                }
            }
        }

        result
    }
}

impl EventSynthesizer for KeySequenceSynthesizer {
    fn deliver(
        &mut self,
        ch: char,
        state: SessionState,
        locator: &mut dyn SurfaceLocator,
    ) -> Delivery {
        let surface = match locate(ch, state, locator) {
            Ok(surface) => surface,
            Err(delivery) => return delivery,
        };

        let Some(stroke) = keystroke_for_output_char(ch) else {
            warn!(?ch, "no key on a US layout types this character");
            return Delivery::Failed;
        };

        let result = if ch == '\n' {
            self.type_enter(surface)
        } else {
            let typed = crate::keyboard::typed_char_for_output_char(ch).unwrap_or(ch);
            self.type_printable(surface, typed, stroke.keycode, stroke.shift)
        };
        outcome(ch, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimLocator, SimSurface};

    fn phases(surface: &SimSurface) -> Vec<(KeyPhase, Key, bool)> {
        surface
            .events()
            .into_iter()
            .map(|e| (e.phase, e.key, e.shift))
            .collect()
    }

    #[test]
    fn upper_case_is_bracketed_by_shift() {
        let surface = SimSurface::default();
        let mut locator = SimLocator::new(surface.clone());
        let mut synth = KeySequenceSynthesizer::new();

        let delivery = synth.deliver('H', SessionState::Running, &mut locator);

        assert_eq!(delivery, Delivery::Delivered);
        assert_eq!(
            phases(&surface),
            vec![
                (KeyPhase::Down, Key::Shift, true),
                (KeyPhase::Down, Key::Char('H'), true),
                (KeyPhase::Press, Key::Char('H'), true),
                (KeyPhase::Up, Key::Char('H'), true),
                (KeyPhase::Up, Key::Shift, false),
            ]
        );
        assert_eq!(surface.text(), "H");
    }

    #[test]
    fn shifted_symbols_are_bracketed_by_shift() {
        let surface = SimSurface::default();
        let mut locator = SimLocator::new(surface.clone());
        let mut synth = KeySequenceSynthesizer::new();

        synth.deliver('!', SessionState::Running, &mut locator);

        let keys: Vec<_> = phases(&surface).into_iter().map(|(_, key, _)| key).collect();
        assert_eq!(
            keys,
            vec![Key::Shift, Key::Char('!'), Key::Char('!'), Key::Char('!'), Key::Shift]
        );
        assert_eq!(surface.text(), "!");
        assert!(!surface.shift_held());
    }

    #[test]
    fn lower_case_has_no_modifier() {
        let surface = SimSurface::default();
        let mut locator = SimLocator::new(surface.clone());
        let mut synth = KeySequenceSynthesizer::new();

        synth.deliver('i', SessionState::Running, &mut locator);

        assert_eq!(
            phases(&surface),
            vec![
                (KeyPhase::Down, Key::Char('i'), false),
                (KeyPhase::Press, Key::Char('i'), false),
                (KeyPhase::Up, Key::Char('i'), false),
            ]
        );
    }

    #[test]
    fn newline_is_an_enter_pair() {
        let surface = SimSurface::default();
        let mut locator = SimLocator::new(surface.clone());
        let mut synth = KeySequenceSynthesizer::new();

        synth.deliver('\n', SessionState::Running, &mut locator);

        assert_eq!(
            phases(&surface),
            vec![
                (KeyPhase::Down, Key::Enter, false),
                (KeyPhase::Up, Key::Enter, false),
            ]
        );
        assert_eq!(surface.text(), "\n");
    }

    #[test]
    fn refuses_unless_running() {
        let surface = SimSurface::default();
        let mut locator = SimLocator::new(surface.clone());

        for state in [
            SessionState::Paused,
            SessionState::Stopped,
            SessionState::Idle,
            SessionState::Completed,
        ] {
            assert_eq!(
                CommandSynthesizer.deliver('a', state, &mut locator),
                Delivery::Refused
            );
            assert_eq!(
                KeySequenceSynthesizer::new().deliver('a', state, &mut locator),
                Delivery::Refused
            );
        }
        assert!(surface.events().is_empty());
        assert_eq!(surface.text(), "");
    }

    #[test]
    fn missing_surface_is_unavailable() {
        let surface = SimSurface::default();
        let mut locator = SimLocator::new(surface.clone());
        locator.availability().set(false);

        assert_eq!(
            CommandSynthesizer.deliver('a', SessionState::Running, &mut locator),
            Delivery::Unavailable
        );
    }

    #[test]
    fn surface_errors_become_failed_and_release_shift() {
        let surface = SimSurface::default();
        surface.reject_characters(true);
        let mut locator = SimLocator::new(surface.clone());

        let delivery = KeySequenceSynthesizer::new().deliver('Q', SessionState::Running, &mut locator);

        assert_eq!(delivery, Delivery::Failed);
        assert!(!surface.shift_held());
        assert_eq!(
            CommandSynthesizer.deliver('q', SessionState::Running, &mut locator),
            Delivery::Failed
        );
    }

    #[test]
    fn untypable_characters_fail_only_for_key_sequences() {
        let surface = SimSurface::default();
        let mut locator = SimLocator::new(surface.clone());

        assert_eq!(
            KeySequenceSynthesizer::new().deliver('é', SessionState::Running, &mut locator),
            Delivery::Failed
        );
        assert_eq!(
            CommandSynthesizer.deliver('é', SessionState::Running, &mut locator),
            Delivery::Delivered
        );
        assert_eq!(surface.text(), "é");
    }

    #[test]
    fn smart_quotes_are_typed_as_ascii() {
        let surface = SimSurface::default();
        let mut locator = SimLocator::new(surface.clone());

        KeySequenceSynthesizer::new().deliver('’', SessionState::Running, &mut locator);

        assert_eq!(surface.text(), "'");
    }
}
