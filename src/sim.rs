use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::keyboard::char_for_keystroke;
use crate::surface::{Key, KeyEvent, KeyPhase, SurfaceLocator, TargetSurface};
use crate::CadenceError;

#[derive(Debug, Default, Clone)]
struct SimEditorState {
    buf: Vec<char>,
    cursor: usize,
    shift_down: bool,
    reject_characters: bool,
    events: Vec<KeyEvent>,
}

impl SimEditorState {
    fn insert_char(&mut self, c: char) {
        self.buf.insert(self.cursor, c);
        self.cursor += 1;
    }

    fn as_string(&self) -> String {
        self.buf.iter().collect()
    }

    fn check_accepts_input(&self) -> crate::Result<()> {
        if self.reject_characters {
            return Err(CadenceError::surface("simulated editor rejected input"));
        }
        Ok(())
    }

    fn apply_key(&mut self, event: &KeyEvent) -> crate::Result<()> {
        match (event.key, event.phase) {
            (Key::Shift, KeyPhase::Down) => self.shift_down = true,
            (Key::Shift, KeyPhase::Up) => self.shift_down = false,
            (Key::Shift, KeyPhase::Press) => {}
            (Key::Enter, phase) => {
                self.check_accepts_input()?;
                if phase == KeyPhase::Down {
                    self.insert_char('\n');
                }
            }
            (Key::Char(c), phase) => {
                self.check_accepts_input()?;
                if phase == KeyPhase::Press {
                    // Like a real editor, the produced character follows the keycode
                    // and the shift state, not the label on the event.
                    let produced = char_for_keystroke(event.keycode, self.shift_down).unwrap_or(c);
                    self.insert_char(produced);
                }
            }
        }
        Ok(())
    }
}

/// In-memory editor used for dry runs and tests.
///
/// Clones share the same buffer, so a test can keep one handle while the
/// controller owns another.
#[derive(Debug, Default, Clone)]
pub struct SimSurface {
    state: Arc<Mutex<SimEditorState>>,
}

impl SimSurface {
    fn lock(&self) -> MutexGuard<'_, SimEditorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn text(&self) -> String {
        self.lock().as_string()
    }

    pub fn events(&self) -> Vec<KeyEvent> {
        self.lock().events.clone()
    }

    pub fn shift_held(&self) -> bool {
        self.lock().shift_down
    }

    /// Make every character-producing input fail, as a surface rejecting
    /// synthetic input would.
    pub fn reject_characters(&self, reject: bool) {
        self.lock().reject_characters = reject;
    }
}

impl TargetSurface for SimSurface {
    fn insert_text(&mut self, text: &str) -> crate::Result<()> {
        let mut state = self.lock();
        state.check_accepts_input()?;
        for c in text.chars() {
            state.insert_char(c);
        }
        Ok(())
    }

    fn insert_line_break(&mut self) -> crate::Result<()> {
        let mut state = self.lock();
        state.check_accepts_input()?;
        state.insert_char('\n');
        Ok(())
    }

    fn dispatch_key(&mut self, event: &KeyEvent) -> crate::Result<()> {
        let mut state = self.lock();
        state.apply_key(event)?;
        state.events.push(*event);
        Ok(())
    }
}

/// Switch shared between a test and a [`SimLocator`] it handed away.
#[derive(Debug, Clone)]
pub struct Availability(Arc<AtomicBool>);

impl Availability {
    pub fn set(&self, available: bool) {
        self.0.store(available, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct SimLocator {
    surface: SimSurface,
    available: Availability,
}

impl SimLocator {
    pub fn new(surface: SimSurface) -> Self {
        Self {
            surface,
            available: Availability(Arc::new(AtomicBool::new(true))),
        }
    }

    pub fn availability(&self) -> Availability {
        self.available.clone()
    }
}

impl SurfaceLocator for SimLocator {
    fn locate(&mut self) -> Option<&mut dyn TargetSurface> {
        if !self.available.get() {
            return None;
        }
        Some(&mut self.surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::{KEY_A, KEY_LEFTSHIFT};

    fn key(phase: KeyPhase, key: Key, keycode: u32, shift: bool) -> KeyEvent {
        KeyEvent {
            phase,
            key,
            keycode,
            shift,
            time_ms: 0,
        }
    }

    #[test]
    fn character_follows_shift_state() {
        let mut surface = SimSurface::default();

        surface
            .dispatch_key(&key(KeyPhase::Press, Key::Char('a'), KEY_A, false))
            .unwrap();
        surface
            .dispatch_key(&key(KeyPhase::Down, Key::Shift, KEY_LEFTSHIFT, true))
            .unwrap();
        surface
            .dispatch_key(&key(KeyPhase::Press, Key::Char('a'), KEY_A, false))
            .unwrap();
        surface
            .dispatch_key(&key(KeyPhase::Up, Key::Shift, KEY_LEFTSHIFT, false))
            .unwrap();

        assert_eq!(surface.text(), "aA");
        assert!(!surface.shift_held());
    }

    #[test]
    fn rejected_input_leaves_buffer_untouched() {
        let mut surface = SimSurface::default();
        surface.reject_characters(true);

        assert!(surface.insert_text("x").is_err());
        assert!(surface.insert_line_break().is_err());
        assert_eq!(surface.text(), "");

        surface.reject_characters(false);
        surface.insert_text("ok").unwrap();
        assert_eq!(surface.text(), "ok");
    }

    #[test]
    fn locator_honours_availability() {
        let mut locator = SimLocator::new(SimSurface::default());
        assert!(locator.locate().is_some());
        locator.availability().set(false);
        assert!(locator.locate().is_none());
    }
}
