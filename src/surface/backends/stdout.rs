//! Dry-run surface: characters go to stdout instead of an editor.

use std::io::{self, Write};

use crate::surface::{Key, KeyEvent, KeyPhase, SurfaceLocator, TargetSurface};

#[derive(Debug, Default)]
pub struct StdoutSurface;

impl StdoutSurface {
    fn write(&mut self, text: &str) -> crate::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

impl TargetSurface for StdoutSurface {
    fn insert_text(&mut self, text: &str) -> crate::Result<()> {
        self.write(text)
    }

    fn insert_line_break(&mut self) -> crate::Result<()> {
        self.write("\n")
    }

    fn dispatch_key(&mut self, event: &KeyEvent) -> crate::Result<()> {
        match (event.key, event.phase) {
            (Key::Char(c), KeyPhase::Press) => self.write(c.encode_utf8(&mut [0u8; 4])),
            (Key::Enter, KeyPhase::Down) => self.write("\n"),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct StdoutLocator {
    surface: StdoutSurface,
}

impl SurfaceLocator for StdoutLocator {
    fn locate(&mut self) -> Option<&mut dyn TargetSurface> {
        Some(&mut self.surface)
    }
}
