use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::ConnectionExt as _;
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::protocol::{xproto, xtest};
use x11rb::rust_connection::RustConnection;

use super::COMMON_MODIFIER_KEYCODES;
use crate::surface::{KeyEvent, KeyPhase, SurfaceLocator, TargetSurface};

// X11 special focus value: PointerRoot means the focused window follows the pointer.
const POINTER_ROOT: xproto::Window = 1;

fn evdev_to_x11_keycode(evdev_keycode: u32) -> Result<u8> {
    // On most Linux Xorg setups, X11 keycodes are evdev + 8.
    let x11 = evdev_keycode
        .checked_add(8)
        .ok_or_else(|| anyhow!("evdev keycode overflow"))?;
    u8::try_from(x11).map_err(|_| anyhow!("evdev keycode {evdev_keycode} out of range for X11"))
}

fn query_xtest(conn: &impl Connection) -> Result<()> {
    let ext = conn
        .extension_information(xtest::X11_EXTENSION_NAME)
        .context("failed to query X11 extension info")?;

    if ext.is_none() {
        return Err(anyhow!(
            "X11 backend requires the XTEST extension (not present on this X server)"
        ));
    }

    let _ = conn
        .xtest_get_version(2, 2)
        .ok()
        .and_then(|cookie| cookie.reply().ok());

    Ok(())
}

fn keysyms_for_keycode(conn: &impl Connection, keycode: u8) -> Result<(u32, u32)> {
    let reply = conn
        .get_keyboard_mapping(keycode, 1)
        .context("failed to request keyboard mapping")?
        .reply()
        .context("failed to read keyboard mapping")?;

    if reply.keysyms_per_keycode == 0 {
        return Err(anyhow!("X server returned 0 keysyms per keycode"));
    }

    let at = |index: usize| {
        reply
            .keysyms
            .get(index)
            .copied()
            .unwrap_or(x11rb::NO_SYMBOL)
    };
    Ok((at(0), at(1)))
}

fn validate_us_keymap(conn: &impl Connection) -> Result<()> {
    use crate::keyboard::{char_to_keystroke, typed_char_for_output_char};

    // Representative keys; for Latin-1 the keysym equals the character code.
    for (unshifted, shifted) in [('a', 'A'), ('q', 'Q'), ('1', '!'), ('-', '_'), ('\'', '"')] {
        let stroke = typed_char_for_output_char(unshifted)
            .and_then(char_to_keystroke)
            .ok_or_else(|| anyhow!("no keystroke for {unshifted:?}"))?;
        let keycode = evdev_to_x11_keycode(stroke.keycode)?;
        let (got0, got1) = keysyms_for_keycode(conn, keycode)?;

        if got0 == x11rb::NO_SYMBOL || got1 == x11rb::NO_SYMBOL {
            return Err(anyhow!(
                "X11 backend could not validate the keymap: keycode {keycode} returned NoSymbol ({got0:#x}/{got1:#x}). Keycodes are assumed to be evdev+8 on a US layout."
            ));
        }

        if got0 != unshifted as u32 || got1 != shifted as u32 {
            return Err(anyhow!(
                "X11 backend requires a US keyboard layout, but keycode {keycode} maps to {got0:#x}/{got1:#x}. Try `setxkbmap us`."
            ));
        }
    }

    Ok(())
}

fn focused_window(conn: &impl Connection) -> Result<Option<xproto::Window>> {
    let focus = conn
        .get_input_focus()
        .context("failed to request input focus")?
        .reply()
        .context("failed to read input focus reply")?
        .focus;

    if focus == x11rb::NONE || focus == POINTER_ROOT {
        return Ok(None);
    }
    Ok(Some(focus))
}

/// Keyboard injection into whatever X11 window holds the input focus.
pub struct X11Surface {
    conn: RustConnection,
    root: xproto::Window,
}

impl X11Surface {
    fn fake_key(&self, type_: u8, keycode: u8) -> Result<()> {
        self.conn
            .xtest_fake_input(type_, keycode, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
            .context("failed to send XTEST fake input")?;
        self.conn
            .flush()
            .context("failed to flush X11 connection")?;
        Ok(())
    }

    fn release_common_modifiers(&self) {
        for keycode in COMMON_MODIFIER_KEYCODES {
            if let Ok(code) = evdev_to_x11_keycode(keycode) {
                let _ = self.fake_key(xproto::KEY_RELEASE_EVENT, code);
            }
        }
    }
}

impl TargetSurface for X11Surface {
    fn dispatch_key(&mut self, event: &KeyEvent) -> crate::Result<()> {
        let type_ = match event.phase {
            KeyPhase::Down => xproto::KEY_PRESS_EVENT,
            KeyPhase::Up => xproto::KEY_RELEASE_EVENT,
            // The X server derives the character from the press itself.
            KeyPhase::Press => return Ok(()),
        };

        let keycode = evdev_to_x11_keycode(event.keycode)
            .map_err(|e| crate::CadenceError::surface(e.to_string()))?;
        self.fake_key(type_, keycode)
            .map_err(|e| crate::CadenceError::surface(format!("{e:#}")))
    }
}

pub struct X11Locator {
    surface: X11Surface,
}

impl X11Locator {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("failed to connect to X11")?;
        query_xtest(&conn)?;
        validate_us_keymap(&conn)?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| anyhow!("invalid X11 screen index"))?
            .root;

        let surface = X11Surface { conn, root };
        // X11 has no per-client modifier state; start from a neutral keyboard.
        surface.release_common_modifiers();
        debug!(screen = screen_num, "connected to X11");

        Ok(Self { surface })
    }
}

impl SurfaceLocator for X11Locator {
    fn locate(&mut self) -> Option<&mut dyn TargetSurface> {
        match focused_window(&self.surface.conn) {
            Ok(Some(_)) => Some(&mut self.surface),
            Ok(None) => {
                debug!("no explicit X11 input focus");
                None
            }
            Err(err) => {
                warn!("X11 focus query failed: {err:#}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::evdev_to_x11_keycode;

    #[test]
    fn evdev_keycodes_are_offset_by_eight() {
        assert_eq!(evdev_to_x11_keycode(crate::keyboard::KEY_A).unwrap(), 38);
        assert!(evdev_to_x11_keycode(300).is_err());
    }
}
