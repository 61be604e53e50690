pub mod backends;

use anyhow::{anyhow, Result};

use crate::synth::DeliveryStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Down,
    Press,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Shift,
}

/// One synthetic keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub phase: KeyPhase,
    pub key: Key,
    /// evdev keycode of the physical key.
    pub keycode: u32,
    pub shift: bool,
    /// Milliseconds since the synthesizer was created, taken at dispatch.
    pub time_ms: u32,
}

/// An editable destination that receives synthesized characters.
pub trait TargetSurface {
    /// Native "insert text" editing command.
    fn insert_text(&mut self, _text: &str) -> crate::Result<()> {
        Err(crate::CadenceError::UnsupportedOperation("insert_text"))
    }

    /// Native "insert line break" editing command.
    fn insert_line_break(&mut self) -> crate::Result<()> {
        Err(crate::CadenceError::UnsupportedOperation("insert_line_break"))
    }

    fn dispatch_key(&mut self, event: &KeyEvent) -> crate::Result<()>;
}

/// Finds the target surface on demand.
///
/// Called once per delivery; the returned borrow must not be kept across a
/// suspension point, so a surface that disappears is noticed on the next call.
pub trait SurfaceLocator: Send {
    fn locate(&mut self) -> Option<&mut dyn TargetSurface>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceBackend {
    Auto,
    X11,
    Stdout,
}

impl SurfaceBackend {
    pub fn supports(self, strategy: DeliveryStrategy) -> bool {
        match self {
            SurfaceBackend::X11 => strategy == DeliveryStrategy::KeySequence,
            SurfaceBackend::Stdout | SurfaceBackend::Auto => true,
        }
    }
}

fn env_is_set(name: &str) -> bool {
    std::env::var_os(name)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

fn auto_backend() -> SurfaceBackend {
    if env_is_set("DISPLAY") && cfg!(feature = "x11") {
        return SurfaceBackend::X11;
    }

    // Unknown/unsupported environment.
    SurfaceBackend::Auto
}

fn backend_unavailable_message() -> String {
    let xdg_session_type = std::env::var("XDG_SESSION_TYPE").unwrap_or_default();

    let mut parts = Vec::new();

    if env_is_set("WAYLAND_DISPLAY") {
        parts.push("WAYLAND_DISPLAY is set".to_string());
    }
    if env_is_set("DISPLAY") {
        parts.push("DISPLAY is set".to_string());
    }
    if !xdg_session_type.is_empty() {
        parts.push(format!("XDG_SESSION_TYPE={xdg_session_type}"));
    }

    if parts.is_empty() {
        "No display session detected (expected an X11 DISPLAY).".to_string()
    } else {
        format!("Detected environment: {}", parts.join(", "))
    }
}

fn require_supported_backend(selected: SurfaceBackend, resolved: SurfaceBackend) -> Result<()> {
    match resolved {
        SurfaceBackend::X11 => {
            if cfg!(feature = "x11") {
                Ok(())
            } else {
                let how = match selected {
                    SurfaceBackend::Auto => "detected",
                    _ => "requested",
                };
                Err(anyhow!(
                    "X11 backend {how} but is disabled in this build. (Rebuild with `--features x11`.) {details}",
                    details = backend_unavailable_message()
                ))
            }
        }
        SurfaceBackend::Stdout => Ok(()),
        SurfaceBackend::Auto => Err(anyhow!(
            "No supported surface backend detected. {details}\n\
             Pass `--backend stdout` for a dry run.",
            details = backend_unavailable_message(),
        )),
    }
}

pub fn resolve_backend(requested: SurfaceBackend) -> Result<SurfaceBackend> {
    let resolved = match requested {
        SurfaceBackend::Auto => auto_backend(),
        other => other,
    };

    require_supported_backend(requested, resolved)?;
    Ok(resolved)
}

/// Resolve `requested`, check it can carry `strategy`, and open its locator.
pub fn open_locator(
    requested: SurfaceBackend,
    strategy: DeliveryStrategy,
) -> Result<Box<dyn SurfaceLocator>> {
    let backend = resolve_backend(requested)?;

    if !backend.supports(strategy) {
        return Err(anyhow!(
            "{backend:?} backend has no text-insertion command; use the key-sequence strategy"
        ));
    }

    match backend {
        SurfaceBackend::X11 => {
            #[cfg(feature = "x11")]
            {
                Ok(Box::new(backends::x11::X11Locator::connect()?))
            }

            #[cfg(not(feature = "x11"))]
            {
                Err(anyhow!(
                    "X11 backend is disabled in this build (rebuild with `--features x11`)."
                ))
            }
        }
        SurfaceBackend::Stdout => Ok(Box::new(backends::stdout::StdoutLocator::default())),
        SurfaceBackend::Auto => Err(anyhow!("no backend resolved")),
    }
}
