pub mod config;
pub mod controller;
pub mod error;
pub mod keyboard;
pub mod model;
pub mod reporter;
pub mod session;
pub mod sim;
pub mod store;
pub mod surface;
pub mod synth;
pub mod timing;

pub use config::EngineConfig;
pub use controller::{ControllerBuilder, TypingController};
pub use error::{CadenceError, Result};
pub use model::{Notification, Request, Response, SessionSnapshot, SessionState, SessionStatus};
pub use synth::{DeliveryStrategy, EventSynthesizer};
