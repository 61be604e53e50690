//! The typing-session state machine and its per-character loop.
//!
//! [`TypingController`] is a cheap, cloneable handle. Observer requests
//! (`start`, `pause`, `resume`, `stop`, `status`) may come from any thread; each
//! takes the controller lock, applies a transition to the owned
//! [`TypingSession`], and publishes the new [`SessionState`] on a watch channel.
//!
//! The loop runs on its own tokio task and yields at exactly two places: while
//! Paused it waits for the watch channel to leave Paused, and before each
//! character it sleeps for the drawn delay while also watching for any state
//! change. A change during the delay abandons that attempt, so a pause or stop
//! is always observed before the next character is delivered.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc::UnboundedReceiver, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{minutes_to_ms, EngineConfig};
use crate::model::{Notification, Request, Response, SessionState, SessionStatus};
use crate::reporter::SessionReporter;
use crate::session::TypingSession;
use crate::store::SnapshotStore;
use crate::surface::SurfaceLocator;
use crate::synth::{Delivery, EventSynthesizer};
use crate::timing::TimingModel;

/// Wall-clock milliseconds derived from the tokio clock, so paused test time
/// and real time produce consistent timestamps.
#[derive(Debug, Clone, Copy)]
struct Clock {
    origin: Instant,
    origin_epoch_ms: u64,
}

impl Clock {
    fn new() -> Self {
        let origin_epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            origin: Instant::now(),
            origin_epoch_ms,
        }
    }

    fn now_ms(&self) -> u64 {
        self.origin_epoch_ms + self.origin.elapsed().as_millis() as u64
    }
}

struct Core {
    session: Option<TypingSession>,
    /// Bumped on every Start; a loop task whose generation is stale exits.
    generation: u64,
    synthesizer: Box<dyn EventSynthesizer>,
    locator: Box<dyn SurfaceLocator>,
    reporter: SessionReporter,
    store: Option<Box<dyn SnapshotStore>>,
}

impl Core {
    fn current_index(&self) -> usize {
        self.session.as_ref().map_or(0, TypingSession::current_index)
    }

    fn persist(&mut self, now: u64) {
        let (Some(store), Some(session)) = (self.store.as_mut(), self.session.as_ref()) else {
            return;
        };
        if let Err(err) = store.save(&session.snapshot(now)) {
            warn!("failed to save session snapshot: {err}");
        }
    }
}

struct Shared {
    core: Mutex<Core>,
    state_tx: watch::Sender<SessionState>,
    config: EngineConfig,
    clock: Clock,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }
}

pub struct ControllerBuilder {
    config: EngineConfig,
    locator: Box<dyn SurfaceLocator>,
    synthesizer: Option<Box<dyn EventSynthesizer>>,
    store: Option<Box<dyn SnapshotStore>>,
}

impl ControllerBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the synthesizer chosen by `config.strategy`.
    pub fn synthesizer(mut self, synthesizer: Box<dyn EventSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn store(mut self, store: Box<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> TypingController {
        let synthesizer = self
            .synthesizer
            .unwrap_or_else(|| self.config.strategy.synthesizer());
        let (state_tx, _) = watch::channel(SessionState::Idle);

        TypingController {
            shared: Arc::new(Shared {
                core: Mutex::new(Core {
                    session: None,
                    generation: 0,
                    synthesizer,
                    locator: self.locator,
                    reporter: SessionReporter::default(),
                    store: self.store,
                }),
                state_tx,
                config: self.config,
                clock: Clock::new(),
            }),
        }
    }
}

#[derive(Clone)]
pub struct TypingController {
    shared: Arc<Shared>,
}

impl TypingController {
    pub fn builder(locator: Box<dyn SurfaceLocator>) -> ControllerBuilder {
        ControllerBuilder {
            config: EngineConfig::default(),
            locator,
            synthesizer: None,
            store: None,
        }
    }

    pub fn new(config: EngineConfig, locator: Box<dyn SurfaceLocator>) -> Self {
        Self::builder(locator).config(config).build()
    }

    /// Attach the observer. Only one is kept; attaching again replaces it.
    pub fn observe(&self) -> UnboundedReceiver<Notification> {
        self.shared.lock().reporter.attach()
    }

    /// Drop the observer; its receiver drains what was already sent, then ends.
    pub fn detach(&self) {
        self.shared.lock().reporter.detach();
    }

    /// Start a new session and spawn its loop on the current tokio runtime.
    /// Must be called from within a runtime.
    ///
    /// Ignored while a session is Running or Paused, for empty text, and for a
    /// `start_index` past the end of the text.
    pub fn start(&self, text: &str, total_duration: Duration, start_index: usize) -> Response {
        let now = self.shared.clock.now_ms();
        let mut core = self.shared.lock();

        if core.session.as_ref().is_some_and(|s| s.state().is_live()) {
            debug!("start ignored: a session is already live");
            return Response::Ignored {
                current_index: core.current_index(),
            };
        }

        let total_ms = total_duration.as_millis().try_into().unwrap_or(u64::MAX);
        let session = match TypingSession::start(text, total_ms, start_index, now) {
            Ok(session) => session,
            Err(err) => {
                debug!("start ignored: {err}");
                return Response::Ignored {
                    current_index: core.current_index(),
                };
            }
        };

        info!(
            chars = session.len(),
            start_index,
            total_ms,
            mean_interval_ms = session.mean_interval_ms(),
            "typing session started"
        );

        core.generation += 1;
        let generation = core.generation;
        core.session = Some(session);
        core.persist(now);
        self.shared.publish(SessionState::Running);
        drop(core);

        let timing = TimingModel::new(self.shared.config.seed, self.shared.config.spread_ratio);
        tokio::spawn(run_session(self.shared.clone(), generation, timing));

        Response::Started {
            current_index: start_index,
        }
    }

    pub fn pause(&self) -> Response {
        let now = self.shared.clock.now_ms();
        let mut core = self.shared.lock();

        let Some(session) = core.session.as_mut() else {
            return Response::Ignored { current_index: 0 };
        };
        let current_index = session.current_index();
        if !session.pause(now) {
            return Response::Ignored { current_index };
        }

        info!(current_index, "typing paused");
        self.shared.publish(SessionState::Paused);
        core.reporter.paused(current_index);
        core.persist(now);

        Response::Paused { current_index }
    }

    pub fn resume(&self) -> Response {
        let now = self.shared.clock.now_ms();
        let mut core = self.shared.lock();

        let Some(session) = core.session.as_mut() else {
            return Response::Ignored { current_index: 0 };
        };
        let current_index = session.current_index();
        if !session.resume(now) {
            return Response::Ignored { current_index };
        }

        info!(current_index, "typing resumed");
        self.shared.publish(SessionState::Running);
        core.reporter.resumed(current_index);
        core.persist(now);

        Response::Resumed { current_index }
    }

    /// Stop the live session. The loop notices at its next suspension point;
    /// a character already being delivered finishes first.
    pub fn stop(&self) -> Response {
        let now = self.shared.clock.now_ms();
        let mut core = self.shared.lock();

        let Some(session) = core.session.as_mut() else {
            return Response::Ignored { current_index: 0 };
        };
        let current_index = session.current_index();
        if !session.stop() {
            return Response::Ignored { current_index };
        }

        info!(current_index, "typing stopped");
        self.shared.publish(SessionState::Stopped);
        core.reporter.stopped();
        core.persist(now);

        Response::Stopped
    }

    pub fn status(&self) -> SessionStatus {
        let now = self.shared.clock.now_ms();
        let core = self.shared.lock();
        core.session
            .as_ref()
            .map(|s| s.status(now))
            .unwrap_or_default()
    }

    /// Dispatch one request of the observer protocol.
    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::Start {
                text,
                total_duration_minutes,
                start_index,
            } => match minutes_to_ms(total_duration_minutes) {
                Ok(ms) => self.start(&text, Duration::from_millis(ms), start_index),
                Err(err) => {
                    debug!("start ignored: {err}");
                    Response::Ignored {
                        current_index: self.status().current_index,
                    }
                }
            },
            Request::Pause => self.pause(),
            Request::Resume => self.resume(),
            Request::Stop => self.stop(),
            Request::GetStatus => Response::Status(self.status()),
        }
    }

    /// Wait until no session is live and return the resting state.
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.shared.state_tx.subscribe();
        let state = match rx.wait_for(|state| !state.is_live()).await {
            Ok(state) => *state,
            Err(_) => self.status().state,
        };
        state
    }
}

async fn run_session(shared: Arc<Shared>, generation: u64, mut timing: TimingModel) {
    let mut state_rx = shared.state_tx.subscribe();

    loop {
        // Suspension point: hold here while Paused.
        if state_rx
            .wait_for(|state| *state != SessionState::Paused)
            .await
            .is_err()
        {
            return;
        }

        let mean_ms = {
            let now = shared.clock.now_ms();
            let mut core = shared.lock();
            if core.generation != generation {
                return;
            }
            let Some(session) = core.session.as_mut() else {
                return;
            };
            match session.state() {
                SessionState::Running => {}
                SessionState::Paused => continue,
                _ => return,
            }

            if session.complete() {
                info!(chars = session.len(), "typing completed");
                shared.publish(SessionState::Completed);
                core.reporter.completed();
                core.persist(now);
                return;
            }
            session.mean_interval_ms()
        };

        let delay = timing.delay(mean_ms);
        debug!(delay_ms = delay.as_millis() as u64, "next keystroke");

        // Suspension point: the inter-keystroke delay, cut short by any state change.
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = state_rx.wait_for(|state| *state != SessionState::Running) => {
                if changed.is_err() {
                    return;
                }
                continue;
            }
        }

        let now = shared.clock.now_ms();
        let mut core = shared.lock();
        if core.generation != generation {
            return;
        }

        let Core {
            session,
            synthesizer,
            locator,
            reporter,
            ..
        } = &mut *core;
        let Some(session) = session.as_mut() else {
            return;
        };
        let Some(ch) = session.current_char() else {
            continue;
        };

        let delivery = synthesizer.deliver(ch, session.state(), &mut **locator);
        match delivery {
            Delivery::Refused => continue,
            Delivery::Delivered => {}
            Delivery::Unavailable | Delivery::Failed => {
                // Undeliverable characters are skipped, never retried.
                warn!(
                    index = session.current_index(),
                    ?ch,
                    ?delivery,
                    "character skipped"
                );
            }
        }

        if let Some(progress) = session.advance() {
            debug!(index = progress.current_index, ?ch, ?delivery, "character consumed");
            reporter.progress(progress);
        }
        core.persist(now);
    }
}
