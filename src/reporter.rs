use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use crate::model::Notification;
use crate::session::Progress;

/// Fire-and-forget notifications to at most one observer.
///
/// Sending never blocks and never fails from the caller's point of view: a
/// missing or dropped observer only means the notification goes nowhere.
#[derive(Debug, Default)]
pub struct SessionReporter {
    observer: Option<UnboundedSender<Notification>>,
}

impl SessionReporter {
    /// Attach a new observer, replacing any previous one.
    pub fn attach(&mut self) -> UnboundedReceiver<Notification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observer = Some(tx);
        rx
    }

    pub fn detach(&mut self) {
        self.observer = None;
    }

    fn emit(&mut self, notification: Notification) {
        let Some(observer) = &self.observer else {
            trace!(?notification, "no observer attached");
            return;
        };

        if observer.send(notification).is_err() {
            trace!("observer went away; dropping it");
            self.observer = None;
        }
    }

    pub fn progress(&mut self, progress: Progress) {
        self.emit(Notification::Progress {
            progress: progress.fraction,
            current_index: progress.current_index,
            words_typed: progress.words_typed,
        });
    }

    pub fn paused(&mut self, current_index: usize) {
        self.emit(Notification::Paused { current_index });
    }

    pub fn resumed(&mut self, current_index: usize) {
        self.emit(Notification::Resumed { current_index });
    }

    pub fn completed(&mut self) {
        self.emit(Notification::Completed);
    }

    pub fn stopped(&mut self) {
        self.emit(Notification::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitting_without_an_observer_is_a_no_op() {
        let mut reporter = SessionReporter::default();
        reporter.paused(1);
        reporter.completed();
    }

    #[test]
    fn dropped_observer_is_forgotten() {
        let mut reporter = SessionReporter::default();
        drop(reporter.attach());
        reporter.stopped();
        assert!(reporter.observer.is_none());
    }

    #[test]
    fn attaching_replaces_the_previous_observer() {
        let mut reporter = SessionReporter::default();
        let mut first = reporter.attach();
        let mut second = reporter.attach();

        reporter.resumed(4);

        assert!(first.try_recv().is_err());
        assert_eq!(
            second.try_recv().unwrap(),
            Notification::Resumed { current_index: 4 }
        );
    }
}
