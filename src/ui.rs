//! UI state store and the UI-affine main queue.
//!
//! All observable flags live in [`UiState`]. They are only ever changed by
//! jobs running on the main queue's thread, through [`UiMutator`]. Views
//! observe changes through a `watch` channel.

use serde::Serialize;
use std::future::Future;
use std::thread;
use tokio::sync::{mpsc, oneshot, watch};

/// Name of the thread that owns UI state.
pub const UI_THREAD_NAME: &str = "ui-main";

/// Flags read by the view layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UiState {
    /// A photo was taken or a recording is underway
    pub is_taken: bool,
    /// The taken photo is in the library. Implies `is_taken`.
    pub is_saved: bool,
    /// Permission alert is showing
    pub alert: bool,
    pub is_recording: bool,
}

/// The designated mutators for [`UiState`].
pub struct UiMutator<'a> {
    state: &'a mut UiState,
}

impl UiMutator<'_> {
    pub fn state(&self) -> &UiState {
        self.state
    }

    pub fn toggle_taken(&mut self) {
        let taken = !self.state.is_taken;
        self.set_taken(taken);
    }

    /// Clearing `is_taken` also clears `is_saved`.
    pub fn set_taken(&mut self, taken: bool) {
        self.state.is_taken = taken;
        if !taken {
            self.state.is_saved = false;
        }
    }

    /// Mark the taken photo as saved. Returns whether the flag changed.
    pub fn mark_saved(&mut self) -> bool {
        if !self.state.is_taken {
            log::warn!("Ignoring save flag: nothing has been taken");
            return false;
        }
        if self.state.is_saved {
            return false;
        }
        self.state.is_saved = true;
        true
    }

    pub fn show_alert(&mut self) {
        self.state.alert = true;
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.state.is_recording = recording;
    }
}

type UiJob = Box<dyn FnOnce(&mut UiMutator<'_>) + Send>;

/// Serial queue executing UI jobs on one dedicated thread.
///
/// Clones share the same thread. The thread exits once every clone is dropped.
/// Jobs run while the state is locked for writing, so a job must read state
/// through its [`UiMutator`], never through [`MainQueue::state`].
#[derive(Debug, Clone)]
pub struct MainQueue {
    jobs: mpsc::UnboundedSender<UiJob>,
    state: watch::Receiver<UiState>,
}

impl MainQueue {
    /// Start the UI thread.
    pub fn spawn() -> std::io::Result<Self> {
        let (jobs, mut rx) = mpsc::unbounded_channel::<UiJob>();
        let (state_tx, state) = watch::channel(UiState::default());

        thread::Builder::new()
            .name(UI_THREAD_NAME.to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    state_tx.send_if_modified(|state| {
                        let before = state.clone();
                        job(&mut UiMutator { state: &mut *state });
                        *state != before
                    });
                }
                log::debug!("UI queue closed");
            })?;

        Ok(Self { jobs, state })
    }

    /// Queue `job` without waiting for it.
    pub fn dispatch<F>(&self, job: F)
    where
        F: FnOnce(&mut UiMutator<'_>) + Send + 'static,
    {
        if self.jobs.send(Box::new(job)).is_err() {
            log::warn!("UI queue is closed, dropping state update");
        }
    }

    /// Queue `job` and wait for its result. `None` if the queue is closed.
    pub fn run<F, R>(&self, job: F) -> impl Future<Output = Option<R>> + Send + 'static
    where
        F: FnOnce(&mut UiMutator<'_>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.dispatch(move |ui| {
            let _ = tx.send(job(ui));
        });
        async move { rx.await.ok() }
    }

    /// Run `work` off the UI thread, then apply `apply` to UI state on it.
    pub async fn background_then_main<T, R, W, A>(&self, work: W, apply: A) -> Option<R>
    where
        W: FnOnce() -> T + Send + 'static,
        A: FnOnce(T, &mut UiMutator<'_>) -> R + Send + 'static,
        T: Send + 'static,
        R: Send + 'static,
    {
        let value = match tokio::task::spawn_blocking(work).await {
            Ok(value) => value,
            Err(e) => {
                log::error!("Background task failed: {}", e);
                return None;
            }
        };
        self.run(move |ui| apply(value, ui)).await
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> UiState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every job that changed the state.
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.clone()
    }
}

/// Whether the caller is running on the UI thread.
pub fn is_ui_thread() -> bool {
    thread::current().name() == Some(UI_THREAD_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_requires_taken() {
        let mut state = UiState::default();
        let mut ui = UiMutator { state: &mut state };
        assert!(!ui.mark_saved());
        ui.set_taken(true);
        assert!(ui.mark_saved());
        assert!(!ui.mark_saved());
        ui.toggle_taken();
        assert_eq!(state, UiState::default());
    }

    #[tokio::test]
    async fn test_jobs_run_on_ui_thread() {
        let queue = MainQueue::spawn().unwrap();
        assert!(!is_ui_thread());
        let on_ui = queue.run(|_| is_ui_thread()).await;
        assert_eq!(on_ui, Some(true));
    }

    #[tokio::test]
    async fn test_jobs_run_in_order() {
        let queue = MainQueue::spawn().unwrap();
        queue.dispatch(|ui| ui.set_taken(true));
        queue.dispatch(|ui| {
            ui.mark_saved();
        });
        let state = queue.run(|ui| ui.state().clone()).await.unwrap();
        assert!(state.is_taken);
        assert!(state.is_saved);
        assert_eq!(queue.state(), state);
    }

    #[tokio::test]
    async fn test_background_then_main_hands_off() {
        let queue = MainQueue::spawn().unwrap();
        let result = queue
            .background_then_main(
                || (is_ui_thread(), 7),
                |(was_ui, n), ui| {
                    ui.toggle_taken();
                    (was_ui, is_ui_thread(), n)
                },
            )
            .await;
        assert_eq!(result, Some((false, true, 7)));
        assert!(queue.state().is_taken);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let queue = MainQueue::spawn().unwrap();
        let mut rx = queue.subscribe();
        queue.dispatch(|ui| ui.show_alert());
        rx.changed().await.unwrap();
        assert!(rx.borrow().alert);
    }
}
