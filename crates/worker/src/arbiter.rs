//! Single owner of the accelerator residency state.
//!
//! Every transition runs under one async mutex, so two transitions never
//! interleave even if more than one task ever calls in. The state only
//! advances after the backend call it depends on has succeeded; a failed
//! call leaves the previous state in place.

use std::sync::Arc;
use std::time::Duration;

use clair_core::accelerator::{plan_transition, AcceleratorState, TransitionStep};
use tokio::sync::{watch, Mutex};

use crate::backend::{BackendError, TextModelControl};

/// Pause after a confirmed unload before the image backend is driven.
///
/// The text backend acknowledges the unload before the driver has
/// finished returning memory to the device.
pub const DEFAULT_UNLOAD_SETTLE: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum ArbiterError {
    #[error("Failed to load the text model: {0}")]
    LoadFailed(#[source] BackendError),

    #[error("Failed to unload the text model: {0}")]
    UnloadFailed(#[source] BackendError),
}

/// What a successful [`ResourceArbiter::transition`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Already in the target state. No backend was contacted.
    Unchanged,
    Switched {
        from: AcceleratorState,
        to: AcceleratorState,
    },
}

pub struct ResourceArbiter {
    control: Arc<dyn TextModelControl>,
    state: Mutex<AcceleratorState>,
    observed: watch::Sender<AcceleratorState>,
    unload_settle: Duration,
}

impl ResourceArbiter {
    /// Start in [`AcceleratorState::Idle`].
    pub fn new(control: Arc<dyn TextModelControl>, unload_settle: Duration) -> Self {
        let (observed, _) = watch::channel(AcceleratorState::Idle);
        Self {
            control,
            state: Mutex::new(AcceleratorState::Idle),
            observed,
            unload_settle,
        }
    }

    /// Last committed state. Does not wait for an in-flight transition.
    pub fn current(&self) -> AcceleratorState {
        *self.observed.borrow()
    }

    /// Watch committed state changes.
    pub fn subscribe(&self) -> watch::Receiver<AcceleratorState> {
        self.observed.subscribe()
    }

    /// Move the accelerator into `target`.
    ///
    /// Leaving `TextResident` always unloads the text model first and
    /// waits for the acknowledgement plus the settle delay. Entering
    /// `TextResident` preloads the model. Moves between `Idle` and
    /// `ImageResident` are bookkeeping only.
    pub async fn transition(&self, target: AcceleratorState) -> Result<Transition, ArbiterError> {
        let mut state = self.state.lock().await;
        let from = *state;

        match plan_transition(from, target) {
            TransitionStep::Noop => return Ok(Transition::Unchanged),
            TransitionStep::Claim => {}
            TransitionStep::LoadText => {
                tracing::debug!(%from, "Loading text model");
                self.control.load().await.map_err(ArbiterError::LoadFailed)?;
            }
            TransitionStep::UnloadText => {
                tracing::debug!(%target, "Unloading text model");
                self.control.unload().await.map_err(ArbiterError::UnloadFailed)?;
                if !self.unload_settle.is_zero() {
                    tokio::time::sleep(self.unload_settle).await;
                }
            }
        }

        *state = target;
        self.observed.send_replace(target);
        tracing::info!(%from, to = %target, "Accelerator mode switched");
        Ok(Transition::Switched { from, to: target })
    }

    /// Return to `Idle`, unloading the text model if it is resident.
    pub async fn release(&self) -> Result<Transition, ArbiterError> {
        self.transition(AcceleratorState::Idle).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;
    use AcceleratorState::*;

    #[derive(Default)]
    struct CountingControl {
        loads: AtomicUsize,
        unloads: AtomicUsize,
        fail_load: AtomicBool,
        fail_unload: AtomicBool,
    }

    #[async_trait]
    impl TextModelControl for CountingControl {
        async fn load(&self) -> Result<(), BackendError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_load.load(Ordering::SeqCst) {
                return Err(BackendError::Unavailable("out of memory".into()));
            }
            Ok(())
        }

        async fn unload(&self) -> Result<(), BackendError> {
            self.unloads.fetch_add(1, Ordering::SeqCst);
            if self.fail_unload.load(Ordering::SeqCst) {
                return Err(BackendError::Unavailable("connection refused".into()));
            }
            Ok(())
        }
    }

    fn arbiter() -> (Arc<CountingControl>, ResourceArbiter) {
        let control = Arc::new(CountingControl::default());
        let arbiter = ResourceArbiter::new(control.clone(), Duration::ZERO);
        (control, arbiter)
    }

    #[tokio::test]
    async fn self_transition_contacts_no_backend() {
        let (control, arbiter) = arbiter();
        assert_eq!(arbiter.transition(Idle).await.unwrap(), Transition::Unchanged);
        assert_eq!(control.loads.load(Ordering::SeqCst), 0);
        assert_eq!(control.unloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn text_to_image_unloads_once() {
        let (control, arbiter) = arbiter();
        arbiter.transition(TextResident).await.unwrap();
        let t = arbiter.transition(ImageResident).await.unwrap();
        assert_eq!(t, Transition::Switched { from: TextResident, to: ImageResident });
        assert_eq!(control.loads.load(Ordering::SeqCst), 1);
        assert_eq!(control.unloads.load(Ordering::SeqCst), 1);
        assert_eq!(arbiter.current(), ImageResident);
    }

    #[tokio::test]
    async fn idle_to_image_is_a_claim() {
        let (control, arbiter) = arbiter();
        arbiter.transition(ImageResident).await.unwrap();
        assert_eq!(control.unloads.load(Ordering::SeqCst), 0);
        assert_eq!(arbiter.current(), ImageResident);
    }

    #[tokio::test]
    async fn failed_unload_keeps_text_resident() {
        let (control, arbiter) = arbiter();
        arbiter.transition(TextResident).await.unwrap();
        control.fail_unload.store(true, Ordering::SeqCst);

        let err = arbiter.transition(ImageResident).await.unwrap_err();
        assert_matches!(err, ArbiterError::UnloadFailed(_));
        assert_eq!(arbiter.current(), TextResident);
    }

    #[tokio::test]
    async fn failed_load_from_idle_stays_idle() {
        let (control, arbiter) = arbiter();
        control.fail_load.store(true, Ordering::SeqCst);

        let err = arbiter.transition(TextResident).await.unwrap_err();
        assert_matches!(err, ArbiterError::LoadFailed(_));
        assert_eq!(arbiter.current(), Idle);

        control.fail_load.store(false, Ordering::SeqCst);
        arbiter.transition(TextResident).await.unwrap();
        assert_eq!(control.loads.load(Ordering::SeqCst), 2);
        assert_eq!(arbiter.current(), TextResident);
    }

    #[tokio::test]
    async fn failed_load_from_image_keeps_image_resident() {
        let (control, arbiter) = arbiter();
        arbiter.transition(ImageResident).await.unwrap();
        control.fail_load.store(true, Ordering::SeqCst);

        let err = arbiter.transition(TextResident).await.unwrap_err();
        assert_matches!(err, ArbiterError::LoadFailed(_));
        assert_eq!(arbiter.current(), ImageResident);
        assert_eq!(control.unloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn release_from_text_unloads() {
        let (control, arbiter) = arbiter();
        arbiter.transition(TextResident).await.unwrap();
        arbiter.release().await.unwrap();
        assert_eq!(control.unloads.load(Ordering::SeqCst), 1);
        assert_eq!(arbiter.current(), Idle);
    }

    #[tokio::test]
    async fn subscribers_see_committed_state() {
        let (_control, arbiter) = arbiter();
        let mut rx = arbiter.subscribe();
        arbiter.transition(TextResident).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), TextResident);
    }
}
