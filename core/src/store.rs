//! A store owning one slice's state.
//!
//! Every dispatch runs the slice reducer under the watch channel's lock, so
//! reductions never interleave. Async operations only hold the lock while
//! dispatching, never across the caller's request; two overlapping
//! operations therefore settle last-write-wins.

use std::future::Future;

use tokio::sync::watch;

use crate::error::ApiError;
use crate::slice::{ApiSlice, GenericState, SliceAction};

#[derive(Debug)]
pub struct Store<T> {
    slice: ApiSlice<T>,
    state: watch::Sender<GenericState<T>>,
}

impl<T: Clone> Store<T> {
    pub fn new(slice: ApiSlice<T>) -> Self {
        let (state, _) = watch::channel(slice.initial_state());
        Self { slice, state }
    }

    pub fn slice(&self) -> &ApiSlice<T> {
        &self.slice
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> GenericState<T> {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<GenericState<T>> {
        self.state.subscribe()
    }

    pub fn dispatch(&self, action: SliceAction<T>) {
        tracing::trace!(action = %action, "dispatch");
        let slice = &self.slice;
        self.state.send_modify(|state| *state = slice.reduce(state, &action));
    }

    /// Fetch through `api` and record its lifecycle in this store.
    pub async fn fetch_data<F, Fut>(&self, api: F) -> SliceAction<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.slice.fetch_data(|action| self.dispatch(action), api).await
    }

    /// Update through `api(partial)` and record its lifecycle in this store.
    pub async fn update_data<P, F, Fut>(&self, api: F, partial: P) -> SliceAction<T>
    where
        F: FnOnce(P) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        self.slice
            .update_data(|action| self.dispatch(action), api, partial)
            .await
    }

    pub fn set_data(&self, data: T) {
        self.dispatch(self.slice.set_data(data));
    }

    pub fn clear_error(&self) {
        self.dispatch(self.slice.clear_error());
    }

    pub fn reset(&self) {
        self.dispatch(self.slice.reset());
    }
}
