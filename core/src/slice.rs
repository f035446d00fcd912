//! Lifecycle state slices: `loading` / `error` / `data` driven by async
//! fetch and update operations.
//!
//! # Design
//! A slice owns no state. `ApiSlice::reduce` is a pure function from the
//! current `GenericState` and an action to the next state, and the async
//! operations only sequence `Pending` then `Fulfilled`/`Rejected` actions
//! through a caller-supplied `dispatch`. The network call itself is injected
//! by the caller. See [`crate::store::Store`] for a ready-made owner.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Lifecycle record owned by a slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<ApiError>,
}

impl<T> GenericState<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            loading: false,
            error: None,
        }
    }
}

/// Phase of an async operation.
#[derive(Debug, Clone, PartialEq)]
pub enum AsyncPhase<T> {
    Pending,
    Fulfilled(T),
    Rejected(ApiError),
}

impl<T> AsyncPhase<T> {
    fn label(&self) -> &'static str {
        match self {
            AsyncPhase::Pending => "pending",
            AsyncPhase::Fulfilled(_) => "fulfilled",
            AsyncPhase::Rejected(_) => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind<T> {
    SetData(T),
    ClearError,
    Reset,
    FetchData(AsyncPhase<T>),
    UpdateData(AsyncPhase<T>),
}

/// An action addressed to the slice named `slice`.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceAction<T> {
    pub slice: String,
    pub kind: ActionKind<T>,
}

impl<T> SliceAction<T> {
    /// Conventional `"<slice>/<action>[/<phase>]"` label, for logs.
    pub fn action_type(&self) -> String {
        match &self.kind {
            ActionKind::SetData(_) => format!("{}/setData", self.slice),
            ActionKind::ClearError => format!("{}/clearError", self.slice),
            ActionKind::Reset => format!("{}/reset", self.slice),
            ActionKind::FetchData(phase) => format!("{}/fetchData/{}", self.slice, phase.label()),
            ActionKind::UpdateData(phase) => format!("{}/updateData/{}", self.slice, phase.label()),
        }
    }
}

impl<T> fmt::Display for SliceAction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.action_type())
    }
}

/// Reducer and action creators for one named slice.
#[derive(Debug, Clone)]
pub struct ApiSlice<T> {
    name: String,
    initial_state: T,
}

impl<T: Clone> ApiSlice<T> {
    pub fn new(name: impl Into<String>, initial_state: T) -> Self {
        Self {
            name: name.into(),
            initial_state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The state a fresh store starts from.
    pub fn initial_state(&self) -> GenericState<T> {
        GenericState::new(self.initial_state.clone())
    }

    /// Compute the next state. Actions for other slices leave the state as
    /// it is.
    pub fn reduce(&self, state: &GenericState<T>, action: &SliceAction<T>) -> GenericState<T> {
        if action.slice != self.name {
            return state.clone();
        }

        match &action.kind {
            ActionKind::SetData(data) => GenericState {
                data: data.clone(),
                ..state.clone()
            },
            ActionKind::ClearError => GenericState {
                error: None,
                ..state.clone()
            },
            ActionKind::Reset => self.initial_state(),
            ActionKind::FetchData(phase) | ActionKind::UpdateData(phase) => match phase {
                AsyncPhase::Pending => GenericState {
                    loading: true,
                    error: None,
                    ..state.clone()
                },
                AsyncPhase::Fulfilled(data) => GenericState {
                    data: data.clone(),
                    loading: false,
                    ..state.clone()
                },
                AsyncPhase::Rejected(error) => GenericState {
                    loading: false,
                    error: Some(error.clone()),
                    ..state.clone()
                },
            },
        }
    }

    fn action(&self, kind: ActionKind<T>) -> SliceAction<T> {
        SliceAction {
            slice: self.name.clone(),
            kind,
        }
    }

    pub fn set_data(&self, data: T) -> SliceAction<T> {
        self.action(ActionKind::SetData(data))
    }

    pub fn clear_error(&self) -> SliceAction<T> {
        self.action(ActionKind::ClearError)
    }

    pub fn reset(&self) -> SliceAction<T> {
        self.action(ActionKind::Reset)
    }

    pub fn fetch_data_phase(&self, phase: AsyncPhase<T>) -> SliceAction<T> {
        self.action(ActionKind::FetchData(phase))
    }

    pub fn update_data_phase(&self, phase: AsyncPhase<T>) -> SliceAction<T> {
        self.action(ActionKind::UpdateData(phase))
    }

    /// Run `api` as a fetch: dispatch `Pending`, await, then dispatch
    /// `Fulfilled` or `Rejected`. The settling action is also returned.
    pub async fn fetch_data<D, F, Fut>(&self, mut dispatch: D, api: F) -> SliceAction<T>
    where
        D: FnMut(SliceAction<T>),
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        dispatch(self.fetch_data_phase(AsyncPhase::Pending));
        let settled = self.fetch_data_phase(settle(api().await));
        dispatch(settled.clone());
        settled
    }

    /// Run `api(partial)` as an update, with the same lifecycle as
    /// [`fetch_data`](Self::fetch_data).
    pub async fn update_data<D, P, F, Fut>(&self, mut dispatch: D, api: F, partial: P) -> SliceAction<T>
    where
        D: FnMut(SliceAction<T>),
        F: FnOnce(P) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        dispatch(self.update_data_phase(AsyncPhase::Pending));
        let settled = self.update_data_phase(settle(api(partial).await));
        dispatch(settled.clone());
        settled
    }
}

fn settle<T>(result: Result<T, ApiError>) -> AsyncPhase<T> {
    match result {
        Ok(data) => AsyncPhase::Fulfilled(data),
        Err(error) => AsyncPhase::Rejected(error),
    }
}
