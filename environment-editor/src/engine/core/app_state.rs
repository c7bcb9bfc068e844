use bevy::prelude::*;

/// Application lifecycle, from reading settings to an environment being open.
#[derive(States, Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum AppState {
    #[default]
    LoadingConfig,
    /// Settings are loaded but no environment is open.
    Idle,
    FetchingEnvironment,
    Ready,
    /// Settings or the environment could not be loaded. Shows a full-view error.
    LoadFailed,
}

/// Message shown while in `AppState::LoadFailed`.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct LoadFailure {
    pub message: Option<String>,
}

impl LoadFailure {
    pub fn set(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn clear(&mut self) {
        self.message = None;
    }
}

pub fn log_state_transitions(mut transitions: EventReader<StateTransitionEvent<AppState>>) {
    for transition in transitions.read() {
        if let (Some(from), Some(to)) = (transition.exited, transition.entered) {
            if from != to {
                info!("→ App state {:?} -> {:?}", from, to);
            }
        }
    }
}
