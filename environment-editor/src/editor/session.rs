//! The environment currently open in the editor and the commands that act on it.

use bevy::prelude::*;

use super::controller::EditorContext;
use super::marking_store::MarkingId;
use super::transform_store::ScanId;
use crate::persistence::dto::EnvironmentDto;

/// Environment open in the editor.
#[derive(Resource, Debug, Default)]
pub struct EnvironmentSession {
    pub environment_id: Option<String>,
    /// Last snapshot received from the server. Whole-environment saves start from it.
    pub environment: Option<EnvironmentDto>,
    /// Scan transforms may only be edited while this is set.
    pub editable: bool,
    /// Author configured for new markings. Falls back to whoever scanned the environment.
    pub configured_author: Option<String>,
}

impl EnvironmentSession {
    pub fn context(&self) -> EditorContext {
        EditorContext {
            editable: self.editable,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.environment.is_some()
    }

    pub fn author_id(&self) -> Option<String> {
        self.configured_author
            .clone()
            .filter(|author| !author.trim().is_empty())
            .or_else(|| {
                self.environment
                    .as_ref()
                    .and_then(|environment| environment.scanned_by.as_ref())
                    .map(|scanned_by| scanned_by.id.clone())
            })
    }

    /// Closes the environment, keeping the configured author.
    pub fn close(&mut self) {
        self.environment_id = None;
        self.environment = None;
        self.editable = false;
    }
}

/// Requests that act on the open environment as a whole or reach the server.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum EnvironmentCommand {
    Load(String),
    /// `false` discards unsaved scan transforms.
    SetEditable(bool),
    SaveEnvironment,
    SaveMarkings,
    ResumeSave,
    CancelSave,
    SaveOrigin,
    ClearOrigin,
    DeleteMarking(MarkingId),
    RetryDelete(MarkingId),
    DeleteScan(ScanId),
    DeleteEnvironment,
}

/// Lifecycle milestones of the open environment.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Loaded { environment_id: String },
    LoadFailed { environment_id: String, message: String },
    Saved { environment_id: String },
    OriginSaved { environment_id: String },
    Deleted { environment_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::scripted::environment_fixture;

    #[test]
    fn configured_author_wins_over_scanner() {
        let mut session = EnvironmentSession {
            environment: Some(environment_fixture("env-1", &[], &[])),
            configured_author: Some("author-9".into()),
            ..default()
        };
        assert_eq!(session.author_id().as_deref(), Some("author-9"));

        session.configured_author = Some("  ".into());
        assert_eq!(session.author_id().as_deref(), Some("scanner-1"));
    }

    #[test]
    fn no_author_without_environment_or_configuration() {
        assert_eq!(EnvironmentSession::default().author_id(), None);
    }

    #[test]
    fn closing_keeps_the_configured_author() {
        let mut session = EnvironmentSession {
            environment_id: Some("env-1".into()),
            environment: Some(environment_fixture("env-1", &[], &[])),
            editable: true,
            configured_author: Some("author-9".into()),
        };
        session.close();
        assert!(!session.is_loaded());
        assert!(!session.editable);
        assert_eq!(session.author_id().as_deref(), Some("author-9"));
    }
}
