use bevy::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// User-facing message raised by a command, a load or a gateway call.
#[derive(Event, Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Most recent notice, kept for the native overlay.
#[derive(Resource, Debug, Default)]
pub struct LastNotice(pub Option<Notice>);

pub fn remember_last_notice(mut notices: EventReader<Notice>, mut last: ResMut<LastNotice>) {
    if let Some(notice) = notices.read().last() {
        last.0 = Some(notice.clone());
    }
}
