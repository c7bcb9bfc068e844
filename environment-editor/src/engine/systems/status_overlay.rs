use bevy::prelude::*;

use crate::editor::controller::EditorController;
use crate::editor::marking_store::MarkingStore;
use crate::editor::notice::{LastNotice, NoticeLevel};
use crate::engine::core::app_state::{AppState, LoadFailure};
use crate::engine::loading::scan_loader::ScanLoad;
use crate::persistence::save_batch::MarkingSaveQueue;

#[derive(Component)]
pub struct StatusText;

#[derive(Component)]
pub struct NoticeText;

/// Full-view panel shown in `AppState::LoadFailed`.
#[derive(Component)]
pub struct LoadFailurePanel;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanCounts {
    pub loading: usize,
    pub loaded: usize,
    pub failed: usize,
    pub unsupported: usize,
}

impl ScanCounts {
    pub fn tally<'a>(loads: impl IntoIterator<Item = &'a ScanLoad>) -> Self {
        let mut counts = Self::default();
        for load in loads {
            match load {
                ScanLoad::Loading | ScanLoad::Deleting => counts.loading += 1,
                ScanLoad::Loaded => counts.loaded += 1,
                ScanLoad::Failed(_) => counts.failed += 1,
                ScanLoad::Unsupported => counts.unsupported += 1,
            }
        }
        counts
    }
}

pub fn status_line(mode: &str, scans: ScanCounts, markings: usize, pending: usize) -> String {
    let mut line = format!(
        "Mode: {mode} | Scans: {} loaded",
        scans.loaded
    );
    if scans.loading > 0 {
        line.push_str(&format!(", {} loading", scans.loading));
    }
    if scans.failed > 0 {
        line.push_str(&format!(", {} failed", scans.failed));
    }
    if scans.unsupported > 0 {
        line.push_str(&format!(", {} unsupported", scans.unsupported));
    }
    line.push_str(&format!(" | Markings: {markings}"));
    if pending > 0 {
        line.push_str(&format!(" ({pending} unsaved)"));
    }
    line
}

pub fn create_status_overlay(commands: &mut Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(12.0),
                    left: Val::Px(12.0),
                    ..default()
                },
                StatusText,
            ));
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(12.0),
                    left: Val::Px(12.0),
                    ..default()
                },
                NoticeText,
            ));
        });
}

pub fn update_status_text(
    controller: Res<EditorController>,
    markings: Res<MarkingStore>,
    saves: Res<MarkingSaveQueue>,
    scans: Query<&ScanLoad>,
    mut texts: Query<&mut Text, With<StatusText>>,
) {
    let mut line = status_line(
        controller.state().mode().to_string(),
        ScanCounts::tally(&scans),
        markings.len(),
        markings.pending().count(),
    );
    if let Some(batch) = saves.batch.as_ref().filter(|_| saves.is_running()) {
        let progress = batch.progress();
        line.push_str(&format!(
            " | Saving {}/{}",
            progress.succeeded, progress.total
        ));
    }

    for mut text in &mut texts {
        if text.0 != line {
            text.0 = line.clone();
        }
    }
}

pub fn update_notice_text(
    last: Res<LastNotice>,
    mut texts: Query<(&mut Text, &mut TextColor), With<NoticeText>>,
) {
    if !last.is_changed() {
        return;
    }
    let Some(notice) = last.0.as_ref() else {
        return;
    };
    for (mut text, mut colour) in &mut texts {
        text.0 = notice.message.clone();
        colour.0 = match notice.level {
            NoticeLevel::Info => Color::WHITE,
            NoticeLevel::Error => Color::srgb(1.0, 0.35, 0.35),
        };
    }
}

pub fn show_load_failure(mut commands: Commands, failure: Res<LoadFailure>) {
    let message = failure
        .message
        .clone()
        .unwrap_or_else(|| "The environment could not be loaded".to_string());
    commands
        .spawn((
            LoadFailurePanel,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.85)),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(message),
                TextFont {
                    font_size: 22.0,
                    ..default()
                },
                TextColor(Color::srgb(1.0, 0.35, 0.35)),
            ));
        });
}

pub fn hide_load_failure(mut commands: Commands, panels: Query<Entity, With<LoadFailurePanel>>) {
    for entity in &panels {
        commands.entity(entity).despawn();
    }
}

/// Registers the overlay systems for native builds.
pub fn add_status_overlay(app: &mut App) {
    app.add_systems(
        Update,
        (update_status_text, update_notice_text),
    )
    .add_systems(OnEnter(AppState::LoadFailed), show_load_failure)
    .add_systems(OnExit(AppState::LoadFailed), hide_load_failure);
}
