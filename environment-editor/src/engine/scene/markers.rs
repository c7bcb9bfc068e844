use bevy::prelude::*;
use constants::render_settings::{
    CONFIRMED_MARKER_COLOUR, DELETE_FAILED_MARKER_COLOUR, DELETING_MARKER_COLOUR, MARKER_RADIUS,
    ORIGIN_COLOUR, ORIGIN_MARKER_RADIUS, PENDING_MARKER_COLOUR, PICK_PREVIEW_COLOUR,
    PICK_PREVIEW_RADIUS, UNSUPPORTED_SCAN_COLOUR, UNSUPPORTED_SCAN_MARKER_SIZE,
};

use crate::editor::controller::EditorController;
use crate::editor::marking_store::{Marking, MarkingId, MarkingStore, RemovalState};
use crate::editor::origin_store::OriginStore;
use crate::engine::assets::editor_config::EditorConfig;
use crate::engine::loading::scan_loader::{ScanLoad, ScanRoot};

#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct MarkingMarker(pub MarkingId);

#[derive(Component)]
pub struct OriginMarker;

#[derive(Component)]
pub struct PickPreviewMarker;

/// Stand-in shown for a scan that cannot be rendered.
#[derive(Component)]
pub struct ScanFallbackMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerStyle {
    Confirmed,
    Pending,
    Deleting,
    DeleteFailed,
}

impl MarkerStyle {
    pub fn of(marking: &Marking) -> Self {
        match (&marking.removal, marking.id.is_pending()) {
            (RemovalState::Deleting, _) => Self::Deleting,
            (RemovalState::DeleteFailed(_), _) => Self::DeleteFailed,
            (RemovalState::Present, true) => Self::Pending,
            (RemovalState::Present, false) => Self::Confirmed,
        }
    }
}

/// Meshes and materials shared by every marker.
#[derive(Resource)]
pub struct MarkerAssets {
    sphere: Handle<Mesh>,
    cube: Handle<Mesh>,
    confirmed: Handle<StandardMaterial>,
    pending: Handle<StandardMaterial>,
    deleting: Handle<StandardMaterial>,
    delete_failed: Handle<StandardMaterial>,
    preview: Handle<StandardMaterial>,
    origin: Handle<StandardMaterial>,
    fallback: Handle<StandardMaterial>,
}

impl MarkerAssets {
    fn material(&self, style: MarkerStyle) -> Handle<StandardMaterial> {
        match style {
            MarkerStyle::Confirmed => self.confirmed.clone(),
            MarkerStyle::Pending => self.pending.clone(),
            MarkerStyle::Deleting => self.deleting.clone(),
            MarkerStyle::DeleteFailed => self.delete_failed.clone(),
        }
    }
}

impl FromWorld for MarkerAssets {
    fn from_world(world: &mut World) -> Self {
        let mut meshes = world.resource_mut::<Assets<Mesh>>();
        let sphere = meshes.add(Sphere::new(1.0));
        let cube = meshes.add(Cuboid::from_length(1.0));

        let mut materials = world.resource_mut::<Assets<StandardMaterial>>();
        let mut unlit = |colour: Color| {
            materials.add(StandardMaterial {
                base_color: colour,
                unlit: true,
                ..default()
            })
        };

        Self {
            sphere,
            cube,
            confirmed: unlit(CONFIRMED_MARKER_COLOUR),
            pending: unlit(PENDING_MARKER_COLOUR),
            deleting: unlit(DELETING_MARKER_COLOUR),
            delete_failed: unlit(DELETE_FAILED_MARKER_COLOUR),
            preview: unlit(PICK_PREVIEW_COLOUR),
            origin: unlit(ORIGIN_COLOUR),
            fallback: unlit(UNSUPPORTED_SCAN_COLOUR),
        }
    }
}

fn marker_scale(config: Option<&EditorConfig>) -> f32 {
    config.map_or(1.0, |config| config.marker_scale)
}

/// Rebuilds marking markers whenever the marking store changes.
pub fn sync_marking_markers(
    mut commands: Commands,
    store: Res<MarkingStore>,
    config: Option<Res<EditorConfig>>,
    assets: Res<MarkerAssets>,
    markers: Query<Entity, With<MarkingMarker>>,
) {
    if !store.is_changed() {
        return;
    }
    for entity in &markers {
        commands.entity(entity).despawn();
    }

    let radius = MARKER_RADIUS * marker_scale(config.as_deref());
    for marking in store.iter() {
        commands.spawn((
            MarkingMarker(marking.id.clone()),
            Mesh3d(assets.sphere.clone()),
            MeshMaterial3d(assets.material(MarkerStyle::of(marking))),
            Transform::from_translation(marking.position).with_scale(Vec3::splat(radius)),
        ));
    }
}

pub fn sync_origin_marker(
    mut commands: Commands,
    store: Res<OriginStore>,
    config: Option<Res<EditorConfig>>,
    assets: Res<MarkerAssets>,
    markers: Query<Entity, With<OriginMarker>>,
) {
    if !store.is_changed() {
        return;
    }
    for entity in &markers {
        commands.entity(entity).despawn();
    }

    if let Some(origin) = store.get() {
        let radius = ORIGIN_MARKER_RADIUS * marker_scale(config.as_deref());
        commands.spawn((
            OriginMarker,
            Mesh3d(assets.sphere.clone()),
            MeshMaterial3d(assets.origin.clone()),
            origin.to_transform().with_scale(Vec3::splat(radius)),
        ));
    }
}

/// Shows the picked point while it waits for a label.
pub fn sync_pick_preview(
    mut commands: Commands,
    controller: Res<EditorController>,
    config: Option<Res<EditorConfig>>,
    assets: Res<MarkerAssets>,
    mut previews: Query<(Entity, &mut Transform), With<PickPreviewMarker>>,
) {
    if !controller.is_changed() {
        return;
    }

    let radius = PICK_PREVIEW_RADIUS * marker_scale(config.as_deref());
    match (controller.state().pending_pick(), previews.single_mut()) {
        (Some(pick), Ok((_, mut transform))) => {
            transform.translation = pick.point;
        }
        (Some(pick), Err(_)) => {
            commands.spawn((
                PickPreviewMarker,
                Mesh3d(assets.sphere.clone()),
                MeshMaterial3d(assets.preview.clone()),
                Transform::from_translation(pick.point).with_scale(Vec3::splat(radius)),
            ));
        }
        (None, Ok((entity, _))) => {
            commands.entity(entity).despawn();
        }
        (None, Err(_)) => {}
    }
}

/// Adds a fallback cube to scans that cannot be rendered.
pub fn attach_scan_fallbacks(
    mut commands: Commands,
    assets: Res<MarkerAssets>,
    scans: Query<(Entity, &ScanLoad), (With<ScanRoot>, Changed<ScanLoad>)>,
    fallbacks: Query<&ChildOf, With<ScanFallbackMarker>>,
) {
    for (entity, load) in &scans {
        if !matches!(load, ScanLoad::Unsupported | ScanLoad::Failed(_)) {
            continue;
        }
        if fallbacks.iter().any(|parent| parent.parent() == entity) {
            continue;
        }
        commands.entity(entity).with_children(|scan| {
            scan.spawn((
                ScanFallbackMarker,
                Mesh3d(assets.cube.clone()),
                MeshMaterial3d(assets.fallback.clone()),
                Transform::from_scale(Vec3::splat(UNSUPPORTED_SCAN_MARKER_SIZE)),
            ));
        });
    }
}
