//! Wire shapes of the environment API.
//!
//! Field names follow the server's camelCase JSON. Fields the editor does not
//! interpret are carried through `extra` so a whole-environment update posts
//! back everything the server sent.

use bevy::log::warn;
use bevy::math::Vec3;
use chrono::{DateTime, Utc};
use constants::api::UNNAMED_MARKING_LABEL;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::editor::marking_store::{Marking, MarkingId, RemovalState};
use crate::editor::origin_store::Origin;
use crate::editor::transform_store::ScanTransform;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedBy {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDto {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_editable: bool,
    #[serde(default)]
    pub origin_position: Option<Vec<f32>>,
    #[serde(default)]
    pub origin_rotation: Option<Vec<f32>>,
    #[serde(default)]
    pub scanned_by: Option<ScannedBy>,
    #[serde(default)]
    pub scanned_date: Option<String>,
    #[serde(default)]
    pub scans: Vec<ScanDto>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markings: Option<Vec<ApiMarkingDto>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanDto {
    pub id: String,
    #[serde(default)]
    pub scan_name: String,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub is_editable: bool,
    #[serde(default)]
    pub position: Option<Vec<f32>>,
    #[serde(default)]
    pub rotation: Option<Vec<f32>>,
    #[serde(default)]
    pub scale: Option<Vec<f32>>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub textures: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMarkingDto {
    pub id: String,
    #[serde(default)]
    pub environment_id: String,
    #[serde(default)]
    pub created_by_id: String,
    /// Null or missing coordinates deserialise as `None`.
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default)]
    pub z: Option<f32>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Value>>,
}

/// Body of a single new marking submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMarkingRequest {
    pub environment_id: String,
    pub created_by_id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub remark: String,
    pub metadata: String,
    pub url: String,
}

/// Body of an origin submission. The server expects every component as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginRequest {
    pub environment_id: String,
    pub position_x: String,
    pub position_y: String,
    pub position_z: String,
    pub rotation_x: String,
    pub rotation_y: String,
    pub rotation_z: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDto {
    #[serde(default)]
    pub area_scanned: f64,
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub total_markings: u64,
    #[serde(default)]
    pub total_suggestions: u64,
    #[serde(default)]
    pub recent_areas: Vec<RecentArea>,
    #[serde(default)]
    pub recent_suggestions: Vec<RecentSuggestion>,
    #[serde(default)]
    pub recent_markings: Vec<RecentMarking>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentArea {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSuggestion {
    pub id: String,
    #[serde(default)]
    pub marking_id: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentMarking {
    pub id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub remark: String,
    #[serde(default)]
    pub environment_id: String,
    #[serde(default)]
    pub environment_title: String,
}

impl EnvironmentDto {
    /// Origin as stored on the environment, if one has been set.
    pub fn origin(&self) -> Option<Origin> {
        Origin::from_parts(
            self.origin_position.as_deref(),
            self.origin_rotation.as_deref(),
        )
    }

    /// Markings with a usable position. Records missing a coordinate are skipped.
    pub fn markings(&self) -> Vec<Marking> {
        self.markings
            .iter()
            .flatten()
            .filter_map(|record| {
                let marking = record.to_marking();
                if marking.is_none() {
                    warn!("Skipping marking {} without a valid position", record.id);
                }
                marking
            })
            .collect()
    }

    /// Copy of this environment carrying the given scan transforms, ready for an update submission.
    pub fn with_transforms<F>(&self, mut transform_of: F, is_editable: bool) -> Self
    where
        F: FnMut(&str) -> ScanTransform,
    {
        let mut updated = self.clone();
        updated.is_editable = is_editable;
        updated.markings = None;
        for scan in &mut updated.scans {
            let transform = transform_of(&scan.id);
            scan.position = Some(transform.position.to_vec());
            scan.rotation = Some(transform.rotation.to_vec());
            scan.scale = Some(transform.scale.to_vec());
        }
        updated
    }
}

impl ScanDto {
    pub fn transform(&self) -> ScanTransform {
        ScanTransform::normalized(
            self.position.as_deref(),
            self.rotation.as_deref(),
            self.scale.as_deref(),
        )
    }
}

impl ApiMarkingDto {
    pub fn position(&self) -> Option<Vec3> {
        let position = Vec3::new(self.x?, self.y?, self.z?);
        position.is_finite().then_some(position)
    }

    /// `None` when the record has no usable position.
    pub fn to_marking(&self) -> Option<Marking> {
        let position = self.position()?;
        let label = self
            .remark
            .as_deref()
            .map(str::trim)
            .filter(|remark| !remark.is_empty())
            .unwrap_or(UNNAMED_MARKING_LABEL)
            .to_string();

        Some(Marking {
            id: MarkingId::Confirmed(self.id.clone()),
            position,
            label,
            link: self.url.clone().filter(|url| !url.is_empty()),
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
            removal: RemovalState::Present,
        })
    }
}

impl AddMarkingRequest {
    pub fn new(environment_id: &str, author_id: &str, marking: &Marking) -> Self {
        Self {
            environment_id: environment_id.to_string(),
            created_by_id: author_id.to_string(),
            x: marking.position.x,
            y: marking.position.y,
            z: marking.position.z,
            remark: marking.label.clone(),
            metadata: String::new(),
            url: marking.link.clone().unwrap_or_default(),
        }
    }
}

impl OriginRequest {
    pub fn new(environment_id: &str, origin: &Origin) -> Self {
        let [px, py, pz] = origin.position;
        let [rx, ry, rz] = origin.rotation;
        Self {
            environment_id: environment_id.to_string(),
            position_x: px.to_string(),
            position_y: py.to_string(),
            position_z: pz.to_string(),
            rotation_x: rx.to_string(),
            rotation_y: ry.to_string(),
            rotation_z: rz.to_string(),
        }
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}
