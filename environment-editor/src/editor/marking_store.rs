use std::fmt;

use bevy::prelude::*;
use chrono::{DateTime, Utc};
use constants::api::TEMP_ID_PREFIX;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a marking. Pending identities are generated locally and never
/// collide with server identities because they carry the reserved prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum MarkingId {
    Confirmed(String),
    Pending(Uuid),
}

impl MarkingId {
    pub fn new_pending() -> Self {
        Self::Pending(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Self {
        value
            .strip_prefix(TEMP_ID_PREFIX)
            .and_then(|rest| Uuid::parse_str(rest).ok())
            .map(Self::Pending)
            .unwrap_or_else(|| Self::Confirmed(value.to_string()))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl fmt::Display for MarkingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed(id) => f.write_str(id),
            Self::Pending(uuid) => write!(f, "{TEMP_ID_PREFIX}{uuid}"),
        }
    }
}

impl From<MarkingId> for String {
    fn from(id: MarkingId) -> Self {
        id.to_string()
    }
}

impl From<String> for MarkingId {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// Server-side removal progress of a confirmed marking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum RemovalState {
    Present,
    Deleting,
    DeleteFailed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marking {
    pub id: MarkingId,
    pub position: Vec3,
    pub label: String,
    pub link: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub removal: RemovalState,
}

/// What the caller must do to finish removing a marking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// The marking only existed locally and is already gone.
    Local,
    /// The marking is flagged as deleting until the server confirms this id.
    Remote(String),
}

/// Ordered collection of markings. Order is display order.
#[derive(Resource, Debug, Default)]
pub struct MarkingStore {
    markings: Vec<Marking>,
}

impl MarkingStore {
    pub fn add_pending(&mut self, position: Vec3, label: &str, link: Option<String>) -> Marking {
        let marking = Marking {
            id: MarkingId::new_pending(),
            position,
            label: label.to_string(),
            link: link.filter(|link| !link.trim().is_empty()),
            created_at: Some(Utc::now()),
            removal: RemovalState::Present,
        };
        self.markings.push(marking.clone());
        marking
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marking> {
        self.markings.iter()
    }

    pub fn get(&self, id: &MarkingId) -> Option<&Marking> {
        self.markings.iter().find(|marking| &marking.id == id)
    }

    pub fn len(&self) -> usize {
        self.markings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markings.is_empty()
    }

    /// Markings not yet accepted by the server, in store order.
    pub fn pending(&self) -> impl Iterator<Item = &Marking> {
        self.markings.iter().filter(|marking| marking.id.is_pending())
    }

    /// Removes a marking locally without any server interaction.
    pub fn remove(&mut self, id: &MarkingId) -> Option<Marking> {
        let index = self.markings.iter().position(|marking| &marking.id == id)?;
        Some(self.markings.remove(index))
    }

    /// Replaces a pending marking with its confirmed record, keeping its place in the order.
    pub fn promote(&mut self, pending: &MarkingId, confirmed: Marking) -> bool {
        match self.markings.iter_mut().find(|marking| &marking.id == pending) {
            Some(slot) => {
                *slot = confirmed;
                true
            }
            None => false,
        }
    }

    /// Starts removing a marking. Pending markings go at once; confirmed ones
    /// stay listed as deleting until `complete_removal` or `fail_removal`.
    pub fn begin_removal(&mut self, id: &MarkingId) -> Option<Removal> {
        match id {
            MarkingId::Pending(_) => self.remove(id).map(|_| Removal::Local),
            MarkingId::Confirmed(server_id) => {
                let marking = self.markings.iter_mut().find(|marking| &marking.id == id)?;
                if marking.removal == RemovalState::Deleting {
                    return None;
                }
                marking.removal = RemovalState::Deleting;
                Some(Removal::Remote(server_id.clone()))
            }
        }
    }

    /// Re-issues a failed removal. Returns the server id to delete.
    pub fn retry_removal(&mut self, id: &MarkingId) -> Option<String> {
        let marking = self.markings.iter_mut().find(|marking| &marking.id == id)?;
        match (&marking.id, &marking.removal) {
            (MarkingId::Confirmed(server_id), RemovalState::DeleteFailed(_)) => {
                let server_id = server_id.clone();
                marking.removal = RemovalState::Deleting;
                Some(server_id)
            }
            _ => None,
        }
    }

    pub fn complete_removal(&mut self, id: &MarkingId) -> bool {
        self.remove(id).is_some()
    }

    pub fn fail_removal(&mut self, id: &MarkingId, message: String) -> bool {
        match self.markings.iter_mut().find(|marking| &marking.id == id) {
            Some(marking) => {
                marking.removal = RemovalState::DeleteFailed(message);
                true
            }
            None => false,
        }
    }

    pub fn replace_all(&mut self, markings: Vec<Marking>) {
        self.markings = markings;
    }

    pub fn clear(&mut self) {
        self.markings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn confirmed(id: &str) -> Marking {
        Marking {
            id: MarkingId::Confirmed(id.to_string()),
            position: Vec3::ZERO,
            label: id.to_uppercase(),
            link: None,
            created_at: None,
            removal: RemovalState::Present,
        }
    }

    #[test]
    fn pending_identity_is_recognisable_from_its_text() {
        let id = MarkingId::new_pending();
        let text = id.to_string();

        assert!(text.starts_with(TEMP_ID_PREFIX));
        assert_eq!(MarkingId::parse(&text), id);
        assert_eq!(
            MarkingId::parse("6650f1c2e4b0"),
            MarkingId::Confirmed("6650f1c2e4b0".into())
        );
        assert_eq!(
            MarkingId::parse("temp-not-a-uuid"),
            MarkingId::Confirmed("temp-not-a-uuid".into())
        );
    }

    #[test]
    fn identity_serialises_as_plain_string() {
        let id = MarkingId::Confirmed("abc".into());
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("abc"));
        let parsed: MarkingId = serde_json::from_value(serde_json::json!("abc")).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn add_pending_appends_in_order() {
        let mut store = MarkingStore::default();
        store.replace_all(vec![confirmed("a")]);

        let added = store.add_pending(Vec3::new(1.0, 2.0, 3.0), "Pump", Some(" ".into()));

        assert!(added.id.is_pending());
        assert_eq!(added.link, None);
        assert_eq!(store.len(), 2);
        assert_eq!(store.iter().last(), Some(&added));
        assert_eq!(store.pending().count(), 1);
    }

    #[test]
    fn promote_keeps_position_in_order() {
        let mut store = MarkingStore::default();
        let first = store.add_pending(Vec3::X, "one", None);
        store.add_pending(Vec3::Y, "two", None);

        assert!(store.promote(&first.id, confirmed("srv-1")));

        let ids: Vec<String> = store.iter().map(|marking| marking.id.to_string()).collect();
        assert_eq!(ids[0], "srv-1");
        assert!(ids[1].starts_with(TEMP_ID_PREFIX));
    }

    #[test]
    fn pending_removal_is_local_and_immediate() {
        let mut store = MarkingStore::default();
        let pending = store.add_pending(Vec3::X, "draft", None);

        assert_eq!(store.begin_removal(&pending.id), Some(Removal::Local));
        assert!(store.is_empty());
    }

    #[test]
    fn confirmed_removal_waits_for_the_server() {
        let mut store = MarkingStore::default();
        store.replace_all(vec![confirmed("a")]);
        let id = MarkingId::Confirmed("a".into());

        assert_eq!(store.begin_removal(&id), Some(Removal::Remote("a".into())));
        assert_eq!(store.get(&id).unwrap().removal, RemovalState::Deleting);
        assert_eq!(store.begin_removal(&id), None);

        assert!(store.fail_removal(&id, "Marking not found".into()));
        assert_eq!(
            store.get(&id).unwrap().removal,
            RemovalState::DeleteFailed("Marking not found".into())
        );

        assert_eq!(store.retry_removal(&id), Some("a".into()));
        assert!(store.complete_removal(&id));
        assert!(store.is_empty());
    }

    #[test]
    fn retry_requires_a_failed_removal() {
        let mut store = MarkingStore::default();
        store.replace_all(vec![confirmed("a")]);
        assert_eq!(store.retry_removal(&MarkingId::Confirmed("a".into())), None);
    }
}
