//! Sequential submission of pending markings.
//!
//! A batch snapshots the pending markings in store order and submits them one
//! at a time. The first failure halts the batch: earlier items stay confirmed,
//! later ones stay pending and queued. A halted batch can be resumed, and any
//! batch can be cancelled, which drops queued items but lets an in-flight
//! submission finish.

use bevy::prelude::*;
use serde::Serialize;

use super::dto::{AddMarkingRequest, ApiMarkingDto};
use super::gateway::{GatewayCall, PersistenceGateway};
use crate::editor::marking_store::{Marking, MarkingId, MarkingStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum SaveStatus {
    Queued,
    InFlight,
    Succeeded,
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveItem {
    pub marking: MarkingId,
    #[serde(flatten)]
    pub status: SaveStatus,
    /// Server identity assigned on success.
    pub confirmed_id: Option<String>,
}

/// Overall progress reported to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveProgress {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub finished: bool,
    pub halted: bool,
    pub items: Vec<SaveItem>,
}

pub struct SaveBatch {
    environment_id: String,
    author_id: String,
    items: Vec<SaveItem>,
    in_flight: Option<(usize, GatewayCall<ApiMarkingDto>)>,
    halted: bool,
}

impl SaveBatch {
    pub fn new(environment_id: &str, author_id: &str, store: &MarkingStore) -> Self {
        let items = store
            .pending()
            .map(|marking| SaveItem {
                marking: marking.id.clone(),
                status: SaveStatus::Queued,
                confirmed_id: None,
            })
            .collect();

        Self {
            environment_id: environment_id.to_string(),
            author_id: author_id.to_string(),
            items,
            in_flight: None,
            halted: false,
        }
    }

    pub fn items(&self) -> &[SaveItem] {
        &self.items
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// True while `marking` is being submitted.
    pub fn is_in_flight(&self, marking: &MarkingId) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|(index, _)| self.items[*index].marking == *marking)
    }

    pub fn is_finished(&self) -> bool {
        self.in_flight.is_none()
            && (self.halted || !self.items.iter().any(|item| item.status == SaveStatus::Queued))
    }

    /// Advances the batch by at most one completion and one submission.
    /// Returns true when any item changed status.
    pub fn step(&mut self, gateway: &dyn PersistenceGateway, store: &mut MarkingStore) -> bool {
        let mut changed = false;

        if let Some((index, call)) = &self.in_flight {
            let Some(result) = call.poll() else {
                return false;
            };
            let index = *index;
            self.in_flight = None;
            changed = true;

            let item = &mut self.items[index];
            match result {
                Ok(record) => {
                    // A record without coordinates keeps the submitted position.
                    let confirmed = record.to_marking().or_else(|| {
                        store.get(&item.marking).map(|marking| Marking {
                            id: MarkingId::Confirmed(record.id.clone()),
                            ..marking.clone()
                        })
                    });
                    if let Some(confirmed) = confirmed {
                        store.promote(&item.marking, confirmed);
                    }
                    item.confirmed_id = Some(record.id);
                    item.status = SaveStatus::Succeeded;
                }
                Err(error) => {
                    warn!("Saving marking {} failed: {}", item.marking, error);
                    item.status = SaveStatus::Failed(error.user_message());
                    self.halted = true;
                }
            }
        }

        if self.halted {
            return changed;
        }

        while let Some(index) = self
            .items
            .iter()
            .position(|item| item.status == SaveStatus::Queued)
        {
            let item = &mut self.items[index];
            let Some(marking) = store.get(&item.marking) else {
                // Removed locally while waiting.
                item.status = SaveStatus::Cancelled;
                changed = true;
                continue;
            };

            let request = AddMarkingRequest::new(&self.environment_id, &self.author_id, marking);
            item.status = SaveStatus::InFlight;
            self.in_flight = Some((index, gateway.add_marking(&request)));
            return true;
        }

        changed
    }

    /// Re-queues the failed item and clears the halt.
    pub fn resume(&mut self) -> bool {
        if !self.halted {
            return false;
        }
        for item in &mut self.items {
            if matches!(item.status, SaveStatus::Failed(_)) {
                item.status = SaveStatus::Queued;
            }
        }
        self.halted = false;
        true
    }

    /// Cancels every queued item. An in-flight submission still completes.
    pub fn cancel(&mut self) -> bool {
        let mut changed = false;
        for item in &mut self.items {
            if matches!(item.status, SaveStatus::Queued | SaveStatus::Failed(_)) {
                item.status = SaveStatus::Cancelled;
                changed = true;
            }
        }
        self.halted = false;
        changed
    }

    pub fn progress(&self) -> SaveProgress {
        let count = |predicate: fn(&SaveStatus) -> bool| {
            self.items.iter().filter(|item| predicate(&item.status)).count()
        };
        SaveProgress {
            total: self.items.len(),
            succeeded: count(|status| *status == SaveStatus::Succeeded),
            failed: count(|status| matches!(status, SaveStatus::Failed(_))),
            cancelled: count(|status| *status == SaveStatus::Cancelled),
            finished: self.is_finished(),
            halted: self.halted,
            items: self.items.clone(),
        }
    }
}

/// The save-all batch currently running, if any.
#[derive(Resource, Default)]
pub struct MarkingSaveQueue {
    pub batch: Option<SaveBatch>,
}

impl MarkingSaveQueue {
    pub fn is_running(&self) -> bool {
        self.batch.as_ref().is_some_and(|batch| !batch.is_finished())
    }

    pub fn is_in_flight(&self, marking: &MarkingId) -> bool {
        self.batch
            .as_ref()
            .is_some_and(|batch| batch.is_in_flight(marking))
    }
}
