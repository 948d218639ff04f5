//! The per-block-type default configuration store.
//!
//! ## Learning: Splitting an Async Operation
//!
//! A save has to run in the background while the user keeps editing. If
//! `save` were a single `async fn(&mut self)`, the exclusive borrow would last
//! for the whole network round trip and no edit could happen meanwhile.
//!
//! Instead the store hands out a `SaveRequest` (a snapshot plus the gateway),
//! the UI loop runs it wherever it likes, and feeds the `SaveOutcome` back
//! through `complete_save`:
//!
//! ```ignore
//! if let Some(request) = store.request_save()? {
//!     return Task::perform(request.send(), Message::SaveFinished);
//! }
//! // later, in update():
//! Message::SaveFinished(outcome) => {
//!     let completion = store.complete_save(outcome)?;
//!     if let Some(next) = completion.follow_up {
//!         return Task::perform(next.send(), Message::SaveFinished);
//!     }
//! }
//! ```
//!
//! ## State Machine
//!
//! ```text
//!            open()               request_save()
//! Closed ───────────▶ Open ─────────────────────▶ Saving
//!   ▲                  ▲                            │
//!   │                  └──────── save failed ───────┤
//!   └───────────────────────── save succeeded ──────┘
//! ```
//!
//! Edits made while `Saving` are applied at once but belong to the next save.
//! A `request_save` made while `Saving` is queued: when the flight lands the
//! store issues exactly one follow-up save of the then-current map.

use std::fmt;
use std::sync::Arc;

use blockdefaults_model::{
    BlockSettings, BlockTypeId, ConfigurationMap, FieldKey, FieldValue, SaveError, apply_field,
    replace_block, resolve,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::event::{EventBus, StoreEvent};
use crate::gateway::PersistenceGateway;
use crate::schema::BlockSchema;
use crate::{CoreError, CoreResult};

/// Identifies one save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaveId(Uuid);

impl SaveId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the editing surface is active and whether a save is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    pub is_open: bool,
    pub is_saving: bool,
}

/// Lifecycle state derived from the session flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Closed,
    Open,
    Saving,
}

/// A save that has been issued but not yet run.
///
/// Holds the snapshot taken at `request_save` time; later edits are not part
/// of it.
pub struct SaveRequest {
    id: SaveId,
    snapshot: ConfigurationMap,
    gateway: Arc<dyn PersistenceGateway>,
}

impl SaveRequest {
    pub fn id(&self) -> SaveId {
        self.id
    }

    /// The map this request will persist.
    pub fn snapshot(&self) -> &ConfigurationMap {
        &self.snapshot
    }

    /// Runs the save. A single attempt; no retry, no timeout.
    pub async fn send(self) -> SaveOutcome {
        let result = self.gateway.save(&self.snapshot).await;
        SaveOutcome {
            id: self.id,
            snapshot: self.snapshot,
            result,
        }
    }
}

impl fmt::Debug for SaveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveRequest")
            .field("id", &self.id)
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

/// The result of running a `SaveRequest`.
#[derive(Debug)]
pub struct SaveOutcome {
    pub id: SaveId,
    pub snapshot: ConfigurationMap,
    pub result: Result<(), SaveError>,
}

/// What `complete_save` did with an outcome.
#[derive(Debug)]
pub struct SaveCompletion {
    /// The landed save's result; an error is for display, local edits are kept.
    pub result: Result<(), SaveError>,
    /// A queued save that has just been issued and must be run next.
    pub follow_up: Option<SaveRequest>,
}

/// Owns the configuration map for one editing session.
///
/// ## Thread Safety
///
/// Designed to be owned by the UI thread. Only `SaveRequest::send` leaves
/// it, and that touches nothing but its own snapshot.
pub struct ConfigurationStore {
    /// Persistence backend
    gateway: Arc<dyn PersistenceGateway>,

    /// Most recent local state
    configuration: ConfigurationMap,

    /// Last map known to be persisted
    baseline: ConfigurationMap,

    /// Open/saving flags
    session: SessionState,

    /// The save currently in flight
    in_flight: Option<SaveId>,

    /// A save was requested during the current flight
    save_queued: bool,

    /// Event bus for notifications
    events: EventBus,
}

impl ConfigurationStore {
    /// Creates a store from the gateway's current snapshot.
    ///
    /// A failed load is not fatal: the session starts from an empty map and
    /// every read shows defaults.
    pub async fn load(gateway: Arc<dyn PersistenceGateway>) -> Self {
        let configuration = match gateway.load().await {
            Ok(Some(map)) => {
                tracing::info!(block_types = map.len(), "Loaded block defaults");
                map
            }
            Ok(None) => {
                tracing::info!("No stored block defaults, starting empty");
                ConfigurationMap::new()
            }
            Err(e) => {
                tracing::warn!("Failed to load block defaults, starting empty: {}", e);
                ConfigurationMap::new()
            }
        };

        Self {
            gateway,
            baseline: configuration.clone(),
            configuration,
            session: SessionState::default(),
            in_flight: None,
            save_queued: false,
            events: EventBus::new(),
        }
    }

    // ==================== Reads ====================

    /// Returns the current map.
    pub fn configuration(&self) -> &ConfigurationMap {
        &self.configuration
    }

    /// Returns one block type's stored settings.
    pub fn block_settings(&self, block_type: &str) -> Option<&BlockSettings> {
        self.configuration.settings(block_type)
    }

    /// Returns the effective value of a field.
    pub fn resolve(&self, block_type: &str, field: &str, fallback: FieldValue) -> FieldValue {
        resolve(self.block_settings(block_type), field, fallback)
    }

    /// Returns a block type's settings with every declared field defaulted.
    pub fn effective_settings(&self, schema: &BlockSchema) -> BlockSettings {
        schema.effective(self.block_settings(schema.block_type().as_str()))
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn state(&self) -> StoreState {
        match self.session {
            SessionState { is_saving: true, .. } => StoreState::Saving,
            SessionState { is_open: true, .. } => StoreState::Open,
            _ => StoreState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_open
    }

    pub fn is_saving(&self) -> bool {
        self.session.is_saving
    }

    /// Returns true if the local map differs from the last persisted one.
    pub fn has_unsaved_changes(&self) -> bool {
        self.configuration != self.baseline
    }

    /// Subscribes to store events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // ==================== Editing ====================

    /// Activates the editing surface. No-op if already open.
    pub fn open(&mut self) {
        if self.session.is_open {
            return;
        }
        self.session.is_open = true;
        self.events.emit(StoreEvent::Opened);
    }

    /// Sets one field of one block type.
    ///
    /// Applied immediately, also while a save is in flight.
    pub fn set_field(
        &mut self,
        block_type: impl Into<BlockTypeId>,
        field: impl Into<FieldKey>,
        value: impl Into<FieldValue>,
    ) -> CoreResult<()> {
        self.patch_field(block_type.into(), field.into(), Some(value.into()))
    }

    /// Removes one field so it reads as its default again.
    pub fn clear_field(
        &mut self,
        block_type: impl Into<BlockTypeId>,
        field: impl Into<FieldKey>,
    ) -> CoreResult<()> {
        self.patch_field(block_type.into(), field.into(), None)
    }

    /// Replaces one block type's settings wholesale.
    pub fn replace_block(
        &mut self,
        block_type: impl Into<BlockTypeId>,
        settings: BlockSettings,
    ) -> CoreResult<()> {
        self.ensure_open()?;
        let block_type = block_type.into();
        self.configuration = replace_block(&self.configuration, block_type.clone(), settings);
        tracing::debug!(block_type = %block_type, "Replaced block settings");
        self.events.emit(StoreEvent::BlockReplaced(block_type));
        Ok(())
    }

    fn patch_field(
        &mut self,
        block_type: BlockTypeId,
        field: FieldKey,
        value: Option<FieldValue>,
    ) -> CoreResult<()> {
        self.ensure_open()?;
        self.configuration = apply_field(&self.configuration, block_type.clone(), field.clone(), value);
        tracing::debug!(block_type = %block_type, field = %field, "Updated field");
        self.events.emit(StoreEvent::FieldChanged { block_type, field });
        Ok(())
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.session.is_open {
            Ok(())
        } else {
            Err(CoreError::NotOpen)
        }
    }

    // ==================== Saving ====================

    /// Issues a save of the current map.
    ///
    /// Returns the request to run, or `None` if a save is already in flight;
    /// in that case the request is queued and issued by `complete_save`.
    pub fn request_save(&mut self) -> CoreResult<Option<SaveRequest>> {
        self.ensure_open()?;
        if self.session.is_saving {
            self.save_queued = true;
            tracing::debug!("Save requested while saving, queued");
            self.events.emit(StoreEvent::SaveQueued);
            return Ok(None);
        }
        Ok(Some(self.begin_save()))
    }

    fn begin_save(&mut self) -> SaveRequest {
        let id = SaveId::new();
        self.session.is_saving = true;
        self.in_flight = Some(id);
        tracing::debug!(save = %id, block_types = self.configuration.len(), "Issuing save");
        self.events.emit(StoreEvent::SaveStarted(id));

        SaveRequest {
            id,
            snapshot: self.configuration.clone(),
            gateway: Arc::clone(&self.gateway),
        }
    }

    /// Reconciles the store with a landed save.
    ///
    /// Success makes the snapshot the durable baseline and closes the
    /// surface. Failure keeps the surface open and every local edit. Either
    /// way, a queued request is issued now and returned as `follow_up`; after
    /// a success it is skipped if nothing changed since the snapshot.
    pub fn complete_save(&mut self, outcome: SaveOutcome) -> CoreResult<SaveCompletion> {
        if self.in_flight != Some(outcome.id) {
            return Err(CoreError::UnknownSave(outcome.id));
        }
        self.in_flight = None;
        self.session.is_saving = false;

        let SaveOutcome { id, snapshot, result } = outcome;
        match &result {
            Ok(()) => {
                tracing::info!(save = %id, block_types = snapshot.len(), "Saved block defaults");
                self.baseline = snapshot;
                self.events.emit(StoreEvent::Saved(id));
            }
            Err(e) => {
                tracing::warn!(save = %id, "Failed to save block defaults: {}", e);
                self.events.emit(StoreEvent::SaveFailed {
                    id,
                    message: e.to_string(),
                });
            }
        }

        let queued = std::mem::take(&mut self.save_queued);
        let follow_up = if queued && (result.is_err() || self.has_unsaved_changes()) {
            Some(self.begin_save())
        } else {
            None
        };

        if result.is_ok() && follow_up.is_none() {
            self.session.is_open = false;
            self.events.emit(StoreEvent::Closed);
        }

        Ok(SaveCompletion { result, follow_up })
    }

    /// Requests a save and drives it, and any follow-up, to completion.
    ///
    /// If another request is already in flight this only queues, and
    /// returns `Ok` at once.
    pub async fn save(&mut self) -> CoreResult<()> {
        let Some(mut request) = self.request_save()? else {
            return Ok(());
        };
        loop {
            let outcome = request.send().await;
            let SaveCompletion { result, follow_up } = self.complete_save(outcome)?;
            match (result, follow_up) {
                (_, Some(next)) => request = next,
                (Ok(()), None) => return Ok(()),
                (Err(e), None) => return Err(e.into()),
            }
        }
    }
}

impl Drop for ConfigurationStore {
    fn drop(&mut self) {
        if self.has_unsaved_changes() {
            tracing::warn!("Configuration store dropped with unsaved changes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use crate::schema::{ADVANCED_HEADING, BlockSchema};
    use blockdefaults_model::decode;

    async fn store_with(gateway: &Arc<MemoryGateway>) -> ConfigurationStore {
        ConfigurationStore::load(gateway.clone()).await
    }

    #[tokio::test]
    async fn test_empty_load_then_edit_then_save() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut store = store_with(&gateway).await;
        assert_eq!(store.state(), StoreState::Closed);
        assert_eq!(store.resolve("ns/heading", "level", 2.into()), FieldValue::from(2));

        store.open();
        store.set_field("ns/heading", "level", 4).unwrap();
        assert_eq!(store.resolve("ns/heading", "level", 2.into()), FieldValue::from(4));

        store.save().await.unwrap();
        assert_eq!(store.state(), StoreState::Closed);
        assert!(!store.has_unsaved_changes());

        let fresh = store_with(&gateway).await;
        assert_eq!(
            fresh.block_settings("ns/heading").unwrap().get("level"),
            Some(&FieldValue::from(4))
        );
    }

    #[tokio::test]
    async fn test_failed_save_keeps_edits() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut store = store_with(&gateway).await;
        store.open();
        store.set_field("ns/heading", "align", "center").unwrap();

        gateway.fail_next_save("server unavailable").await;
        let err = store.save().await.unwrap_err();
        assert!(matches!(err, CoreError::Save(SaveError::Rejected(_))));

        assert_eq!(store.resolve("ns/heading", "align", "".into()), FieldValue::from("center"));
        assert!(!store.is_saving());
        assert_eq!(store.state(), StoreState::Open);
        assert!(store.has_unsaved_changes());

        let request = store.request_save().unwrap().unwrap();
        assert_eq!(request.snapshot(), store.configuration());
        let completion = store.complete_save(request.send().await).unwrap();
        assert!(completion.result.is_ok());
        assert_eq!(gateway.save_count().await, 2);
        assert_eq!(
            decode(&gateway.blob().await.unwrap()).unwrap().settings("ns/heading").unwrap().get("align"),
            Some(&FieldValue::from("center"))
        );
    }

    #[tokio::test]
    async fn test_one_payload_for_many_block_types() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut store = store_with(&gateway).await;
        store.open();
        store.set_field("ns/heading", "level", 3).unwrap();
        store.set_field("ns/quote", "color", "#222").unwrap();

        store.save().await.unwrap();

        assert_eq!(gateway.save_count().await, 1);
        assert_eq!(
            gateway.blob().await.as_deref(),
            Some(r##"{"ns/heading":{"level":3},"ns/quote":{"color":"#222"}}"##)
        );
    }

    #[tokio::test]
    async fn test_edit_during_flight_is_not_in_that_save() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut store = store_with(&gateway).await;
        store.open();
        store.set_field("ns/heading", "level", 3).unwrap();

        let request = store.request_save().unwrap().unwrap();
        assert_eq!(store.state(), StoreState::Saving);
        store.set_field("ns/heading", "level", 5).unwrap();
        assert_eq!(store.resolve("ns/heading", "level", 2.into()), FieldValue::from(5));

        let completion = store.complete_save(request.send().await).unwrap();
        assert!(completion.result.is_ok());
        assert!(completion.follow_up.is_none());

        let persisted = decode(&gateway.blob().await.unwrap()).unwrap();
        assert_eq!(
            persisted.settings("ns/heading").unwrap().get("level"),
            Some(&FieldValue::from(3))
        );
        assert_eq!(store.state(), StoreState::Closed);
        assert!(store.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_queued_save_captures_later_edits() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut store = store_with(&gateway).await;
        let mut events = store.subscribe();
        store.open();
        store.set_field("ns/heading", "level", 3).unwrap();

        let first = store.request_save().unwrap().unwrap();
        store.set_field("ns/heading", "level", 5).unwrap();
        assert!(store.request_save().unwrap().is_none());
        assert!(store.request_save().unwrap().is_none());

        let completion = store.complete_save(first.send().await).unwrap();
        assert!(completion.result.is_ok());
        assert_eq!(store.state(), StoreState::Saving);
        let second = completion.follow_up.expect("queued save should be issued");

        let completion = store.complete_save(second.send().await).unwrap();
        assert!(completion.follow_up.is_none());
        assert_eq!(store.state(), StoreState::Closed);
        assert_eq!(gateway.save_count().await, 2);
        assert_eq!(gateway.blob().await.as_deref(), Some(r#"{"ns/heading":{"level":5}}"#));

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(seen.iter().filter(|e| **e == StoreEvent::SaveQueued).count(), 2);
        assert_eq!(seen.last(), Some(&StoreEvent::Closed));
    }

    #[tokio::test]
    async fn test_queued_save_skipped_when_nothing_changed() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut store = store_with(&gateway).await;
        store.open();
        store.set_field("ns/heading", "level", 3).unwrap();

        let first = store.request_save().unwrap().unwrap();
        assert!(store.request_save().unwrap().is_none());

        let completion = store.complete_save(first.send().await).unwrap();
        assert!(completion.follow_up.is_none());
        assert_eq!(store.state(), StoreState::Closed);
        assert_eq!(gateway.save_count().await, 1);
    }

    #[tokio::test]
    async fn test_queued_save_retries_after_failure() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut store = store_with(&gateway).await;
        store.open();
        store.set_field("ns/heading", "level", 3).unwrap();

        gateway.fail_next_save("timeout").await;
        let first = store.request_save().unwrap().unwrap();
        assert!(store.request_save().unwrap().is_none());

        let completion = store.complete_save(first.send().await).unwrap();
        assert!(completion.result.is_err());
        assert_eq!(store.state(), StoreState::Saving);

        let retry = completion.follow_up.unwrap();
        let completion = store.complete_save(retry.send().await).unwrap();
        assert!(completion.result.is_ok());
        assert_eq!(store.state(), StoreState::Closed);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_edits_and_saves() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut store = store_with(&gateway).await;

        assert!(matches!(store.set_field("ns/heading", "level", 4), Err(CoreError::NotOpen)));
        assert!(matches!(store.request_save(), Err(CoreError::NotOpen)));
        assert!(store.configuration().is_empty());
    }

    #[tokio::test]
    async fn test_stale_outcome_is_rejected() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut store = store_with(&gateway).await;
        store.open();

        let request = store.request_save().unwrap().unwrap();
        let outcome = request.send().await;
        let stale = SaveOutcome {
            id: SaveId::new(),
            snapshot: outcome.snapshot.clone(),
            result: Ok(()),
        };

        assert!(matches!(store.complete_save(stale), Err(CoreError::UnknownSave(_))));
        assert!(store.is_saving());
        assert!(store.complete_save(outcome).is_ok());
    }

    #[tokio::test]
    async fn test_malformed_stored_blob_loads_empty() {
        let gateway = Arc::new(MemoryGateway::with_blob("{\"ns/heading\": [broken"));
        let store = store_with(&gateway).await;

        assert!(store.configuration().is_empty());
        assert_eq!(store.resolve("ns/heading", "level", 2.into()), FieldValue::from(2));
    }

    #[tokio::test]
    async fn test_clear_field_restores_default() {
        let map = apply_field(&ConfigurationMap::new(), ADVANCED_HEADING, "level", Some(4.into()));
        let gateway = Arc::new(MemoryGateway::with_map(&map).unwrap());
        let mut store = store_with(&gateway).await;
        let schema = BlockSchema::advanced_heading();

        assert_eq!(store.effective_settings(&schema).get("level"), Some(&FieldValue::from(4)));

        store.open();
        store.clear_field(ADVANCED_HEADING, "level").unwrap();
        assert_eq!(store.effective_settings(&schema).get("level"), Some(&FieldValue::from(2)));
    }

    #[tokio::test]
    async fn test_replace_block_leaves_others_alone() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut store = store_with(&gateway).await;
        store.open();
        store.set_field("ns/quote", "color", "#222").unwrap();
        let quote = store.configuration().entry("ns/quote").unwrap().clone();

        let settings: BlockSettings = [("level", FieldValue::from(1))].into_iter().collect();
        store.replace_block("ns/heading", settings.clone()).unwrap();

        assert_eq!(store.block_settings("ns/heading"), Some(&settings));
        assert!(Arc::ptr_eq(&quote, store.configuration().entry("ns/quote").unwrap()));
    }

    #[tokio::test]
    async fn test_events_follow_the_session() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut store = store_with(&gateway).await;
        let mut events = store.subscribe();

        store.open();
        store.open();
        store.set_field("ns/heading", "level", 4).unwrap();
        store.save().await.unwrap();

        assert_eq!(events.recv().await.unwrap(), StoreEvent::Opened);
        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::FieldChanged {
                block_type: "ns/heading".into(),
                field: "level".to_string(),
            }
        );
        assert!(matches!(events.recv().await.unwrap(), StoreEvent::SaveStarted(_)));
        assert!(matches!(events.recv().await.unwrap(), StoreEvent::Saved(_)));
        assert_eq!(events.recv().await.unwrap(), StoreEvent::Closed);
    }

    #[tokio::test]
    async fn test_request_can_run_on_spawned_task() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut store = store_with(&gateway).await;
        store.open();
        store.set_field("ns/heading", "level", 6).unwrap();

        let request = store.request_save().unwrap().unwrap();
        let handle = tokio::spawn(request.send());
        store.set_field("ns/heading", "align", "right").unwrap();

        let completion = store.complete_save(handle.await.unwrap()).unwrap();
        assert!(completion.result.is_ok());
        assert_eq!(gateway.blob().await.as_deref(), Some(r#"{"ns/heading":{"level":6}}"#));
    }
}
