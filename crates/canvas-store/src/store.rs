//! The canvas node store
//!
//! [`CanvasStore`] is the single writer of [`CanvasState`]. Every mutation
//! is applied synchronously and followed by a notification pass over the
//! subscriptions; persisted changes also bump the state revision, which the
//! built-in autosave subscription debounces into one storage write.

use crate::config::StoreConfig;
use crate::debounce::Debouncer;
use crate::error::StoreError;
use crate::migration::migrate;
use crate::persistence::KeyValueStore;
use crate::scheduler::{Scheduler, TimerEvent, TimerHandle};
use crate::state::{CanvasState, Notice};
use crate::subscription::{SubscriptionId, Subscriptions};
use canvas_alias::{
    alias_options, is_alias_unique, next_alias, validate_alias, AliasError, AliasMap, AliasOption,
    AllocatedAlias,
};
use canvas_model::{
    AiProvider, CanvasDocument, CanvasNode, Counters, FileData, GeneratorData, GeneratorOutput,
    MessageContentPart, NodeData, NodeId, NodeKind, NodePatch, Position, Pulse, PulseId,
};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// What a generation run needs, captured when it starts
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTicket {
    /// Generator being run
    pub node_id: NodeId,
    /// Raw prompt text
    pub input: String,
    /// Prompt with references expanded
    pub parts: Vec<MessageContentPart>,
    /// Selected provider
    pub provider: Option<AiProvider>,
    /// Selected model
    pub model: Option<String>,
}

/// Outstanding timers owned by the store
#[derive(Debug, Default)]
pub(crate) struct Timers {
    pub(crate) deletions: HashMap<NodeId, TimerHandle>,
    pub(crate) undo: Option<TimerHandle>,
    pub(crate) undo_epoch: u64,
    pub(crate) notice: Option<TimerHandle>,
    pub(crate) notice_epoch: u64,
    pub(crate) pulses: HashMap<PulseId, TimerHandle>,
    pub(crate) next_pulse: u64,
}

/// Authoritative store of canvas nodes
#[derive(Debug)]
pub struct CanvasStore {
    pub(crate) config: StoreConfig,
    pub(crate) state: CanvasState,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) storage: Arc<dyn KeyValueStore>,
    pub(crate) subscriptions: Subscriptions,
    pub(crate) autosave: Arc<Debouncer>,
    pub(crate) timers: Timers,
    pub(crate) quarantined: bool,
}

impl CanvasStore {
    /// Create an empty store
    #[must_use]
    pub fn new(config: StoreConfig, scheduler: Arc<dyn Scheduler>, storage: Arc<dyn KeyValueStore>) -> Self {
        let mut store = Self::build(config, scheduler, storage);
        store.install_autosave();
        store
    }

    /// Create a store populated from `storage`
    ///
    /// An unreadable document is copied to [`backup_key`](Self::backup_key)
    /// and the store starts empty and quarantined: nothing is written over
    /// the stored document until a load succeeds or
    /// [`release_quarantine`](Self::release_quarantine) is called. Loading
    /// does not schedule an autosave.
    #[must_use]
    pub fn hydrate(config: StoreConfig, scheduler: Arc<dyn Scheduler>, storage: Arc<dyn KeyValueStore>) -> Self {
        let mut store = Self::build(config, scheduler, storage);
        store.state.dark_mode = store.read_dark_mode();
        match store.read_document() {
            Ok(Some(document)) => {
                store.install_document(document);
                tracing::info!("hydrated canvas: {} nodes", store.state.nodes.len());
            }
            Ok(None) => tracing::debug!("no stored canvas, starting empty"),
            Err(e) => {
                tracing::warn!("stored canvas is unreadable, saving disabled: {}", e);
                store.quarantine_stored_document();
            }
        }
        store.install_autosave();
        store
    }

    fn build(config: StoreConfig, scheduler: Arc<dyn Scheduler>, storage: Arc<dyn KeyValueStore>) -> Self {
        let autosave = Arc::new(Debouncer::new(
            Arc::clone(&scheduler),
            config.autosave_delay(),
            |epoch| TimerEvent::Autosave { epoch },
        ));
        Self {
            config,
            state: CanvasState::default(),
            scheduler,
            storage,
            subscriptions: Subscriptions::default(),
            autosave,
            timers: Timers::default(),
            quarantined: false,
        }
    }

    fn install_autosave(&mut self) {
        let debouncer = Arc::clone(&self.autosave);
        self.subscriptions
            .subscribe(&self.state, CanvasState::revision, move |_| {
                debouncer.trigger();
            });
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Node by id
    #[inline]
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&CanvasNode> {
        self.state.nodes.get(id)
    }

    // ---- change propagation ----

    /// Bump the revision of the persisted part and notify
    pub(crate) fn commit(&mut self) {
        self.state.revision += 1;
        self.notify();
    }

    /// Notify subscribers of a session-only change
    pub(crate) fn notify(&mut self) {
        self.subscriptions.notify(&self.state);
    }

    /// Register `callback` to run after a mutation changes `selector`'s value
    ///
    /// The selector is evaluated immediately to seed the baseline; the
    /// callback is not invoked for the current value.
    pub fn subscribe<T, S, C>(&mut self, selector: S, callback: C) -> SubscriptionId
    where
        T: PartialEq + Send + 'static,
        S: Fn(&CanvasState) -> T + Send + 'static,
        C: FnMut(&T) + Send + 'static,
    {
        self.subscriptions.subscribe(&self.state, selector, callback)
    }

    /// Remove a subscription; returns whether it existed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    /// Number of live subscriptions, including autosave
    #[inline]
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    // ---- node operations ----

    /// Add a node of `kind` with a freshly allocated alias
    ///
    /// # Arguments
    /// * `kind` - node type
    /// * `position` - canvas position, the configured default when `None`
    pub fn add_node(&mut self, kind: NodeKind, position: Option<Position>) -> NodeId {
        let alias = self.allocate_alias(kind);
        self.insert_new(position, NodeData::new_default(kind, alias))
    }

    /// Add a content node carrying a dropped file
    pub fn add_content_node_with_file(&mut self, file: FileData, position: Option<Position>) -> NodeId {
        let alias = self.allocate_alias(NodeKind::Content);
        let mut data = NodeData::new_default(NodeKind::Content, alias);
        if let NodeData::Content(content) = &mut data {
            content.content = None;
            content.file_data = Some(file);
        }
        self.insert_new(position, data)
    }

    pub(crate) fn allocate_alias(&mut self, kind: NodeKind) -> String {
        let AllocatedAlias { alias, suffix } =
            next_alias(self.state.nodes.values(), kind, self.state.counters.get(kind));
        self.state.counters.set(kind, suffix);
        alias
    }

    pub(crate) fn insert_new(&mut self, position: Option<Position>, data: NodeData) -> NodeId {
        let id = NodeId::generate();
        let position = position.unwrap_or(self.config.default_position);
        tracing::debug!("added {} node {} as '{}'", data.kind(), id, data.alias());
        self.state
            .nodes
            .insert(id.clone(), CanvasNode::new(id.clone(), position, data));
        self.commit();
        id
    }

    /// Shallow-merge `patch` into a node's payload
    ///
    /// A colliding alias is dropped from the patch and raises the
    /// duplicate-alias notice; the remaining fields still apply. Returns
    /// `false` only if the node does not exist.
    pub fn update_node(&mut self, id: &NodeId, mut patch: NodePatch) -> bool {
        let Some(current) = self.state.nodes.get(id).map(|n| n.alias().to_string()) else {
            return false;
        };

        if let Some(alias) = patch.alias.take() {
            let alias = alias.trim().to_string();
            if alias.is_empty() {
                tracing::warn!("ignoring empty alias for node {}", id);
            } else if alias == current || is_alias_unique(self.state.nodes.values(), &alias, Some(id)) {
                patch.alias = Some(alias);
            } else {
                tracing::warn!("alias '{}' already in use, node {} keeps '{}'", alias, id, current);
                self.show_duplicate_alias_notice(&alias);
            }
        }

        let touches_folders = patch.folder_children().is_some();
        if let Some(node) = self.state.nodes.get_mut(id) {
            if !node.data.apply(patch) {
                tracing::warn!("patch for {} node {} carried fields of another type", node.kind(), id);
            }
        }
        if touches_folders {
            self.normalize_folders();
        }
        self.commit();
        true
    }

    /// Move a node
    pub fn move_node(&mut self, id: &NodeId, position: Position) -> bool {
        let Some(node) = self.state.nodes.get_mut(id) else {
            return false;
        };
        node.position = position;
        self.commit();
        true
    }

    /// Change a node's alias
    ///
    /// The candidate is trimmed; empty or unchanged candidates are ignored.
    /// A collision raises the duplicate-alias notice and nothing changes.
    pub fn rename_node(&mut self, id: &NodeId, candidate: &str) -> bool {
        let Some(node) = self.state.nodes.get(id) else {
            return false;
        };
        let trimmed = candidate.trim();
        if trimmed.is_empty() || trimmed == node.alias() {
            return false;
        }
        match validate_alias(self.state.nodes.values(), trimmed, Some(id)) {
            Ok(alias) => {
                if let Some(node) = self.state.nodes.get_mut(id) {
                    tracing::debug!("renamed node {} from '{}' to '{}'", id, node.alias(), alias);
                    node.data.set_alias(alias);
                }
                self.commit();
                true
            }
            Err(AliasError::Duplicate(alias)) => {
                self.show_duplicate_alias_notice(&alias);
                false
            }
            Err(AliasError::Empty) => false,
        }
    }

    /// Remove a node immediately
    ///
    /// The node is also dropped from every folder and from the selection.
    pub fn remove_node(&mut self, id: &NodeId) -> bool {
        if self.detach_node(id).is_none() {
            return false;
        }
        self.commit();
        true
    }

    /// Take a node out of the collection and every reference to it
    pub(crate) fn detach_node(&mut self, id: &NodeId) -> Option<CanvasNode> {
        let node = self.state.nodes.shift_remove(id)?;
        for other in self.state.nodes.values_mut() {
            if let Some(folder) = other.data.as_folder_mut() {
                folder.child_node_ids.retain(|child| child != id);
            }
        }
        if self.state.selected_node_id.as_ref() == Some(id) {
            self.state.selected_node_id = None;
        }
        if self.state.deleting.shift_remove(id) {
            if let Some(handle) = self.timers.deletions.remove(id) {
                handle.cancel();
            }
        }
        tracing::debug!("removed node {} ('{}')", id, node.alias());
        Some(node)
    }

    /// Replace the whole collection
    ///
    /// Counters are kept. Folder children are normalized afterwards.
    ///
    /// # Errors
    /// Returns [`StoreError::DuplicateId`] or [`StoreError::DuplicateAlias`]
    /// and leaves the store untouched if the list breaks uniqueness.
    pub fn set_nodes(&mut self, nodes: Vec<CanvasNode>) -> Result<(), StoreError> {
        let mut map = IndexMap::with_capacity(nodes.len());
        let mut aliases = HashSet::with_capacity(nodes.len());
        for node in nodes {
            if map.contains_key(&node.id) {
                return Err(StoreError::DuplicateId(node.id));
            }
            if !aliases.insert(node.alias().to_string()) {
                return Err(StoreError::DuplicateAlias(node.alias().to_string()));
            }
            map.insert(node.id.clone(), node);
        }
        self.state.nodes = map;
        self.drop_dangling_session_refs();
        self.normalize_folders();
        self.commit();
        Ok(())
    }

    fn drop_dangling_session_refs(&mut self) {
        let nodes = &self.state.nodes;
        if self
            .state
            .selected_node_id
            .as_ref()
            .is_some_and(|id| !nodes.contains_key(id))
        {
            self.state.selected_node_id = None;
        }
        let gone: Vec<NodeId> = self
            .state
            .deleting
            .iter()
            .filter(|id| !nodes.contains_key(*id))
            .cloned()
            .collect();
        for id in gone {
            self.state.deleting.shift_remove(&id);
            if let Some(handle) = self.timers.deletions.remove(&id) {
                handle.cancel();
            }
        }
    }

    /// Select a node, or clear the selection with `None`
    ///
    /// Selecting an unknown id is ignored.
    pub fn select_node(&mut self, id: Option<NodeId>) -> bool {
        if let Some(id) = &id {
            if !self.state.nodes.contains_key(id) {
                return false;
            }
        }
        if self.state.selected_node_id != id {
            self.state.selected_node_id = id;
            self.notify();
        }
        true
    }

    /// Remove every node and reset counters, selection and undo state
    pub fn clear_canvas(&mut self) {
        for (_, handle) in self.timers.deletions.drain() {
            handle.cancel();
        }
        self.state.deleting.clear();
        self.state.nodes.clear();
        self.state.counters = Counters::default();
        self.state.selected_node_id = None;
        self.clear_undo_slot();
        tracing::info!("canvas cleared");
        self.commit();
    }

    /// Nodes that are not hidden inside a collapsed folder
    #[must_use]
    pub fn visible_nodes(&self) -> Vec<&CanvasNode> {
        let hidden: HashSet<&NodeId> = self
            .state
            .nodes
            .values()
            .filter_map(|node| node.data.as_folder())
            .filter(|folder| !folder.is_expanded)
            .flat_map(|folder| folder.child_node_ids.iter())
            .collect();
        self.state
            .nodes
            .values()
            .filter(|node| !hidden.contains(&node.id))
            .collect()
    }

    // ---- aliases and content ----

    /// Alias index of the current nodes
    #[must_use]
    pub fn alias_map(&self) -> AliasMap {
        AliasMap::build(self.state.nodes.values())
    }

    /// Value of `alias`, or `@alias` when nothing carries it
    #[must_use]
    pub fn resolve_alias(&self, alias: &str) -> String {
        self.alias_map().resolve_alias(alias).into_owned()
    }

    /// Substitute every `@alias` token in `text`
    #[must_use]
    pub fn resolve_all_aliases(&self, text: &str) -> String {
        self.alias_map().resolve_all_aliases(text)
    }

    /// Check if no node other than `excluding` carries `candidate`
    #[must_use]
    pub fn is_alias_unique(&self, candidate: &str, excluding: Option<&NodeId>) -> bool {
        is_alias_unique(self.state.nodes.values(), candidate, excluding)
    }

    /// Autocomplete entries for every node
    #[must_use]
    pub fn alias_options(&self) -> Vec<AliasOption> {
        alias_options(self.state.nodes.values())
    }

    /// Expand `text` into message parts against the current nodes
    #[must_use]
    pub fn build_message_content(&self, text: &str) -> Vec<MessageContentPart> {
        canvas_content::build_message_content(text, &self.state)
    }

    // ---- generator reporting ----

    fn generator_mut(&mut self, id: &NodeId) -> Option<&mut GeneratorData> {
        self.state.nodes.get_mut(id)?.data.as_generator_mut()
    }

    /// Start a run: mark the generator running, clear its output and error,
    /// and capture the expanded prompt
    ///
    /// Returns `None` if `id` is not a generator or is already running.
    pub fn begin_generation(&mut self, id: &NodeId) -> Option<GenerationTicket> {
        let node = self.state.nodes.get(id)?;
        let generator = node.data.as_generator()?;
        if generator.is_running {
            return None;
        }
        let ticket = GenerationTicket {
            node_id: id.clone(),
            input: generator.input.clone(),
            parts: canvas_content::build_message_content(&generator.input, &self.state),
            provider: generator.provider,
            model: generator.model.clone(),
        };
        let position = node.position;

        if let Some(generator) = self.generator_mut(id) {
            generator.is_running = true;
            generator.output = None;
            generator.error = None;
        }
        self.emit_pulse(position);
        tracing::info!("generation started for {}", id);
        self.commit();
        Some(ticket)
    }

    /// Append streamed text to a running generator's output
    ///
    /// Chunks for a generator that is no longer running are discarded.
    pub fn append_generator_text(&mut self, id: &NodeId, chunk: &str) -> bool {
        let Some(generator) = self.generator_mut(id) else {
            return false;
        };
        if !generator.is_running {
            return false;
        }
        match &mut generator.output {
            Some(GeneratorOutput::Text { text }) => text.push_str(chunk),
            other => *other = Some(GeneratorOutput::text(chunk)),
        }
        self.commit();
        true
    }

    /// Replace a generator's output
    pub fn set_generator_output(&mut self, id: &NodeId, output: Option<GeneratorOutput>) -> bool {
        let Some(generator) = self.generator_mut(id) else {
            return false;
        };
        generator.output = output;
        self.commit();
        true
    }

    /// Record a failed run: store the error, clear the output, stop running
    pub fn set_generator_error(&mut self, id: &NodeId, error: impl Into<String>) -> bool {
        let Some(generator) = self.generator_mut(id) else {
            return false;
        };
        let error = error.into();
        tracing::warn!("generation failed for {}: {}", id, error);
        generator.error = Some(error);
        generator.output = None;
        generator.is_running = false;
        self.commit();
        true
    }

    /// Set a generator's running flag
    pub fn set_generator_running(&mut self, id: &NodeId, running: bool) -> bool {
        let Some(generator) = self.generator_mut(id) else {
            return false;
        };
        if generator.is_running == running {
            return true;
        }
        generator.is_running = running;
        self.commit();
        true
    }

    // ---- notice, pulses, preferences ----

    /// Raise the transient duplicate-alias notice for `alias`
    pub fn show_duplicate_alias_notice(&mut self, alias: &str) {
        if let Some(handle) = self.timers.notice.take() {
            handle.cancel();
        }
        self.timers.notice_epoch += 1;
        let epoch = self.timers.notice_epoch;
        self.state.notice = Some(Notice {
            alias: alias.to_string(),
        });
        self.timers.notice = Some(
            self.scheduler
                .schedule(self.config.notice_duration(), TimerEvent::NoticeExpired { epoch }),
        );
        self.notify();
    }

    /// Hide the notice before it expires
    pub fn dismiss_notice(&mut self) {
        if let Some(handle) = self.timers.notice.take() {
            handle.cancel();
        }
        if self.state.notice.take().is_some() {
            self.notify();
        }
    }

    /// Emit a pulse at `position`
    pub fn add_pulse(&mut self, position: Position) -> PulseId {
        let id = self.emit_pulse(position);
        self.notify();
        id
    }

    fn emit_pulse(&mut self, position: Position) -> PulseId {
        self.timers.next_pulse += 1;
        let id = PulseId(self.timers.next_pulse);
        let timestamp_ms = u64::try_from(self.scheduler.now().as_millis()).unwrap_or(u64::MAX);
        self.state.pulses.push(Pulse::new(id, position, timestamp_ms));
        let handle = self
            .scheduler
            .schedule(self.config.pulse_duration(), TimerEvent::PulseExpired { pulse_id: id });
        self.timers.pulses.insert(id, handle);

        while self.state.pulses.len() > self.config.max_pulses {
            let dropped = self.state.pulses.remove(0);
            if let Some(handle) = self.timers.pulses.remove(&dropped.id) {
                handle.cancel();
            }
        }
        id
    }

    /// Set the dark-mode preference and persist it under its own key
    pub fn set_dark_mode(&mut self, enabled: bool) {
        if self.state.dark_mode == enabled {
            return;
        }
        self.state.dark_mode = enabled;
        let value = if enabled { "true" } else { "false" };
        if let Err(e) = self.storage.set(&self.config.dark_mode_key, value) {
            tracing::warn!("failed to persist dark mode: {}", e);
        }
        self.notify();
    }

    /// Flip dark mode; returns the new value
    pub fn toggle_dark_mode(&mut self) -> bool {
        let enabled = !self.state.dark_mode;
        self.set_dark_mode(enabled);
        enabled
    }

    fn read_dark_mode(&self) -> bool {
        match self.storage.get(&self.config.dark_mode_key) {
            Ok(Some(value)) => value.trim() == "true",
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("failed to read dark mode: {}", e);
                false
            }
        }
    }

    // ---- persistence ----

    /// Snapshot of the persisted part at the current schema version
    #[must_use]
    pub fn document(&self) -> CanvasDocument {
        CanvasDocument::new(self.state.nodes.values().cloned().collect(), self.state.counters)
    }

    /// Write the document now
    ///
    /// # Errors
    /// Returns [`StoreError::Quarantined`] while the stored document is
    /// quarantined, or an error if encoding or the storage write fails
    pub fn save_to_storage(&self) -> Result<(), StoreError> {
        if self.quarantined {
            return Err(StoreError::Quarantined(self.config.storage_key.clone()));
        }
        let json = serde_json::to_string(&self.document())?;
        self.storage.set(&self.config.storage_key, &json)?;
        tracing::info!("saved canvas: {} nodes", self.state.nodes.len());
        Ok(())
    }

    /// Replace the state with the stored document now
    ///
    /// Returns `false` when nothing is stored.
    ///
    /// # Errors
    /// Returns error if the stored document cannot be read, decoded or
    /// migrated; the store is left untouched in that case.
    pub fn load_from_storage(&mut self) -> Result<bool, StoreError> {
        let Some(document) = self.read_document()? else {
            return Ok(false);
        };
        self.install_document(document);
        self.quarantined = false;
        self.commit();
        Ok(true)
    }

    /// Write immediately if an autosave is pending
    ///
    /// A quarantined store drops the pending save and returns `false`.
    ///
    /// # Errors
    /// Returns error if the write fails
    pub fn flush_autosave(&mut self) -> Result<bool, StoreError> {
        if !self.autosave.cancel() {
            return Ok(false);
        }
        if self.quarantined {
            tracing::warn!("pending save dropped: stored canvas is quarantined");
            return Ok(false);
        }
        self.save_to_storage()?;
        Ok(true)
    }

    /// Check if an autosave is waiting for its quiet period
    #[inline]
    #[must_use]
    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    /// Check if saving is disabled because the stored document was unreadable
    #[inline]
    #[must_use]
    pub fn is_quarantined(&self) -> bool {
        self.quarantined
    }

    /// Allow saves to replace the quarantined document
    ///
    /// The copy under [`backup_key`](Self::backup_key) is kept.
    pub fn release_quarantine(&mut self) {
        if std::mem::take(&mut self.quarantined) {
            tracing::info!("quarantine released, next save replaces '{}'", self.config.storage_key);
        }
    }

    /// Key holding the copy of an unreadable document
    #[must_use]
    pub fn backup_key(&self) -> String {
        format!("{}.bak", self.config.storage_key)
    }

    fn quarantine_stored_document(&mut self) {
        self.quarantined = true;
        let backup = self.backup_key();
        match self.storage.get(&self.config.storage_key) {
            Ok(Some(text)) => match self.storage.set(&backup, &text) {
                Ok(()) => tracing::info!("copied unreadable canvas to '{}'", backup),
                Err(e) => tracing::warn!("failed to copy unreadable canvas to '{}': {}", backup, e),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("failed to re-read unreadable canvas: {}", e),
        }
    }

    fn read_document(&self) -> Result<Option<CanvasDocument>, StoreError> {
        let Some(text) = self.storage.get(&self.config.storage_key)? else {
            return Ok(None);
        };
        let value: serde_json::Value = serde_json::from_str(&text)?;
        Ok(Some(migrate(value)?.document))
    }

    fn install_document(&mut self, document: CanvasDocument) {
        for (_, handle) in self.timers.deletions.drain() {
            handle.cancel();
        }
        self.state.deleting.clear();
        self.state.selected_node_id = None;
        self.clear_undo_slot();

        let mut counters = document.counters;
        let mut nodes: IndexMap<NodeId, CanvasNode> = IndexMap::with_capacity(document.nodes.len());
        for mut node in document.nodes {
            if nodes.contains_key(&node.id) {
                tracing::warn!("dropping node with repeated id {}", node.id);
                continue;
            }
            // no run survives a reload
            if let Some(generator) = node.data.as_generator_mut() {
                if std::mem::take(&mut generator.is_running) {
                    tracing::debug!("cleared stale running flag on {}", node.id);
                }
            }
            nodes.insert(node.id.clone(), node);
        }

        let mut seen = HashSet::new();
        let repeated: Vec<NodeId> = nodes
            .values()
            .filter(|node| !seen.insert(node.alias().to_string()))
            .map(|node| node.id.clone())
            .collect();
        for id in repeated {
            let Some(kind) = nodes.get(&id).map(CanvasNode::kind) else {
                continue;
            };
            let allocated = next_alias(nodes.values(), kind, counters.get(kind));
            counters.set(kind, allocated.suffix);
            if let Some(node) = nodes.get_mut(&id) {
                tracing::warn!(
                    "repaired repeated alias '{}' on node {} as '{}'",
                    node.alias(),
                    id,
                    allocated.alias
                );
                node.data.set_alias(allocated.alias);
            }
        }

        self.state.nodes = nodes;
        self.state.counters = counters;
        self.normalize_folders();
    }

    // ---- timers ----

    /// Apply a fired timer event
    ///
    /// Events from superseded timers are ignored.
    pub fn handle_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::FinalizeDeletion { node_id } => self.finalize_deletion(&node_id),
            TimerEvent::UndoExpired { epoch } => self.expire_undo(epoch),
            TimerEvent::Autosave { epoch } => {
                if self.autosave.fire(epoch) {
                    if self.quarantined {
                        tracing::warn!("autosave skipped: stored canvas is quarantined");
                    } else if let Err(e) = self.save_to_storage() {
                        tracing::error!("autosave failed: {}", e);
                    }
                }
            }
            TimerEvent::NoticeExpired { epoch } => {
                if epoch == self.timers.notice_epoch && self.state.notice.is_some() {
                    self.timers.notice = None;
                    self.state.notice = None;
                    self.notify();
                }
            }
            TimerEvent::PulseExpired { pulse_id } => {
                self.timers.pulses.remove(&pulse_id);
                let before = self.state.pulses.len();
                self.state.pulses.retain(|pulse| pulse.id != pulse_id);
                if self.state.pulses.len() != before {
                    self.notify();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::scheduler::ManualScheduler;
    use canvas_model::{ContentPatch, FolderColor, GeneratorPatch, VariantPatch};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn store() -> (CanvasStore, Arc<ManualScheduler>, Arc<MemoryStore>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let storage = Arc::new(MemoryStore::new());
        let store = CanvasStore::new(StoreConfig::default(), scheduler.clone(), storage.clone());
        (store, scheduler, storage)
    }

    fn set_text(store: &mut CanvasStore, id: &NodeId, text: &str) {
        store.update_node(
            id,
            NodePatch::variant(VariantPatch::Content(ContentPatch {
                content: Some(Some(text.to_string())),
                ..ContentPatch::default()
            })),
        );
    }

    #[test]
    fn add_node_allocates_prefixed_aliases() {
        let (mut store, _, _) = store();
        let a = store.add_node(NodeKind::Generator, None);
        let b = store.add_node(NodeKind::Generator, None);
        let c = store.add_node(NodeKind::Content, Some(Position::new(5.0, 5.0)));

        assert_eq!(store.node(&a).unwrap().alias(), "output-1");
        assert_eq!(store.node(&b).unwrap().alias(), "output-2");
        assert_eq!(store.node(&c).unwrap().alias(), "con-1");
        assert_eq!(store.node(&a).unwrap().position, Position::new(100.0, 100.0));
        assert_eq!(store.state().counters().generator, 2);
    }

    #[test]
    fn add_node_skips_alias_taken_by_rename() {
        let (mut store, _, _) = store();
        let g = store.add_node(NodeKind::Generator, None);
        assert!(store.rename_node(&g, "con-1"));
        let c = store.add_node(NodeKind::Content, None);
        assert_eq!(store.node(&c).unwrap().alias(), "con-2");
        assert_eq!(store.state().counters().content, 2);
    }

    #[test]
    fn update_merges_and_keeps_type() {
        let (mut store, _, _) = store();
        let id = store.add_node(NodeKind::Content, None);
        set_text(&mut store, &id, "hello");
        assert!(store.update_node(&id, NodePatch::resize(10.0, 20.0)));

        let node = store.node(&id).unwrap();
        assert_eq!(node.kind(), NodeKind::Content);
        assert_eq!(store.resolve_alias("con-1"), "hello");
        assert_eq!(node.data.size().width, 10.0);
        assert!(!store.update_node(&NodeId::new("missing"), NodePatch::resize(1.0, 1.0)));
    }

    #[test]
    fn update_with_colliding_alias_applies_the_rest() {
        let (mut store, _, _) = store();
        store.add_node(NodeKind::Content, None);
        let id = store.add_node(NodeKind::Content, None);
        let patch = NodePatch::resize(1.0, 2.0).with_alias("con-1");
        assert!(store.update_node(&id, patch));

        let node = store.node(&id).unwrap();
        assert_eq!(node.alias(), "con-2");
        assert_eq!(node.data.size().height, 2.0);
        assert_eq!(store.state().notice().map(|n| n.alias.as_str()), Some("con-1"));
    }

    #[test]
    fn rename_trims_and_rejects_duplicates() {
        let (mut store, scheduler, _) = store();
        let a = store.add_node(NodeKind::Content, None);
        let b = store.add_node(NodeKind::Content, None);

        assert!(store.rename_node(&a, "  notes  "));
        assert_eq!(store.node(&a).unwrap().alias(), "notes");
        assert!(!store.rename_node(&b, "notes"));
        assert_eq!(store.node(&b).unwrap().alias(), "con-2");
        assert!(!store.rename_node(&b, "   "));

        let notice = store.state().notice().cloned().unwrap();
        assert_eq!(notice.message(), "Alias \u{201c}notes\u{201d} already exists");

        scheduler.advance(Duration::from_millis(2_499), |e| store.handle_timer(e));
        assert!(store.state().notice().is_some());
        scheduler.advance(Duration::from_millis(1), |e| store.handle_timer(e));
        assert!(store.state().notice().is_none());
    }

    #[test]
    fn update_trims_alias_before_checking_it() {
        let (mut store, _, _) = store();
        let a = store.add_node(NodeKind::Content, None);
        let b = store.add_node(NodeKind::Content, None);

        assert!(store.update_node(&a, NodePatch::default().with_alias("  notes ")));
        assert_eq!(store.node(&a).unwrap().alias(), "notes");
        assert!(store.state().notice().is_none());

        assert!(store.update_node(&b, NodePatch::default().with_alias("notes  ")));
        assert_eq!(store.node(&b).unwrap().alias(), "con-2");
        assert_eq!(store.state().notice().map(|n| n.alias.as_str()), Some("notes"));
        assert_eq!(store.state().node_by_alias("notes").map(|n| &n.id), Some(&a));
    }

    #[test]
    fn repeated_notice_restarts_its_timer() {
        let (mut store, scheduler, _) = store();
        store.show_duplicate_alias_notice("a");
        scheduler.advance(Duration::from_millis(2_000), |e| store.handle_timer(e));
        store.show_duplicate_alias_notice("b");
        scheduler.advance(Duration::from_millis(2_000), |e| store.handle_timer(e));
        assert_eq!(store.state().notice().map(|n| n.alias.as_str()), Some("b"));
        scheduler.advance(Duration::from_millis(500), |e| store.handle_timer(e));
        assert!(store.state().notice().is_none());
    }

    #[test]
    fn remove_clears_selection_and_membership() {
        let (mut store, _, _) = store();
        let content = store.add_node(NodeKind::Content, None);
        let folder = store.create_folder_with_node(&content, None).unwrap();
        store.select_node(Some(content.clone()));

        assert!(store.remove_node(&content));
        assert!(store.state().selected_node_id().is_none());
        let children = &store.node(&folder).unwrap().data.as_folder().unwrap().child_node_ids;
        assert!(children.is_empty());
        assert!(!store.remove_node(&content));
    }

    #[test]
    fn select_ignores_unknown_ids() {
        let (mut store, _, _) = store();
        let id = store.add_node(NodeKind::Content, None);
        assert!(!store.select_node(Some(NodeId::new("ghost"))));
        assert!(store.select_node(Some(id.clone())));
        assert_eq!(store.state().selected_node_id(), Some(&id));
        assert!(store.select_node(None));
        assert!(store.state().selected_node_id().is_none());
    }

    #[test]
    fn set_nodes_rejects_duplicates_and_keeps_state() {
        let (mut store, _, _) = store();
        store.add_node(NodeKind::Content, None);
        let mut nodes: Vec<CanvasNode> = store.state().nodes().cloned().collect();
        let mut copy = nodes[0].clone();
        copy.id = NodeId::new("other");
        nodes.push(copy);

        let err = store.set_nodes(nodes).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateAlias(alias) if alias == "con-1"));
        assert_eq!(store.state().node_count(), 1);
    }

    #[test]
    fn set_nodes_normalizes_folder_claims() {
        let (mut store, _, _) = store();
        let a = store.add_node(NodeKind::Content, None);
        let f1 = store.add_node(NodeKind::Folder, None);
        let f2 = store.add_node(NodeKind::Folder, None);
        let mut nodes: Vec<CanvasNode> = store.state().nodes().cloned().collect();
        for node in &mut nodes {
            if let Some(folder) = node.data.as_folder_mut() {
                folder.child_node_ids = vec![a.clone(), NodeId::new("ghost"), f1.clone()];
            }
        }
        store.set_nodes(nodes).unwrap();

        let children = |id: &NodeId| store.node(id).unwrap().data.as_folder().unwrap().child_node_ids.clone();
        assert_eq!(children(&f1), vec![a.clone()]);
        assert!(children(&f2).is_empty());
    }

    #[test]
    fn generation_reporting_flow() {
        let (mut store, _, _) = store();
        let source = store.add_node(NodeKind::Content, None);
        set_text(&mut store, &source, "facts");
        let id = store.add_node(NodeKind::Generator, None);
        store.update_node(
            &id,
            NodePatch::variant(VariantPatch::Generator(GeneratorPatch {
                input: Some("summarize @con-1".into()),
                provider: Some(Some(AiProvider::Anthropic)),
                ..GeneratorPatch::default()
            })),
        );

        let ticket = store.begin_generation(&id).unwrap();
        assert_eq!(
            ticket.parts,
            vec![MessageContentPart::text("summarize "), MessageContentPart::text("facts")]
        );
        assert_eq!(ticket.provider, Some(AiProvider::Anthropic));
        assert!(store.begin_generation(&id).is_none());
        assert_eq!(store.state().pulses().len(), 1);

        assert!(store.append_generator_text(&id, "Sum"));
        assert!(store.append_generator_text(&id, "mary"));
        assert_eq!(store.resolve_alias("output-1"), "Summary");

        store.set_generator_running(&id, false);
        assert!(!store.append_generator_text(&id, " ignored"));
        assert_eq!(store.resolve_alias("output-1"), "Summary");

        store.begin_generation(&id).unwrap();
        assert!(store.set_generator_error(&id, "network down"));
        let generator = store.node(&id).unwrap().data.as_generator().unwrap();
        assert_eq!(generator.error.as_deref(), Some("network down"));
        assert!(generator.output.is_none());
        assert!(!generator.is_running);

        assert!(store.begin_generation(&source).is_none());
    }

    #[test]
    fn pulses_expire_and_are_capped() {
        let scheduler = Arc::new(ManualScheduler::new());
        let config = StoreConfig {
            max_pulses: 2,
            ..StoreConfig::default()
        };
        let mut store = CanvasStore::new(config, scheduler.clone(), Arc::new(MemoryStore::new()));
        let first = store.add_pulse(Position::default());
        store.add_pulse(Position::default());
        store.add_pulse(Position::default());
        assert_eq!(store.state().pulses().len(), 2);
        assert!(store.state().pulses().iter().all(|p| p.id != first));

        scheduler.advance(Duration::from_millis(2_000), |e| store.handle_timer(e));
        assert!(store.state().pulses().is_empty());
    }

    #[test]
    fn visible_nodes_hide_collapsed_children() {
        let (mut store, _, _) = store();
        let a = store.add_node(NodeKind::Content, None);
        let b = store.add_node(NodeKind::Content, None);
        let folder = store.create_folder_with_node(&a, None).unwrap();
        assert_eq!(store.visible_nodes().len(), 3);

        store.toggle_folder_expanded(&folder);
        let visible: Vec<_> = store.visible_nodes().into_iter().map(|n| n.id.clone()).collect();
        assert_eq!(visible, vec![b, folder]);
    }

    #[test]
    fn subscriptions_fire_only_on_change() {
        let (mut store, _, _) = store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = store.subscribe(
            |state: &CanvasState| state.node_count(),
            move |count: &usize| sink.lock().push(*count),
        );

        store.add_node(NodeKind::Content, None);
        store.select_node(None);
        store.add_node(NodeKind::Content, None);
        assert_eq!(*seen.lock(), vec![1, 2]);

        assert!(store.unsubscribe(sub));
        store.add_node(NodeKind::Content, None);
        assert_eq!(seen.lock().len(), 2);
        assert!(!store.unsubscribe(sub));
    }

    #[test]
    fn dark_mode_persists_under_its_own_key() {
        let (mut store, _, storage) = store();
        assert!(store.toggle_dark_mode());
        assert_eq!(storage.get("canvas-dark-mode").unwrap().as_deref(), Some("true"));
        assert_eq!(storage.get("canvas-storage").unwrap(), None);
        store.set_dark_mode(true);
        assert_eq!(storage.writes(), 1);
    }

    #[test]
    fn clear_canvas_resets_everything() {
        let (mut store, _, _) = store();
        let id = store.add_node(NodeKind::Content, None);
        store.add_node(NodeKind::Folder, None);
        store.mark_node_for_deletion(&id);
        store.clear_canvas();

        assert_eq!(store.state().node_count(), 0);
        assert_eq!(store.state().counters(), Counters::default());
        assert_eq!(store.state().deleting_ids().count(), 0);
        let again = store.add_node(NodeKind::Content, None);
        assert_eq!(store.node(&again).unwrap().alias(), "con-1");
    }

    #[test]
    fn folder_color_round_trip_through_store() {
        let (mut store, _, _) = store();
        let folder = store.add_node(NodeKind::Folder, None);
        assert!(store.set_folder_color(&folder, FolderColor::Pink));
        let data = store.node(&folder).unwrap().data.as_folder().unwrap();
        assert_eq!(data.color, FolderColor::Pink);
        assert_eq!(data.label, "Folder");
    }
}
