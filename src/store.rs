//! Override store and edit-session state machine
//!
//! The store owns three override sets:
//! - **overrides**: the live working set the renderer resolves against
//! - **saved**: the last baseline known to be persisted
//! - **backup**: a snapshot taken when an edit session starts, only while editing
//!
//! Sessions end by cancel (restore the backup), preview (keep edits, drop the
//! backup) or commit (the caller persists `get_payload()` and then calls
//! `set_saved_overrides`).

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, info, warn};

use crate::overrides::{prune_map, LayoutPayload, OverrideMap, OverridePatch};
use crate::registry::CardRegistry;
use crate::types::CardId;

/// What a committed mutation did, delivered to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    EditModeEntered,
    OverrideUpdated(CardId),
    EditingCancelled,
    EditingPreviewed,
    SavedOverridesReplaced,
}

#[derive(Debug, Clone, PartialEq)]
enum EditState {
    Viewing,
    Editing { backup: OverrideMap },
}

type Listener = Rc<dyn Fn(StoreChange)>;

#[derive(Default)]
struct ListenerList {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Keeps a store listener attached; dropping it unsubscribes
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<RefCell<ListenerList>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

pub struct OverrideStore {
    registry: CardRegistry,
    overrides: OverrideMap,
    saved: OverrideMap,
    state: EditState,
    listeners: Rc<RefCell<ListenerList>>,
}

impl OverrideStore {
    /// Seed both the working set and the saved baseline from persisted overrides
    pub fn new(registry: CardRegistry, initial: &OverrideMap) -> Self {
        let seeded = prune_map(&registry, initial);
        if seeded != *initial {
            warn!(
                before = initial.len(),
                after = seeded.len(),
                "Persisted overrides were not minimal, dropped default-valued fields"
            );
        }

        Self {
            registry,
            overrides: seeded.clone(),
            saved: seeded,
            state: EditState::Viewing,
            listeners: Rc::new(RefCell::new(ListenerList::default())),
        }
    }

    pub fn registry(&self) -> &CardRegistry {
        &self.registry
    }

    pub fn overrides(&self) -> &OverrideMap {
        &self.overrides
    }

    pub fn saved_overrides(&self) -> &OverrideMap {
        &self.saved
    }

    /// Snapshot taken when the current edit session began
    pub fn backup_overrides(&self) -> Option<&OverrideMap> {
        match &self.state {
            EditState::Viewing => None,
            EditState::Editing { backup } => Some(backup),
        }
    }

    pub fn is_edit_mode(&self) -> bool {
        matches!(self.state, EditState::Editing { .. })
    }

    pub fn enter_edit_mode(&mut self) {
        if self.is_edit_mode() {
            debug!("Already in edit mode, ignoring");
            return;
        }
        self.state = EditState::Editing { backup: self.overrides.clone() };
        info!(overrides = self.overrides.len(), "Entered edit mode");
        self.notify(StoreChange::EditModeEntered);
    }

    /// Merge `patch` into the card's override and prune the result.
    /// Ignored outside edit mode so late pointer events can't touch viewing state.
    pub fn update_override(&mut self, card: CardId, patch: &OverridePatch) {
        if !self.is_edit_mode() {
            debug!(card = %card, "Ignoring override update outside edit mode");
            return;
        }
        if patch.is_empty() {
            return;
        }

        let current = self.overrides.get(&card).copied().unwrap_or_default();
        let merged = patch.apply_to(current);
        let cleaned = merged.pruned(self.registry.defaults_of(card));

        let previous = match cleaned {
            Some(cleaned) => self.overrides.insert(card, cleaned),
            None => self.overrides.remove(&card),
        };
        if previous == cleaned {
            return;
        }

        debug!(card = %card, fields = ?cleaned, "Updated override");
        self.notify(StoreChange::OverrideUpdated(card));
    }

    /// Leave edit mode restoring the session backup, or the saved baseline
    /// when there is no session to roll back
    pub fn cancel_editing(&mut self) {
        let state = std::mem::replace(&mut self.state, EditState::Viewing);
        self.overrides = match state {
            EditState::Editing { backup } => backup,
            EditState::Viewing => self.saved.clone(),
        };
        info!(overrides = self.overrides.len(), "Cancelled editing");
        self.notify(StoreChange::EditingCancelled);
    }

    /// Leave edit mode keeping the edits uncommitted. The backup is discarded,
    /// so a later cancel falls back to the saved baseline.
    pub fn preview_editing(&mut self) {
        self.state = EditState::Viewing;
        info!(has_changes = self.has_changes(), "Previewing edits");
        self.notify(StoreChange::EditingPreviewed);
    }

    /// Adopt `next` as both the saved baseline and the working set
    pub fn set_saved_overrides(&mut self, next: &OverrideMap) {
        let next = prune_map(&self.registry, next);
        self.overrides = next.clone();
        self.saved = next;
        info!(overrides = self.saved.len(), "Saved overrides replaced");
        self.notify(StoreChange::SavedOverridesReplaced);
    }

    pub fn get_payload(&self) -> LayoutPayload {
        LayoutPayload::new(self.overrides.clone())
    }

    pub fn has_changes(&self) -> bool {
        self.overrides != self.saved
    }

    /// Register a listener called after every committed mutation
    pub fn subscribe(&self, listener: impl Fn(StoreChange) + 'static) -> Subscription {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Rc::new(listener)));
        Subscription { id, listeners: Rc::downgrade(&self.listeners) }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    fn notify(&self, change: StoreChange) {
        // Collect first so listeners may subscribe/unsubscribe while being called
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(change);
        }
    }
}

impl std::fmt::Debug for OverrideStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideStore")
            .field("overrides", &self.overrides)
            .field("saved", &self.saved)
            .field("state", &self.state)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
