//! Pointer gesture controller
//!
//! Turns press/move/release input into override updates. One gesture is
//! active at a time; pressing again replaces whatever was in progress.
//! While a gesture is active it holds a move listener and a release
//! listener on the shared [`PointerListeners`] table, and gives both back
//! when the gesture ends or the controller is dropped.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use tracing::{debug, info};

use crate::constants::resize::{MIN_HEIGHT, MIN_WIDTH};
use crate::layout::ResolvedLayout;
use crate::overrides::OverridePatch;
use crate::registry::CardRegistry;
use crate::store::OverrideStore;
use crate::types::{round_half_up, CardId, LayoutField, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PointerEventKind {
    Move,
    Up,
}

#[derive(Debug, Default)]
struct ListenerTable {
    next_id: u64,
    attached: BTreeMap<u64, PointerEventKind>,
}

/// Process-wide pointer listener registrations.
///
/// The input adapter consults it to decide whether pointer events should be
/// routed to the drag controller at all.
#[derive(Debug, Clone, Default)]
pub struct PointerListeners {
    table: Rc<RefCell<ListenerTable>>,
}

impl PointerListeners {
    pub fn new() -> Self {
        Self::default()
    }

    fn attach(&self, kind: PointerEventKind) -> ListenerHandle {
        let mut table = self.table.borrow_mut();
        let id = table.next_id;
        table.next_id += 1;
        table.attached.insert(id, kind);
        ListenerHandle { id, table: Rc::downgrade(&self.table) }
    }

    /// Total attached listeners
    pub fn count(&self) -> usize {
        self.table.borrow().attached.len()
    }

    pub fn is_listening(&self, kind: PointerEventKind) -> bool {
        self.table.borrow().attached.values().any(|k| *k == kind)
    }
}

/// One attached listener; detaches on drop
#[derive(Debug)]
struct ListenerHandle {
    id: u64,
    table: Weak<RefCell<ListenerTable>>,
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            table.borrow_mut().attached.remove(&self.id);
        }
    }
}

#[derive(Debug)]
struct GestureListeners {
    _pointer_move: ListenerHandle,
    _pointer_up: ListenerHandle,
}

impl GestureListeners {
    fn attach(listeners: &PointerListeners) -> Self {
        Self {
            _pointer_move: listeners.attach(PointerEventKind::Move),
            _pointer_up: listeners.attach(PointerEventKind::Up),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureMode {
    Move,
    Resize,
}

#[derive(Debug)]
struct MoveGesture {
    card: CardId,
    start: Point,
    base_offset_x: i32,
    base_offset_y: i32,
    _listeners: GestureListeners,
}

#[derive(Debug)]
struct ResizeGesture {
    card: CardId,
    start: Point,
    base_width: i32,
    /// `None` for cards without a fixed height; they never gain one here
    base_height: Option<i32>,
    _listeners: GestureListeners,
}

#[derive(Debug, Default)]
enum DragState {
    #[default]
    Idle,
    Moving(MoveGesture),
    Resizing(ResizeGesture),
}

#[derive(Debug)]
pub struct DragController {
    state: DragState,
    listeners: PointerListeners,
}

impl DragController {
    pub fn new(listeners: PointerListeners) -> Self {
        Self {
            state: DragState::Idle,
            listeners,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    pub fn mode(&self) -> Option<GestureMode> {
        match self.state {
            DragState::Idle => None,
            DragState::Moving(_) => Some(GestureMode::Move),
            DragState::Resizing(_) => Some(GestureMode::Resize),
        }
    }

    pub fn active_card(&self) -> Option<CardId> {
        match &self.state {
            DragState::Idle => None,
            DragState::Moving(gesture) => Some(gesture.card),
            DragState::Resizing(gesture) => Some(gesture.card),
        }
    }

    /// Begin dragging `layout`'s card from `pointer`
    pub fn start_move(&mut self, layout: &ResolvedLayout, pointer: Point) {
        info!(card = %layout.card, x = pointer.x, y = pointer.y, "Move gesture started");
        self.state = DragState::Moving(MoveGesture {
            card: layout.card,
            start: pointer,
            base_offset_x: layout.offset_x,
            base_offset_y: layout.offset_y,
            _listeners: GestureListeners::attach(&self.listeners),
        });
    }

    /// Begin resizing from the card's bottom-right handle. Height only takes
    /// part when the registry gives the card a fixed height.
    pub fn start_resize(&mut self, registry: &CardRegistry, layout: &ResolvedLayout, pointer: Point) {
        let base_height = registry.defaults_of(layout.card).height.and(layout.height);
        info!(card = %layout.card, x = pointer.x, y = pointer.y, "Resize gesture started");
        self.state = DragState::Resizing(ResizeGesture {
            card: layout.card,
            start: pointer,
            base_width: layout.width,
            base_height,
            _listeners: GestureListeners::attach(&self.listeners),
        });
    }

    /// Apply the current pointer position. Returns `false` when idle.
    pub fn pointer_move(&mut self, pointer: Point, store: &mut OverrideStore) -> bool {
        let (card, patch) = match &self.state {
            DragState::Idle => return false,
            DragState::Moving(gesture) => (gesture.card, move_patch(gesture, pointer)),
            DragState::Resizing(gesture) => (gesture.card, resize_patch(gesture, pointer)),
        };
        store.update_override(card, &patch);
        true
    }

    /// Pointer released: end the gesture and release its listeners
    pub fn pointer_up(&mut self) {
        if let Some(card) = self.active_card() {
            debug!(card = %card, "Gesture ended");
        }
        self.state = DragState::Idle;
    }

}

fn move_patch(gesture: &MoveGesture, pointer: Point) -> OverridePatch {
    let dx = pointer.x - gesture.start.x;
    let dy = pointer.y - gesture.start.y;
    OverridePatch::new()
        .set(LayoutField::OffsetX, round_half_up(f64::from(gesture.base_offset_x) + dx))
        .set(LayoutField::OffsetY, round_half_up(f64::from(gesture.base_offset_y) + dy))
}

fn resize_patch(gesture: &ResizeGesture, pointer: Point) -> OverridePatch {
    let dx = pointer.x - gesture.start.x;
    let dy = pointer.y - gesture.start.y;
    let next_width = round_half_up(MIN_WIDTH.max(f64::from(gesture.base_width) + dx));
    let next_height = gesture
        .base_height
        .map(|base| round_half_up(MIN_HEIGHT.max(f64::from(base) + dy)));

    OverridePatch::new()
        .set(LayoutField::Width, next_width)
        .set_or_clear(LayoutField::Height, next_height)
}
