//! Interactive edit session driven by line commands
//!
//! Wires the store, the drag controller and the persistence gateway together
//! the way a dashboard would: pointer input is only routed to the controller
//! while it holds listeners, and saving commits through the gateway.

use anyhow::{Result, anyhow, bail};
use serde::Serialize;
use std::cell::Cell;
use std::fmt::Write as _;
use std::rc::Rc;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::drag::{DragController, GestureMode, PointerEventKind, PointerListeners};
use crate::layout::{LayoutCache, ResolvedLayout, like_button_anchor};
use crate::overrides::OverridePatch;
use crate::persistence::{PersistenceGateway, commit_layout};
use crate::store::{OverrideStore, StoreChange, Subscription};
use crate::types::{CardId, LayoutField, Point};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Edit,
    Press { card: CardId, mode: GestureMode, pointer: Point },
    Drag(Point),
    Release,
    Order { card: CardId, order: i32 },
    Reset { card: CardId, field: LayoutField },
    Cancel,
    Preview,
    Save,
    Status,
    Show,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            ["edit"] => Command::Edit,
            ["press", card, mode, x, y] => {
                let mode = match *mode {
                    "move" => GestureMode::Move,
                    "resize" => GestureMode::Resize,
                    other => bail!("Unknown gesture '{}', expected move or resize", other),
                };
                Command::Press { card: card.parse()?, mode, pointer: parse_pointer(x, y)? }
            }
            ["drag", x, y] => Command::Drag(parse_pointer(x, y)?),
            ["release"] => Command::Release,
            ["order", card, order] => Command::Order {
                card: card.parse()?,
                order: order.parse().map_err(|e| anyhow!("Invalid order '{}': {}", order, e))?,
            },
            ["reset", card, field] => Command::Reset { card: card.parse()?, field: field.parse()? },
            ["cancel"] => Command::Cancel,
            ["preview"] => Command::Preview,
            ["save"] => Command::Save,
            ["status"] => Command::Status,
            ["show"] => Command::Show,
            ["quit"] | ["exit"] => Command::Quit,
            [] => bail!("Empty command"),
            [other, ..] => bail!("Unknown command '{}' (or wrong number of arguments)", other),
        };
        Ok(command)
    }
}

fn parse_pointer(x: &str, y: &str) -> Result<Point> {
    let x = x.parse::<f64>().map_err(|e| anyhow!("Invalid x '{}': {}", x, e))?;
    let y = y.parse::<f64>().map_err(|e| anyhow!("Invalid y '{}': {}", y, e))?;
    Ok(Point::new(x, y))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Output(String),
    Silent,
    Quit,
}

/// Every card's resolved layout plus the like button anchor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    pub cards: Vec<ResolvedLayout>,
    pub like_button: Point,
}

impl LayoutSnapshot {
    pub fn from_layouts(cards: Vec<ResolvedLayout>) -> Self {
        let find = |id: CardId| cards.iter().find(|layout| layout.card == id);
        let like_button = match (find(CardId::ShareCard), find(CardId::MusicCard)) {
            (Some(share), Some(music)) => like_button_anchor(share, music),
            _ => Point::default(),
        };
        Self { cards, like_button }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for layout in &self.cards {
            let height = layout.height.map_or_else(|| "auto".to_string(), |h| h.to_string());
            let _ = writeln!(
                out,
                "{:>3}  {:<14} x={:>8.1} y={:>8.1} w={:>4} h={:>4}",
                layout.order, layout.card, layout.x, layout.y, layout.width, height
            );
        }
        let _ = write!(out, "     {:<14} x={:>8.1} y={:>8.1}", "like-button", self.like_button.x, self.like_button.y);
        out
    }
}

pub struct EditSession<G: PersistenceGateway> {
    store: OverrideStore,
    listeners: PointerListeners,
    drag: DragController,
    cache: LayoutCache,
    center: Point,
    gateway: G,
    changes: Rc<Cell<u64>>,
    _subscription: Subscription,
}

impl<G: PersistenceGateway> EditSession<G> {
    pub fn new(store: OverrideStore, center: Point, gateway: G) -> Self {
        let changes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&changes);
        let subscription = store.subscribe(move |change: StoreChange| {
            counter.set(counter.get() + 1);
            debug!(change = ?change, "Store changed");
        });

        let listeners = PointerListeners::new();
        let drag = DragController::new(listeners.clone());
        Self {
            store,
            listeners,
            drag,
            cache: LayoutCache::new(),
            center,
            gateway,
            changes,
            _subscription: subscription,
        }
    }

    pub fn store(&self) -> &OverrideStore {
        &self.store
    }

    pub fn listeners(&self) -> &PointerListeners {
        &self.listeners
    }

    /// Store notifications observed so far
    pub fn changes_seen(&self) -> u64 {
        self.changes.get()
    }

    pub fn snapshot(&mut self) -> LayoutSnapshot {
        let layouts = self.cache.resolve_all(self.store.registry(), self.store.overrides(), self.center);
        debug!(hits = self.cache.hits(), misses = self.cache.misses(), "Resolved layouts");
        LayoutSnapshot::from_layouts(layouts)
    }

    pub async fn handle(&mut self, command: Command) -> Result<Reply> {
        let reply = match command {
            Command::Edit => {
                self.store.enter_edit_mode();
                Reply::Output("editing".to_string())
            }
            Command::Press { card, mode, pointer } => {
                self.require_edit_mode("press")?;
                self.press(card, mode, pointer);
                Reply::Silent
            }
            Command::Drag(pointer) => {
                if !self.listeners.is_listening(PointerEventKind::Move) {
                    debug!("Pointer move with no active gesture, ignoring");
                    return Ok(Reply::Silent);
                }
                self.drag.pointer_move(pointer, &mut self.store);
                Reply::Silent
            }
            Command::Release => {
                if self.listeners.is_listening(PointerEventKind::Up) {
                    self.drag.pointer_up();
                }
                Reply::Silent
            }
            Command::Order { card, order } => {
                self.require_edit_mode("order")?;
                self.store.update_override(card, &OverridePatch::new().set(LayoutField::Order, order));
                Reply::Silent
            }
            Command::Reset { card, field } => {
                self.require_edit_mode("reset")?;
                self.store.update_override(card, &OverridePatch::new().clear(field));
                Reply::Silent
            }
            Command::Cancel => {
                self.drag.pointer_up();
                self.store.cancel_editing();
                Reply::Output("cancelled".to_string())
            }
            Command::Preview => {
                self.drag.pointer_up();
                self.store.preview_editing();
                Reply::Output("previewing".to_string())
            }
            Command::Save => self.save().await?,
            Command::Status => Reply::Output(self.status()),
            Command::Show => Reply::Output(self.snapshot().render_text()),
            Command::Quit => {
                if self.store.has_changes() {
                    let fields: usize = self.store.overrides().values().map(|o| o.len()).sum();
                    warn!(cards = self.store.overrides().len(), fields, "Quitting with unsaved layout changes");
                }
                Reply::Quit
            }
        };
        Ok(reply)
    }

    fn press(&mut self, card: CardId, mode: GestureMode, pointer: Point) {
        let layout = self.cache.resolve(self.store.registry(), card, self.store.overrides().get(&card), self.center);
        match mode {
            GestureMode::Move => self.drag.start_move(&layout, pointer),
            GestureMode::Resize => self.drag.start_resize(self.store.registry(), &layout, pointer),
        }
    }

    async fn save(&mut self) -> Result<Reply> {
        self.require_edit_mode("save")?;
        if !self.store.has_changes() {
            return Ok(Reply::Output("nothing to save".to_string()));
        }
        self.drag.pointer_up();
        let payload = commit_layout(&mut self.store, &self.gateway).await?;
        info!(cards = payload.overrides.len(), "Layout saved from edit session");
        Ok(Reply::Output(format!("saved {} card override(s)", payload.overrides.len())))
    }

    fn status(&self) -> String {
        let mode = match self.store.backup_overrides() {
            Some(backup) => format!("editing backup={}", backup.len()),
            None => "viewing".to_string(),
        };
        let gesture = match (self.drag.is_active(), self.drag.mode(), self.drag.active_card()) {
            (true, Some(GestureMode::Move), Some(card)) => format!("moving {card}"),
            (true, Some(GestureMode::Resize), Some(card)) => format!("resizing {card}"),
            _ => "idle".to_string(),
        };
        format!(
            "mode={} changes={} overrides={} saved={} gesture={} listeners={}",
            mode,
            self.store.has_changes(),
            self.store.overrides().len(),
            self.store.saved_overrides().len(),
            gesture,
            self.listeners.count()
        )
    }

    fn require_edit_mode(&self, action: &str) -> Result<()> {
        if !self.store.is_edit_mode() {
            bail!("'{}' is only available in edit mode", action);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overrides::{LayoutPayload, Override, OverrideMap};
    use crate::registry::CardRegistry;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemoryGateway {
        pushed: RefCell<Vec<LayoutPayload>>,
        fail: bool,
    }

    impl PersistenceGateway for MemoryGateway {
        async fn push(&self, payload: &LayoutPayload) -> Result<()> {
            if self.fail {
                bail!("disk full");
            }
            self.pushed.borrow_mut().push(payload.clone());
            Ok(())
        }
    }

    fn session_with(gateway: MemoryGateway) -> EditSession<MemoryGateway> {
        let store = OverrideStore::new(CardRegistry::builtin(), &OverrideMap::new());
        EditSession::new(store, Point::new(400.0, 300.0), gateway)
    }

    async fn run(session: &mut EditSession<MemoryGateway>, lines: &[&str]) {
        for line in lines {
            session.handle(line.parse().unwrap()).await.unwrap();
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("edit".parse::<Command>().unwrap(), Command::Edit);
        assert_eq!(
            "press music-card resize 10 -2.5".parse::<Command>().unwrap(),
            Command::Press { card: CardId::MusicCard, mode: GestureMode::Resize, pointer: Point::new(10.0, -2.5) }
        );
        assert_eq!(
            "  order nav-card 9 ".parse::<Command>().unwrap(),
            Command::Order { card: CardId::NavCard, order: 9 }
        );
        assert_eq!("exit".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("".parse::<Command>().is_err());
        assert!("press ghost-card move 1 2".parse::<Command>().is_err());
        assert!("press hi-card spin 1 2".parse::<Command>().is_err());
        assert!("drag 1".parse::<Command>().is_err());
        assert!("order hi-card first".parse::<Command>().is_err());
        assert!("reset hi-card depth".parse::<Command>().is_err());
    }

    #[tokio::test]
    async fn test_drag_then_save_commits_payload() {
        let mut session = session_with(MemoryGateway::default());
        run(&mut session, &["edit", "press clock-card move 0 0", "drag 10 -4", "release"]).await;
        assert_eq!(session.listeners().count(), 0);
        assert!(session.store().has_changes());

        let reply = session.handle(Command::Save).await.unwrap();
        assert_eq!(reply, Reply::Output("saved 1 card override(s)".to_string()));
        assert!(!session.store().has_changes());
        assert!(session.store().is_edit_mode());

        let pushed = session.gateway.pushed.borrow();
        assert_eq!(pushed.len(), 1);
        assert_eq!(
            pushed[0].overrides[&CardId::ClockCard],
            Override { offset_x: Some(226), offset_y: Some(-228), ..Default::default() }
        );
    }

    #[tokio::test]
    async fn test_save_outside_edit_mode_is_error() {
        let mut session = session_with(MemoryGateway::default());
        let err = session.handle(Command::Save).await.unwrap_err();
        assert!(err.to_string().contains("only available in edit mode"));
    }

    #[tokio::test]
    async fn test_save_without_changes_does_not_push() {
        let mut session = session_with(MemoryGateway::default());
        run(&mut session, &["edit"]).await;
        let reply = session.handle(Command::Save).await.unwrap();
        assert_eq!(reply, Reply::Output("nothing to save".to_string()));
        assert!(session.gateway.pushed.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_edits() {
        let mut session = session_with(MemoryGateway { fail: true, ..Default::default() });
        run(&mut session, &["edit", "order hi-card 12"]).await;
        assert!(session.handle(Command::Save).await.is_err());
        assert!(session.store().has_changes());
        assert_eq!(session.store().overrides()[&CardId::HiCard].order, Some(12));
    }

    #[tokio::test]
    async fn test_reset_clears_one_field() {
        let mut session = session_with(MemoryGateway::default());
        run(&mut session, &["edit", "press calendar-card resize 0 0", "drag 20 10", "release"]).await;
        assert_eq!(
            session.store().overrides()[&CardId::CalendarCard],
            Override { width: Some(370), height: Some(296), ..Default::default() }
        );

        run(&mut session, &["reset calendar-card height"]).await;
        assert_eq!(
            session.store().overrides()[&CardId::CalendarCard],
            Override { width: Some(370), ..Default::default() }
        );
        run(&mut session, &["reset calendar-card width"]).await;
        assert!(session.store().overrides().is_empty());
    }

    #[tokio::test]
    async fn test_pointer_events_ignored_without_gesture() {
        let mut session = session_with(MemoryGateway::default());
        run(&mut session, &["edit", "drag 50 50", "release"]).await;
        assert!(session.store().overrides().is_empty());
        assert_eq!(session.changes_seen(), 1);
    }

    #[tokio::test]
    async fn test_press_requires_edit_mode() {
        let mut session = session_with(MemoryGateway::default());
        assert!(session.handle("press hi-card move 0 0".parse().unwrap()).await.is_err());
        assert_eq!(session.listeners().count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_gesture_releases_listeners_and_restores() {
        let mut session = session_with(MemoryGateway::default());
        run(&mut session, &["edit", "press art-card resize 0 0", "drag 40 40"]).await;
        assert_eq!(session.listeners().count(), 2);

        run(&mut session, &["cancel"]).await;
        assert_eq!(session.listeners().count(), 0);
        assert!(session.store().overrides().is_empty());
        assert!(!session.store().is_edit_mode());
    }

    #[tokio::test]
    async fn test_status_and_show() {
        let mut session = session_with(MemoryGateway::default());
        run(&mut session, &["edit", "press music-card move 0 0"]).await;

        let Reply::Output(status) = session.handle(Command::Status).await.unwrap() else {
            panic!("status should print");
        };
        assert_eq!(status, "mode=editing backup=0 changes=false overrides=0 saved=0 gesture=moving music-card listeners=2");

        let Reply::Output(table) = session.handle(Command::Show).await.unwrap() else {
            panic!("show should print");
        };
        assert_eq!(table.lines().count(), CardId::COUNT + 1);
        assert!(table.lines().next().is_some_and(|line| line.contains("hi-card")));
        assert!(table.contains("like-button"));
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let mut session = session_with(MemoryGateway::default());
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["cards"].as_array().map(Vec::len), Some(CardId::COUNT));
        assert_eq!(json["cards"][0]["card"], "hi-card");
        assert_eq!(json["cards"][0]["offsetX"], 0);
        assert!(json["likeButton"]["x"].is_number());
        // share card has no fixed height
        let share = json["cards"].as_array().unwrap().iter().find(|c| c["card"] == "share-card").unwrap();
        assert!(share.get("height").is_none());
    }
}
