use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::editor::{KeyCapture, LayoutDocument};
use crate::events::InputEvent;
use crate::services::activity::ActivityMonitor;
use crate::services::command::EditorCommand;
use crate::storage::PresetStore;

/// Результат обработки команды
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Всё изменяемое состояние оверлея, которым владеет основной цикл
pub struct OverlayRuntime {
    config: Arc<Config>,
    document: LayoutDocument,
    monitor: ActivityMonitor,
    capture: KeyCapture,
    store: Option<PresetStore>,
}

impl OverlayRuntime {
    pub fn new(config: Arc<Config>, store: Option<PresetStore>) -> Self {
        Self {
            document: LayoutDocument::new(config.editor.grid_size),
            monitor: ActivityMonitor::new(&config.activity),
            capture: KeyCapture::new(&config),
            store,
            config,
        }
    }

    pub fn document(&self) -> &LayoutDocument {
        &self.document
    }

    pub fn monitor(&self) -> &ActivityMonitor {
        &self.monitor
    }

    pub fn store(&self) -> Option<&PresetStore> {
        self.store.as_ref()
    }

    /// Основной цикл: события ввода, таймер частоты кликов и команды интерфейса.
    /// Завершается по `shutdown`, команде `Shutdown` или закрытию обоих каналов.
    pub async fn run<F>(
        &mut self,
        mut events: mpsc::UnboundedReceiver<InputEvent>,
        mut commands: mpsc::UnboundedReceiver<EditorCommand>,
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut input_open = true;
        let mut commands_open = true;

        info!("Основной цикл запущен");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Получен сигнал завершения");
                    break;
                }
                event = events.recv(), if input_open => match event {
                    Some(event) => {
                        self.handle_input(event);
                        if self.monitor.drain(&mut events) > 0 {
                            self.poll_capture(Instant::now());
                        }
                    }
                    None => {
                        warn!("Канал событий ввода закрыт");
                        input_open = false;
                    }
                },
                _ = ticker.tick() => {
                    self.monitor.tick(Instant::now());
                    // Захват мог ждать окончания debounce
                    self.poll_capture(Instant::now());
                }
                command = commands.recv(), if commands_open => match command {
                    Some(command) => {
                        if self.handle_command(command) == Flow::Stop {
                            break;
                        }
                    }
                    None => {
                        debug!("Канал команд закрыт");
                        commands_open = false;
                    }
                },
            }
        }

        info!("Основной цикл остановлен");
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        let at = event.timestamp();
        self.monitor.apply(event);
        self.poll_capture(at);
    }

    fn poll_capture(&mut self, now: Instant) {
        if let Some(id) = self.capture.poll(&mut self.document, self.monitor.state(), now) {
            info!("Элемент {} добавлен захватом ввода", id);
        }
    }

    pub fn handle_command(&mut self, command: EditorCommand) -> Flow {
        debug!("Команда: {:?}", command);

        match command {
            EditorCommand::BeginCapture => {
                if self.capture.is_armed() {
                    debug!("Режим добавления уже включён, ожидание начинается заново");
                }
                self.capture.begin(&mut self.document, self.monitor.state(), Instant::now());
            }
            EditorCommand::CancelCapture => self.capture.cancel(&mut self.document),
            EditorCommand::Undo => {
                if !self.document.undo() {
                    info!("Нечего отменять");
                }
            }
            EditorCommand::Redo => {
                if !self.document.redo() {
                    info!("Нечего повторять");
                }
            }
            EditorCommand::Move { token, origin } => {
                if let Some(id) = self.resolve(&token) {
                    self.document.update_position(id, origin);
                }
            }
            EditorCommand::Rename { token, label } => {
                if let Some(id) = self.resolve(&token) {
                    self.document.update_label(id, &label);
                }
            }
            EditorCommand::Resize { token, delta_width } => {
                if let Some(id) = self.resolve(&token) {
                    self.document.resize(id, delta_width);
                }
            }
            EditorCommand::ResizeFrame { token, size } => {
                if let Some(id) = self.resolve(&token) {
                    self.document.resize_frame(id, size.width, size.height);
                }
            }
            EditorCommand::SetKind { token, kind } => {
                if let Some(item) = self.document.item_by_token(&token) {
                    let mut updated = item.clone();
                    updated.kind = kind;
                    self.document.update_item(updated);
                } else {
                    warn!("Элемент с токеном {} не найден", token);
                }
            }
            EditorCommand::Remove { token } => {
                if let Some(id) = self.resolve(&token) {
                    self.document.remove_item(id);
                }
            }
            EditorCommand::ClearAll => {
                self.document.clear_all();
                self.capture.reset_cursor();
            }
            EditorCommand::Select { token: None } => self.document.clear_selection(),
            EditorCommand::Select { token: Some(token) } => {
                let id = self.resolve(&token);
                self.document.select(id);
            }
            EditorCommand::SelectInRect(rect) => {
                let count = self.document.select_in_rect(rect);
                info!("Выделено элементов: {}", count);
            }
            EditorCommand::MoveSelected { dx, dy } => {
                self.document.move_selected(dx, dy);
            }
            EditorCommand::RemoveSelected => {
                let removed = self.document.remove_selected();
                info!("Удалено выделенных элементов: {}", removed);
            }
            EditorCommand::Export { name } => self.export(&name),
            EditorCommand::Load { preset } => self.load(&preset),
            EditorCommand::Builtin(layout) => layout.apply(&mut self.document, self.config.screen_size()),
            EditorCommand::ListPresets => self.list_presets(),
            EditorCommand::ListItems => self.list_items(),
            EditorCommand::Shutdown => return Flow::Stop,
        }

        Flow::Continue
    }

    fn resolve(&self, token: &str) -> Option<Uuid> {
        let id = self.document.item_by_token(token).map(|item| item.id);
        if id.is_none() {
            warn!("Элемент с токеном {} не найден", token);
        }
        id
    }

    fn export(&self, name: &str) {
        let Some(store) = &self.store else {
            warn!("Хранилище недоступно, экспорт пропущен");
            return;
        };
        if let Err(e) = store.export_preset(name, &self.document, self.config.screen_size(), Utc::now()) {
            warn!("Не удалось экспортировать пресет {:?}: {}", name, e);
        }
    }

    fn load(&mut self, preset: &str) {
        let Some(store) = &self.store else {
            warn!("Хранилище недоступно, загрузка пропущена");
            return;
        };
        let path = store.resolve_preset(preset);
        if store.load_preset_into(&mut self.document, &path) {
            self.capture.reset_cursor();
        }
    }

    /// Восстановить временную сессию, если она сохранилась
    pub fn restore_session(&mut self) -> bool {
        match &self.store {
            Some(store) => store.restore_session_into(&mut self.document),
            None => false,
        }
    }

    fn list_presets(&self) {
        let Some(store) = &self.store else {
            warn!("Хранилище недоступно");
            return;
        };
        match store.list_presets() {
            Ok(names) if names.is_empty() => info!("Пресетов нет в {}", store.presets_dir().display()),
            Ok(names) => {
                for name in names {
                    info!("Пресет: {}", name);
                }
            }
            Err(e) => warn!("Не удалось прочитать список пресетов: {}", e),
        }
    }

    fn list_items(&self) {
        info!("Элементов в раскладке: {}", self.document.len());
        let activity = self.monitor.state();
        for item in self.document.items() {
            let selected = self.document.selected_id() == Some(item.id)
                || self.document.multi_selected().contains(&item.id);
            let pressed = if activity.is_item_pressed(item) { " [нажато]" } else { "" };
            let cps = activity
                .cps_for_item(item)
                .map(|cps| format!(" {} CPS", cps))
                .unwrap_or_default();
            info!(
                "{} {} {:?} ({}, {}) {}x{}{}{}",
                if selected { "*" } else { " " },
                item.code_token.as_deref().unwrap_or("-"),
                item.label,
                item.frame.origin.x,
                item.frame.origin.y,
                item.frame.size.width,
                item.frame.size.height,
                pressed,
                cps
            );
        }
    }

    /// Автосохранение сессии при выходе (если включено)
    pub fn autosave(&self) {
        if !self.config.session.autosave_on_exit {
            return;
        }
        match &self.store {
            Some(store) => {
                if let Err(e) = store.save_session(&self.document, self.config.screen_size()) {
                    warn!("Не удалось сохранить временную сессию: {}", e);
                }
            }
            None => warn!("Хранилище недоступно, сессия не сохранена"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{BuiltinLayout, EditorMode, ItemKind, Point};
    use crate::events::{KeyCode, KeyState, MouseButton};
    use std::time::Duration;

    fn runtime_in(dir: &std::path::Path) -> OverlayRuntime {
        let mut config = Config::default();
        config.storage.data_dir = Some(dir.to_path_buf());
        let store = PresetStore::from_config(&config).unwrap();
        OverlayRuntime::new(Arc::new(config), Some(store))
    }

    #[test]
    fn test_capture_adds_pressed_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = runtime_in(dir.path());

        runtime.handle_command(EditorCommand::BeginCapture);
        assert_eq!(runtime.document().mode(), EditorMode::AddingKey);

        // KEY_W
        runtime.handle_input(InputEvent::key_down(KeyCode(17)));

        assert_eq!(runtime.document().mode(), EditorMode::Idle);
        assert!(runtime.document().item_by_token("W").is_some());
        assert!(runtime.monitor().state().is_key_pressed(KeyCode(17)));
    }

    #[test]
    fn test_click_right_after_begin_is_debounced() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = runtime_in(dir.path());

        runtime.handle_command(EditorCommand::BeginCapture);
        runtime.handle_input(InputEvent::button_down(MouseButton::Left));
        assert_eq!(runtime.document().mode(), EditorMode::AddingKey);
        assert!(runtime.document().is_empty());

        let later = Instant::now() + Duration::from_millis(300);
        runtime.handle_input(InputEvent::button_at(MouseButton::Left, KeyState::Released, later));
        runtime.handle_input(InputEvent::button_at(MouseButton::Right, KeyState::Pressed, later));
        assert!(runtime.document().item_by_token("RMB").is_some());
        assert!(runtime.document().item_by_token("LMB").is_none());
    }

    #[test]
    fn test_token_addressed_edits_and_undo() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = runtime_in(dir.path());

        runtime.handle_command(EditorCommand::Builtin(BuiltinLayout::Wasd));
        assert_eq!(runtime.document().len(), 4);

        runtime.handle_command(EditorCommand::Move {
            token: "W".to_string(),
            origin: Point::new(25.0, 13.0),
        });
        let origin = runtime.document().item_by_token("W").unwrap().frame.origin;
        assert_eq!(origin, Point::new(24.0, 12.0));

        runtime.handle_command(EditorCommand::SetKind {
            token: "S".to_string(),
            kind: ItemKind::Wide,
        });
        assert_eq!(runtime.document().item_by_token("S").unwrap().kind, ItemKind::Wide);
        runtime.handle_command(EditorCommand::Undo);
        assert_eq!(runtime.document().item_by_token("S").unwrap().kind, ItemKind::Key);

        runtime.handle_command(EditorCommand::Remove { token: "missing".to_string() });
        assert_eq!(runtime.document().len(), 4);

        runtime.handle_command(EditorCommand::Undo);
        let origin = runtime.document().item_by_token("W").unwrap().frame.origin;
        assert_ne!(origin, Point::new(24.0, 12.0));
    }

    #[test]
    fn test_export_then_load_through_commands() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = runtime_in(dir.path());

        runtime.handle_command(EditorCommand::Builtin(BuiltinLayout::Mouse));
        let saved = runtime.document().items().to_vec();
        runtime.handle_command(EditorCommand::Export { name: "Mouse".to_string() });

        let names = runtime.store().unwrap().list_presets().unwrap();
        assert_eq!(names.len(), 1);

        runtime.handle_command(EditorCommand::ClearAll);
        assert!(runtime.document().is_empty());

        runtime.handle_command(EditorCommand::Load { preset: names[0].clone() });
        assert_eq!(runtime.document().items(), saved.as_slice());
        assert!(!runtime.document().can_undo());
    }

    #[test]
    fn test_autosave_and_restore_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = runtime_in(dir.path());
        runtime.handle_command(EditorCommand::Builtin(BuiltinLayout::Space));
        runtime.autosave();

        let mut restored = runtime_in(dir.path());
        assert!(restored.restore_session());
        assert_eq!(restored.document().items(), runtime.document().items());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_command() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = runtime_in(dir.path());

        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        command_tx.send(EditorCommand::Builtin(BuiltinLayout::Wasd)).unwrap();
        command_tx.send(EditorCommand::Undo).unwrap();
        command_tx.send(EditorCommand::Shutdown).unwrap();

        tokio::time::timeout(
            Duration::from_secs(5),
            runtime.run(event_rx, command_rx, std::future::pending()),
        )
        .await
        .unwrap();

        assert_eq!(runtime.document().len(), 3);
        assert!(runtime.document().can_redo());
    }

    #[tokio::test]
    async fn test_run_applies_input_events() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = runtime_in(dir.path());

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel::<EditorCommand>();
        event_tx.send(InputEvent::key_down(KeyCode(57))).unwrap();
        drop(event_tx);
        drop(command_tx);

        let shutdown = async {
            tokio::time::sleep(Duration::from_millis(250)).await;
        };
        runtime.run(event_rx, command_rx, shutdown).await;

        assert!(runtime.monitor().state().is_key_pressed(KeyCode(57)));
    }
}
