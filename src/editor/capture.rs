use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::mappings::{ButtonTokens, KeyTokens};
use crate::services::activity::ActivityState;

use super::document::{EditorMode, LayoutDocument};
use super::geometry::{Point, Size};

/// Курсор размещения новых элементов: слева направо, с переносом на новую строку
#[derive(Debug, Clone)]
pub struct PlacementCursor {
    start: Point,
    current: Point,
    spacing: f64,
    margin: f64,
}

impl PlacementCursor {
    pub fn new(start: Point, spacing: f64, margin: f64) -> Self {
        Self {
            start,
            current: start,
            spacing,
            margin,
        }
    }

    pub fn current(&self) -> Point {
        self.current
    }

    /// Сдвинуть курсор за только что размещённый элемент
    pub fn advance(&mut self, placed: Size, available_width: f64) {
        self.current.x += placed.width + self.spacing;
        if self.current.x > available_width - placed.width - self.margin {
            self.current.x = self.start.x;
            self.current.y += placed.height + self.spacing;
        }
    }

    pub fn reset(&mut self) {
        self.current = self.start;
    }
}

/// Точка отсчёта, с которой ждём следующее нажатие
#[derive(Debug, Clone, Copy)]
struct Armed {
    at: Instant,
    seen: u64,
}

/// Однократный захват: следующее нажатие клавиши или кнопки после входа в режим
/// `AddingKey` добавляет элемент, после чего режим возвращается в `Idle`.
pub struct KeyCapture {
    cursor: PlacementCursor,
    debounce: Duration,
    key_size: Size,
    button_size: Size,
    available_width: f64,
    armed: Option<Armed>,
}

enum Captured {
    Key(String),
    Button(String),
}

impl KeyCapture {
    pub fn new(config: &Config) -> Self {
        let editor = &config.editor;
        Self {
            cursor: PlacementCursor::new(editor.placement_origin, editor.key_spacing, editor.placement_margin),
            debounce: config.capture_debounce(),
            key_size: editor.default_key_size,
            button_size: editor.mouse_button_size,
            available_width: config.screen.width,
            armed: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Войти в режим добавления. Нажатия, случившиеся до этого момента, не учитываются.
    pub fn begin(&mut self, doc: &mut LayoutDocument, activity: &ActivityState, now: Instant) {
        info!("Режим добавления: ожидаем нажатие клавиши или кнопки");
        self.armed = Some(Armed {
            at: now,
            seen: activity.sequence(),
        });
        doc.select(None);
        doc.set_mode(EditorMode::AddingKey);
    }

    pub fn cancel(&mut self, doc: &mut LayoutDocument) {
        if self.armed.take().is_some() {
            debug!("Режим добавления отменён");
        }
        doc.set_mode(EditorMode::Idle);
    }

    /// Начать раскладку новых элементов заново с исходной точки
    pub fn reset_cursor(&mut self) {
        self.cursor.reset();
    }

    /// Проверить, появилось ли новое нажатие, и добавить элемент.
    /// Возвращает id добавленного или перемещённого элемента.
    pub fn poll(&mut self, doc: &mut LayoutDocument, activity: &ActivityState, now: Instant) -> Option<Uuid> {
        if doc.mode() != EditorMode::AddingKey {
            self.armed = None;
            return None;
        }

        // Режим мог быть включён напрямую через документ
        let armed = *self.armed.get_or_insert(Armed {
            at: now,
            seen: activity.sequence(),
        });

        let captured = self.next_capture(activity, armed)?;
        Some(self.place(doc, captured))
    }

    fn next_capture(&mut self, activity: &ActivityState, armed: Armed) -> Option<Captured> {
        let key = activity.last_key_down().filter(|t| t.sequence > armed.seen);
        let mut button = activity.last_button_down().filter(|t| t.sequence > armed.seen);

        // Клик по кнопке интерфейса, включившей режим, не должен стать элементом
        if let Some(transition) = button {
            if transition.at < armed.at + self.debounce {
                debug!("Нажатие {} в пределах debounce, пропускаем", transition.value);
                button = None;
                if key.is_none() {
                    self.armed = Some(Armed {
                        seen: transition.sequence,
                        ..armed
                    });
                }
            }
        }

        match (key, button) {
            (Some(k), Some(b)) if b.sequence < k.sequence => {
                Some(Captured::Button(ButtonTokens::token_for(b.value).to_string()))
            }
            (Some(k), _) => Some(Captured::Key(KeyTokens::token_for(k.value))),
            (None, Some(b)) => Some(Captured::Button(ButtonTokens::token_for(b.value).to_string())),
            (None, None) => None,
        }
    }

    fn place(&mut self, doc: &mut LayoutDocument, captured: Captured) -> Uuid {
        let (token, default_size) = match captured {
            Captured::Key(token) => (token, self.key_size),
            Captured::Button(token) => (token, self.button_size),
        };

        // Уже размещённый элемент переносится с сохранением своего размера
        let size = doc
            .item_by_token(&token)
            .map(|item| item.frame.size)
            .unwrap_or(default_size);

        let origin = self.cursor.current();
        let id = doc.add_key(&token, &token, origin, size);
        info!("Добавлен элемент {} в точке ({}, {})", token, origin.x, origin.y);

        self.cursor.advance(size, self.available_width);
        self.armed = None;
        doc.set_mode(EditorMode::Idle);
        id
    }
}
