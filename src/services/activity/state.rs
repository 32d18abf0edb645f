use crate::editor::Item;
use crate::events::{InputEvent, KeyCode, KeyState, MouseButton};
use crate::mappings::{ButtonTokens, KeyTokens};
use std::collections::HashSet;
use std::time::Instant;

/// Последний переход «нажато». `sequence` растёт монотонно для клавиш и кнопок
/// вместе, так что потребитель может отличить новое событие от уже обработанного.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<T> {
    pub value: T,
    pub sequence: u64,
    pub at: Instant,
}

/// Текущее состояние ввода, которое читает слой отрисовки
#[derive(Debug, Clone, Default)]
pub struct ActivityState {
    pressed_keys: HashSet<KeyCode>,
    pressed_buttons: HashSet<MouseButton>,
    last_key_down: Option<Transition<KeyCode>>,
    last_button_down: Option<Transition<MouseButton>>,
    left_cps: f64,
    right_cps: f64,
    sequence: u64,
}

impl ActivityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Применить переход. Возвращает true, если состояние изменилось.
    /// Повторы (autorepeat) не являются новыми переходами и игнорируются.
    pub fn apply(&mut self, event: &InputEvent) -> bool {
        match *event {
            InputEvent::Key { code, state: KeyState::Pressed, timestamp } => {
                self.pressed_keys.insert(code);
                self.sequence += 1;
                self.last_key_down = Some(Transition {
                    value: code,
                    sequence: self.sequence,
                    at: timestamp,
                });
                true
            }
            // last_key_down не сбрасывается: это указатель на последнее событие, а не уровень
            InputEvent::Key { code, state: KeyState::Released, .. } => self.pressed_keys.remove(&code),
            InputEvent::Button { button, state: KeyState::Pressed, timestamp } => {
                self.pressed_buttons.insert(button);
                self.sequence += 1;
                self.last_button_down = Some(Transition {
                    value: button,
                    sequence: self.sequence,
                    at: timestamp,
                });
                true
            }
            InputEvent::Button { button, state: KeyState::Released, .. } => {
                self.pressed_buttons.remove(&button)
            }
            InputEvent::Key { state: KeyState::Repeat, .. }
            | InputEvent::Button { state: KeyState::Repeat, .. } => false,
        }
    }

    pub fn set_rates(&mut self, left: f64, right: f64) -> bool {
        let changed = self.left_cps != left || self.right_cps != right;
        self.left_cps = left;
        self.right_cps = right;
        changed
    }

    pub fn pressed_keys(&self) -> &HashSet<KeyCode> {
        &self.pressed_keys
    }

    pub fn pressed_buttons(&self) -> &HashSet<MouseButton> {
        &self.pressed_buttons
    }

    pub fn last_key_down(&self) -> Option<Transition<KeyCode>> {
        self.last_key_down
    }

    pub fn last_button_down(&self) -> Option<Transition<MouseButton>> {
        self.last_button_down
    }

    /// Номер последнего перехода «нажато»
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn left_cps(&self) -> f64 {
        self.left_cps
    }

    pub fn right_cps(&self) -> f64 {
        self.right_cps
    }

    pub fn is_key_pressed(&self, code: KeyCode) -> bool {
        self.pressed_keys.contains(&code)
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    /// Нажата ли клавиша или кнопка, к которой привязан элемент
    pub fn is_item_pressed(&self, item: &Item) -> bool {
        let Some(token) = item.code_token.as_deref() else {
            return false;
        };

        if let Some(button) = ButtonTokens::button_for(token) {
            return self.is_button_pressed(button);
        }

        KeyTokens::code_for(token).is_some_and(|code| self.is_key_pressed(code))
    }

    /// Частота кликов для элементов LMB/RMB
    pub fn cps_for_item(&self, item: &Item) -> Option<f64> {
        match item.code_token.as_deref().and_then(ButtonTokens::button_for) {
            Some(MouseButton::Left) => Some(self.left_cps),
            Some(MouseButton::Right) => Some(self.right_cps),
            _ => None,
        }
    }
}
