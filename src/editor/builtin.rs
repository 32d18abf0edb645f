use clap::ValueEnum;
use tracing::info;

use super::document::LayoutDocument;
use super::geometry::{Point, Size};

const KEY_SIZE: f64 = 52.0;
const KEY_SPACING: f64 = 8.0;
const SPACE_BAR_HEIGHT: f64 = 26.0;

/// Готовые раскладки. Применяются обычными правками, поэтому отменяемы.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuiltinLayout {
    /// W над A S D по центру экрана
    Wasd,
    /// Пробел по центру экрана
    Space,
    /// LMB и RMB рядом по центру экрана
    Mouse,
    /// Блок LMB/RMB, пробел, ASD и W в левом верхнем углу
    Default,
}

impl BuiltinLayout {
    pub fn apply(self, doc: &mut LayoutDocument, screen: Size) {
        info!("Применяется встроенная раскладка {:?}", self);
        match self {
            BuiltinLayout::Wasd => add_wasd(doc, screen),
            BuiltinLayout::Space => add_space_bar(doc, screen),
            BuiltinLayout::Mouse => add_mouse_buttons(doc, screen),
            BuiltinLayout::Default => add_default_keys(doc),
        }
    }
}

fn key(doc: &mut LayoutDocument, token: &str, x: f64, y: f64, size: Size) {
    doc.add_key(token, token, Point::new(x, y), size);
}

fn add_wasd(doc: &mut LayoutDocument, screen: Size) {
    let size = Size::new(KEY_SIZE, KEY_SIZE);
    let step = KEY_SIZE + KEY_SPACING;
    let base_x = screen.width / 2.0 - KEY_SIZE - KEY_SPACING / 2.0;
    let base_y = screen.height / 2.0 - KEY_SIZE - KEY_SPACING / 2.0;

    key(doc, "W", base_x + step, base_y + 2.0 * step, size);
    key(doc, "A", base_x, base_y + step, size);
    key(doc, "S", base_x + step, base_y + step, size);
    key(doc, "D", base_x + 2.0 * step, base_y + step, size);
}

fn add_space_bar(doc: &mut LayoutDocument, screen: Size) {
    let width = 3.0 * KEY_SIZE + 2.0 * KEY_SPACING;
    let x = screen.width / 2.0 - width / 2.0;
    let y = screen.height / 2.0 - SPACE_BAR_HEIGHT / 2.0;
    key(doc, "SPACE", x, y, Size::new(width, SPACE_BAR_HEIGHT));
}

fn add_mouse_buttons(doc: &mut LayoutDocument, screen: Size) {
    let spacing = 4.0;
    let size = Size::new(75.0, 36.0);
    let base_x = screen.width / 2.0 - size.width - spacing / 2.0;
    let base_y = screen.height / 2.0 - size.height / 2.0;

    key(doc, "LMB", base_x, base_y, size);
    key(doc, "RMB", base_x + size.width + spacing, base_y, size);
}

fn add_default_keys(doc: &mut LayoutDocument) {
    let key_size = Size::new(KEY_SIZE, KEY_SIZE);
    let mouse = Size::new(75.0, 56.0);
    let space_y = mouse.height + KEY_SPACING;
    let row_y = space_y + SPACE_BAR_HEIGHT + KEY_SPACING;
    let top_y = row_y + KEY_SIZE + KEY_SPACING;
    let step = KEY_SIZE + KEY_SPACING;

    key(doc, "LMB", 0.0, 0.0, mouse);
    key(doc, "RMB", 110.0 + KEY_SPACING, 0.0, mouse);
    key(doc, "SPACE", 0.0, space_y, Size::new(3.0 * KEY_SIZE + 2.0 * KEY_SPACING, SPACE_BAR_HEIGHT));
    key(doc, "A", 0.0, row_y, key_size);
    key(doc, "S", step, row_y, key_size);
    key(doc, "D", 2.0 * step, row_y, key_size);
    key(doc, "W", step, top_y, key_size);
}
