use clap::ValueEnum;
use std::str::FromStr;

use crate::editor::{BuiltinLayout, ItemKind, Point, Rect, Size};
use crate::error::OverlayError;
use crate::overlay_error;

/// Запросы слоя интерфейса к основному циклу.
///
/// Элементы адресуются токеном: токен уникален в документе.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    BeginCapture,
    CancelCapture,
    Undo,
    Redo,
    Move { token: String, origin: Point },
    Rename { token: String, label: String },
    Resize { token: String, delta_width: f64 },
    ResizeFrame { token: String, size: Size },
    SetKind { token: String, kind: ItemKind },
    Remove { token: String },
    ClearAll,
    Select { token: Option<String> },
    SelectInRect(Rect),
    MoveSelected { dx: f64, dy: f64 },
    RemoveSelected,
    Export { name: String },
    Load { preset: String },
    Builtin(BuiltinLayout),
    ListPresets,
    ListItems,
    Shutdown,
}

/// Краткая справка по текстовым командам консоли
pub const COMMAND_HELP: &[&str] = &[
    "add                      - добавить следующую нажатую клавишу или кнопку",
    "cancel                   - выйти из режима добавления",
    "undo | redo              - отменить или повторить правку",
    "move <TOKEN> <x> <y>     - переместить элемент",
    "label <TOKEN> <текст>    - переименовать элемент",
    "resize <TOKEN> <dw>      - изменить ширину на dw",
    "frame <TOKEN> <w> <h>    - задать размер рамки",
    "kind <TOKEN> <key|wide|bar> - вариант отрисовки",
    "remove <TOKEN>           - удалить элемент",
    "clear                    - удалить все элементы",
    "select <TOKEN|none>      - выделить элемент",
    "select-rect <x1> <y1> <x2> <y2> - выделить рамкой",
    "move-selected <dx> <dy>",
    "remove-selected",
    "export <имя>             - сохранить пресет",
    "load <имя|путь>          - загрузить пресет",
    "builtin <wasd|space|mouse|default>",
    "presets | list | quit",
];

impl FromStr for EditorCommand {
    type Err = OverlayError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(overlay_error!(command, "пустая строка"));
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("add", []) => EditorCommand::BeginCapture,
            ("cancel", []) => EditorCommand::CancelCapture,
            ("undo", []) => EditorCommand::Undo,
            ("redo", []) => EditorCommand::Redo,
            ("move", [token, x, y]) => EditorCommand::Move {
                token: token.to_string(),
                origin: Point::new(number(x)?, number(y)?),
            },
            ("label", [token, label @ ..]) if !label.is_empty() => EditorCommand::Rename {
                token: token.to_string(),
                label: label.join(" "),
            },
            ("resize", [token, dw]) => EditorCommand::Resize {
                token: token.to_string(),
                delta_width: number(dw)?,
            },
            ("frame", [token, w, h]) => EditorCommand::ResizeFrame {
                token: token.to_string(),
                size: Size::new(number(w)?, number(h)?),
            },
            ("kind", [token, kind]) => EditorCommand::SetKind {
                token: token.to_string(),
                kind: ItemKind::from_str(kind, true)
                    .map_err(|_| overlay_error!(command, "неизвестный вариант элемента: {}", kind))?,
            },
            ("remove", [token]) => EditorCommand::Remove { token: token.to_string() },
            ("clear", []) => EditorCommand::ClearAll,
            ("select", ["none"]) => EditorCommand::Select { token: None },
            ("select", [token]) => EditorCommand::Select { token: Some(token.to_string()) },
            ("select-rect", [x1, y1, x2, y2]) => EditorCommand::SelectInRect(Rect::from_corners(
                Point::new(number(x1)?, number(y1)?),
                Point::new(number(x2)?, number(y2)?),
            )),
            ("move-selected", [dx, dy]) => EditorCommand::MoveSelected {
                dx: number(dx)?,
                dy: number(dy)?,
            },
            ("remove-selected", []) => EditorCommand::RemoveSelected,
            ("export", name @ [_, ..]) => EditorCommand::Export { name: name.join(" ") },
            ("load", preset @ [_, ..]) => EditorCommand::Load { preset: preset.join(" ") },
            ("builtin", [layout]) => EditorCommand::Builtin(
                BuiltinLayout::from_str(layout, true)
                    .map_err(|_| overlay_error!(command, "неизвестная раскладка: {}", layout))?,
            ),
            ("presets", []) => EditorCommand::ListPresets,
            ("list", []) => EditorCommand::ListItems,
            ("quit" | "exit", []) => EditorCommand::Shutdown,
            _ => return Err(overlay_error!(command, "{}", line.trim())),
        };

        Ok(command)
    }
}

fn number(text: &str) -> Result<f64, OverlayError> {
    text.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| overlay_error!(command, "ожидалось число, получено {:?}", text))
}
