//! Редактируемая раскладка оверлея: элементы, сетка, журнал отмены и захват клавиш
mod builtin;
mod capture;
mod document;
mod geometry;
mod history;
mod item;

pub use builtin::BuiltinLayout;
pub use capture::KeyCapture;
pub use document::{DocumentChange, EditorMode, LayoutDocument};
pub use geometry::{Point, Rect, Size};
pub use item::{Item, ItemKind};
