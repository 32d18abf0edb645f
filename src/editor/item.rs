use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geometry::{Point, Rect, Size};

/// Вариант отрисовки элемента. На поведение не влияет.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Key,
    Wide,
    Bar,
}

/// Визуальный индикатор клавиши или кнопки на оверлее
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub label: String,
    /// Токен физической клавиши (`W`, `SPACE`, `LMB`); `None` у декоративных элементов
    #[serde(rename = "codeToken")]
    pub code_token: Option<String>,
    pub frame: Rect,
}

impl Item {
    pub fn new(kind: ItemKind, label: impl Into<String>, code_token: Option<String>, frame: Rect) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            label: label.into(),
            code_token,
            frame,
        }
    }

    pub fn key(token: &str, label: impl Into<String>, origin: Point, size: Size) -> Self {
        Self::new(ItemKind::Key, label, Some(token.to_string()), Rect::new(origin, size))
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.code_token.as_deref() == Some(token)
    }
}
