use serde::{Deserialize, Serialize};

use crate::editor::{Item, LayoutDocument, Size};

/// Имя-заглушка временной сессии
pub const SESSION_PRESET_NAME: &str = "TemporarySession";

/// Снимок раскладки на диске. Размер окна сохраняется для будущего масштабирования.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetFile {
    pub name: String,
    pub items: Vec<Item>,
    pub window_width: f64,
    pub window_height: f64,
    pub grid_size: f64,
}

impl PresetFile {
    pub fn from_document(name: &str, doc: &LayoutDocument, window: Size) -> Self {
        Self {
            name: name.to_string(),
            items: doc.items().to_vec(),
            window_width: window.width,
            window_height: window.height,
            grid_size: doc.grid_size(),
        }
    }

    pub fn window_size(&self) -> Size {
        Size::new(self.window_width, self.window_height)
    }

    /// Заменить содержимое документа; журнал отмены сбрасывается
    pub fn apply_to(self, doc: &mut LayoutDocument) {
        doc.replace_all(self.items, self.grid_size);
    }
}
