use super::item::Item;

/// Одна отменяемая правка документа
#[derive(Debug, Clone, PartialEq)]
pub(super) enum EditAction {
    Add(Item),
    /// `index`: позиция, на которую элемент вернётся при отмене
    Remove { item: Item, index: usize },
    Update { old: Item, new: Item },
    RemoveAll(Vec<Item>),
}

/// Журнал правок: стек отмены и стек повтора
#[derive(Debug, Default)]
pub(super) struct History {
    undo: Vec<EditAction>,
    redo: Vec<EditAction>,
}

impl History {
    /// Новая правка пользователя: ветка повтора отбрасывается
    pub fn record(&mut self, action: EditAction) {
        self.undo.push(action);
        self.redo.clear();
    }

    pub fn pop_undo(&mut self) -> Option<EditAction> {
        self.undo.pop()
    }

    pub fn pop_redo(&mut self) -> Option<EditAction> {
        self.redo.pop()
    }

    pub fn push_undo(&mut self, action: EditAction) {
        self.undo.push(action);
    }

    pub fn push_redo(&mut self, action: EditAction) {
        self.redo.push(action);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::geometry::{Point, Size};

    fn sample() -> Item {
        Item::key("W", "W", Point::new(0.0, 0.0), Size::new(52.0, 52.0))
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::default();
        history.record(EditAction::Add(sample()));
        let action = history.pop_undo().unwrap();
        history.push_redo(action);
        assert!(history.can_redo());

        history.record(EditAction::RemoveAll(vec![]));
        assert!(!history.can_redo());
        assert!(history.can_undo());
    }

    #[test]
    fn test_empty_history() {
        let mut history = History::default();
        assert!(history.pop_undo().is_none());
        assert!(history.pop_redo().is_none());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
