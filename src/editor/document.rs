use std::collections::HashSet;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::geometry::{snap, snap_value, Point, Rect, Size};
use super::history::{EditAction, History};
use super::item::Item;

/// Минимальная сторона при свободном изменении размера рамкой
const MIN_FREE_RESIZE: f64 = 30.0;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Режим взаимодействия редактора
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    Idle,
    AddingKey,
}

/// Уведомление подписчикам (слою отрисовки) об изменении документа
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentChange {
    Items,
    Mode(EditorMode),
    Selection,
    /// Документ целиком заменён загрузкой пресета или сессии
    Reloaded,
}

/// Редактируемая раскладка: элементы оверлея, выделение и журнал отмены.
///
/// Владеет документом только основной поток, поэтому внутренних блокировок нет.
/// Все публичные правки записываются в журнал ровно одной записью; отмена и
/// повтор применяют правки через приватные методы, которые журнал не трогают.
pub struct LayoutDocument {
    items: Vec<Item>,
    mode: EditorMode,
    selected_id: Option<Uuid>,
    multi_selected: HashSet<Uuid>,
    grid_size: f64,
    history: History,
    changes: broadcast::Sender<DocumentChange>,
}

impl LayoutDocument {
    pub fn new(grid_size: f64) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            items: Vec::new(),
            mode: EditorMode::Idle,
            selected_id: None,
            multi_selected: HashSet::new(),
            grid_size,
            history: History::default(),
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.changes.subscribe()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, id: Uuid) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_by_token(&self, token: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.has_token(token))
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditorMode) {
        if self.mode != mode {
            debug!("Режим редактора: {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
            self.notify(DocumentChange::Mode(mode));
        }
    }

    pub fn selected_id(&self) -> Option<Uuid> {
        self.selected_id
    }

    pub fn multi_selected(&self) -> &HashSet<Uuid> {
        &self.multi_selected
    }

    pub fn snap(&self, point: Point) -> Point {
        snap(point, self.grid_size)
    }

    // ---------------------------------------------------------------------
    // Правки, записываемые в журнал
    // ---------------------------------------------------------------------

    /// Добавить элемент для токена. Если элемент с таким токеном уже есть,
    /// он переносится на новое место с новой подписью вместо дублирования.
    pub fn add_key(&mut self, token: &str, label: &str, origin: Point, size: Size) -> Uuid {
        let frame = Rect::new(self.snap(origin), size);

        if let Some(index) = self.index_by_token(token) {
            let old = self.items[index].clone();
            let mut new = old.clone();
            new.frame = frame;
            new.label = label.to_string();
            let id = new.id;

            debug!("Токен {} уже есть в раскладке, обновляем элемент {}", token, id);
            self.commit_update(index, old, new);
            return id;
        }

        let item = Item::key(token, label, frame.origin, frame.size);
        let id = item.id;
        debug!("Добавлен элемент {} для токена {}", id, token);

        self.items.push(item.clone());
        self.history.record(EditAction::Add(item));
        self.notify(DocumentChange::Items);
        id
    }

    pub fn update_position(&mut self, id: Uuid, origin: Point) -> bool {
        let snapped = self.snap(origin);
        self.modify(id, |item| item.frame.origin = snapped)
    }

    pub fn update_label(&mut self, id: Uuid, label: &str) -> bool {
        self.modify(id, |item| item.label = label.to_string())
    }

    /// Полная замена элемента по id (смена типа, размера, пакетные правки).
    /// Правка, которая создала бы второй элемент с тем же токеном, отклоняется.
    pub fn update_item(&mut self, updated: Item) -> bool {
        let Some(index) = self.index_of(updated.id) else {
            debug!("update_item: элемент {} не найден", updated.id);
            return false;
        };

        if let Some(token) = updated.code_token.as_deref() {
            if self.items.iter().any(|other| other.id != updated.id && other.has_token(token)) {
                warn!("Токен {} уже занят другим элементом, правка отклонена", token);
                return false;
            }
        }

        let old = self.items[index].clone();
        self.commit_update(index, old, updated)
    }

    pub fn remove_item(&mut self, id: Uuid) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };

        let item = self.items.remove(index);
        debug!("Удалён элемент {} ({})", item.id, item.label);
        self.history.record(EditAction::Remove { item, index });
        self.prune_selection();
        self.notify(DocumentChange::Items);
        true
    }

    pub fn clear_all(&mut self) {
        let prior = std::mem::take(&mut self.items);
        info!("Очистка раскладки: удалено {} элементов", prior.len());
        self.history.record(EditAction::RemoveAll(prior));
        self.prune_selection();
        self.notify(DocumentChange::Items);
    }

    /// Изменение ширины с привязкой к сетке; ширина не меньше одной клетки
    pub fn resize(&mut self, id: Uuid, delta_width: f64) -> bool {
        let grid = self.grid_size;
        self.modify(id, |item| {
            let width = item.frame.size.width + delta_width;
            item.frame.size.width = snap_value(width, grid).max(grid);
        })
    }

    /// Свободное изменение размера за угол рамки
    pub fn resize_frame(&mut self, id: Uuid, width: f64, height: f64) -> bool {
        let grid = self.grid_size;
        let fit = move |value: f64| snap_value(value.max(MIN_FREE_RESIZE), grid).max(grid);
        self.modify(id, |item| item.frame.size = Size::new(fit(width), fit(height)))
    }

    // ---------------------------------------------------------------------
    // Выделение
    // ---------------------------------------------------------------------

    /// Одиночное выделение; неизвестный id игнорируется
    pub fn select(&mut self, id: Option<Uuid>) {
        if let Some(id) = id {
            if self.index_of(id).is_none() {
                return;
            }
        }
        self.selected_id = id;
        self.multi_selected.clear();
        self.notify(DocumentChange::Selection);
    }

    /// Выделение рамкой: все элементы, пересекающие прямоугольник
    pub fn select_in_rect(&mut self, rect: Rect) -> usize {
        self.multi_selected = self
            .items
            .iter()
            .filter(|item| rect.intersects(&item.frame))
            .map(|item| item.id)
            .collect();
        self.selected_id = None;
        self.notify(DocumentChange::Selection);
        self.multi_selected.len()
    }

    pub fn clear_selection(&mut self) {
        self.selected_id = None;
        self.multi_selected.clear();
        self.notify(DocumentChange::Selection);
    }

    /// Удалить все элементы из множественного выделения (каждое удаление записывается отдельно)
    pub fn remove_selected(&mut self) -> usize {
        let ids = self.selected_in_order();
        ids.into_iter().filter(|id| self.remove_item(*id)).count()
    }

    /// Сдвинуть множественное выделение, каждый элемент с привязкой к сетке
    pub fn move_selected(&mut self, dx: f64, dy: f64) -> usize {
        let ids = self.selected_in_order();
        let mut moved = 0;
        for id in ids {
            let Some(origin) = self.item(id).map(|item| item.frame.origin) else {
                continue;
            };
            if self.update_position(id, Point::new(origin.x + dx, origin.y + dy)) {
                moved += 1;
            }
        }
        moved
    }

    // ---------------------------------------------------------------------
    // Отмена и повтор
    // ---------------------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        let Some(action) = self.history.pop_undo() else {
            return false;
        };

        match action {
            EditAction::Add(item) => {
                self.detach(item.id);
                self.history.push_redo(EditAction::Add(item));
            }
            EditAction::Remove { item, index } => {
                self.attach(index, item.clone());
                self.history.push_redo(EditAction::Remove { item, index });
            }
            EditAction::Update { old, new } => {
                if self.replace(old.clone()) {
                    self.history.push_redo(EditAction::Update { old, new });
                }
            }
            EditAction::RemoveAll(prior) => {
                self.items = prior.clone();
                self.history.push_redo(EditAction::RemoveAll(prior));
            }
        }

        debug!("Отмена выполнена, элементов: {}", self.items.len());
        self.prune_selection();
        self.notify(DocumentChange::Items);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(action) = self.history.pop_redo() else {
            return false;
        };

        match action {
            EditAction::Add(item) => {
                self.items.push(item.clone());
                self.history.push_undo(EditAction::Add(item));
            }
            EditAction::Remove { item, .. } => {
                if let Some(index) = self.detach(item.id) {
                    self.history.push_undo(EditAction::Remove { item, index });
                }
            }
            EditAction::Update { old, new } => {
                if self.replace(new.clone()) {
                    self.history.push_undo(EditAction::Update { old, new });
                }
            }
            EditAction::RemoveAll(_) => {
                let prior = std::mem::take(&mut self.items);
                self.history.push_undo(EditAction::RemoveAll(prior));
            }
        }

        debug!("Повтор выполнен, элементов: {}", self.items.len());
        self.prune_selection();
        self.notify(DocumentChange::Items);
        true
    }

    // ---------------------------------------------------------------------
    // Загрузка
    // ---------------------------------------------------------------------

    /// Заменить содержимое целиком (пресет или сессия). Это не правка:
    /// журнал отмены сбрасывается. Повторы id и токенов отбрасываются,
    /// остаётся первый элемент.
    pub fn replace_all(&mut self, items: Vec<Item>, grid_size: f64) {
        info!("Загрузка раскладки: {} элементов, сетка {}", items.len(), grid_size);
        self.items = dedup_loaded(items);
        if grid_size > 0.0 {
            self.grid_size = grid_size;
        } else {
            warn!("Некорректный шаг сетки {} в загруженных данных, оставляем {}", grid_size, self.grid_size);
        }
        self.history.clear();
        self.selected_id = None;
        self.multi_selected.clear();
        self.notify(DocumentChange::Reloaded);
    }

    // ---------------------------------------------------------------------
    // Внутреннее
    // ---------------------------------------------------------------------

    fn index_of(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn index_by_token(&self, token: &str) -> Option<usize> {
        self.items.iter().position(|item| item.has_token(token))
    }

    /// Изменение одного элемента по id с записью `Update`
    fn modify(&mut self, id: Uuid, edit: impl FnOnce(&mut Item)) -> bool {
        let Some(index) = self.index_of(id) else {
            debug!("Элемент {} не найден, правка проигнорирована", id);
            return false;
        };

        let old = self.items[index].clone();
        let mut new = old.clone();
        edit(&mut new);
        self.commit_update(index, old, new)
    }

    fn commit_update(&mut self, index: usize, old: Item, new: Item) -> bool {
        if old == new {
            return false;
        }
        self.items[index] = new.clone();
        self.history.record(EditAction::Update { old, new });
        self.notify(DocumentChange::Items);
        true
    }

    fn attach(&mut self, index: usize, item: Item) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    fn detach(&mut self, id: Uuid) -> Option<usize> {
        let index = self.index_of(id)?;
        self.items.remove(index);
        Some(index)
    }

    fn replace(&mut self, item: Item) -> bool {
        match self.index_of(item.id) {
            Some(index) => {
                self.items[index] = item;
                true
            }
            None => false,
        }
    }

    fn selected_in_order(&self) -> Vec<Uuid> {
        self.items
            .iter()
            .filter(|item| self.multi_selected.contains(&item.id))
            .map(|item| item.id)
            .collect()
    }

    fn prune_selection(&mut self) {
        let live: HashSet<Uuid> = self.items.iter().map(|item| item.id).collect();
        if let Some(id) = self.selected_id {
            if !live.contains(&id) {
                self.selected_id = None;
            }
        }
        self.multi_selected.retain(|id| live.contains(id));
    }

    fn notify(&self, change: DocumentChange) {
        // Ошибка означает лишь отсутствие подписчиков
        let _ = self.changes.send(change);
    }
}

fn dedup_loaded(items: Vec<Item>) -> Vec<Item> {
    let mut ids = HashSet::new();
    let mut tokens = HashSet::new();
    let mut kept = Vec::with_capacity(items.len());

    for item in items {
        if !ids.insert(item.id) {
            warn!("Повтор id {} в загруженной раскладке, элемент пропущен", item.id);
            continue;
        }
        if let Some(token) = item.code_token.as_deref() {
            if !tokens.insert(token.to_string()) {
                warn!("Повтор токена {} в загруженной раскладке, элемент пропущен", token);
                continue;
            }
        }
        kept.push(item);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::ItemKind;

    const KEY: Size = Size::new(52.0, 52.0);

    /// Сравнение коллекций без учёта порядка
    fn sorted(items: &[Item]) -> Vec<Item> {
        let mut items = items.to_vec();
        items.sort_by_key(|item| item.id);
        items
    }

    fn wasd() -> LayoutDocument {
        let mut doc = LayoutDocument::new(12.0);
        doc.add_key("W", "W", Point::new(60.0, 0.0), KEY);
        doc.add_key("A", "A", Point::new(0.0, 60.0), KEY);
        doc.add_key("S", "S", Point::new(60.0, 60.0), KEY);
        doc.add_key("D", "D", Point::new(120.0, 60.0), KEY);
        doc
    }

    #[test]
    fn test_add_key_snaps_origin() {
        let mut doc = LayoutDocument::new(12.0);
        let id = doc.add_key("W", "W", Point::new(17.0, 31.0), KEY);
        let item = doc.item(id).unwrap();
        assert_eq!(item.frame.origin, Point::new(12.0, 36.0));
        assert_eq!(item.frame.size, KEY);
        assert_eq!(item.kind, ItemKind::Key);
        assert!(doc.can_undo());
    }

    #[test]
    fn test_re_adding_token_updates_in_place() {
        let mut doc = wasd();
        let before = doc.len();
        let original_id = doc.item_by_token("W").unwrap().id;

        let id = doc.add_key("W", "Up", Point::new(300.0, 300.0), Size::new(60.0, 60.0));

        assert_eq!(id, original_id);
        assert_eq!(doc.len(), before);
        let item = doc.item(id).unwrap();
        assert_eq!(item.label, "Up");
        assert_eq!(item.frame.origin, Point::new(300.0, 300.0));
        assert_eq!(item.frame.size, Size::new(60.0, 60.0));

        // Отмена возвращает прежнюю рамку, а не удаляет элемент
        assert!(doc.undo());
        assert_eq!(doc.len(), before);
        assert_eq!(doc.item(id).unwrap().frame.origin, Point::new(60.0, 0.0));
    }

    #[test]
    fn test_update_position_label_and_resize() {
        let mut doc = wasd();
        let id = doc.item_by_token("A").unwrap().id;

        assert!(doc.update_position(id, Point::new(25.0, 49.0)));
        assert_eq!(doc.item(id).unwrap().frame.origin, Point::new(24.0, 48.0));

        assert!(doc.update_label(id, "Left"));
        assert_eq!(doc.item(id).unwrap().label, "Left");

        assert!(doc.resize(id, 13.0));
        assert_eq!(doc.item(id).unwrap().frame.size.width, 60.0);

        // Нижняя граница: одна клетка сетки
        assert!(doc.resize(id, -500.0));
        assert_eq!(doc.item(id).unwrap().frame.size.width, 12.0);
    }

    #[test]
    fn test_resize_frame_minimum() {
        let mut doc = wasd();
        let id = doc.item_by_token("D").unwrap().id;
        assert!(doc.resize_frame(id, 5.0, 100.0));
        assert_eq!(doc.item(id).unwrap().frame.size, Size::new(36.0, 96.0));
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut doc = wasd();
        let ghost = Uuid::new_v4();
        assert!(!doc.update_position(ghost, Point::new(1.0, 1.0)));
        assert!(!doc.update_label(ghost, "x"));
        assert!(!doc.remove_item(ghost));
        assert!(!doc.resize(ghost, 10.0));

        // В журнале только четыре добавления
        for _ in 0..4 {
            assert!(doc.undo());
        }
        assert!(!doc.undo());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_update_item_rejects_duplicate_token() {
        let mut doc = wasd();
        let mut a = doc.item_by_token("A").unwrap().clone();
        a.code_token = Some("W".to_string());
        assert!(!doc.update_item(a));

        let mut a = doc.item_by_token("A").unwrap().clone();
        a.kind = ItemKind::Wide;
        a.frame.size.width = 120.0;
        assert!(doc.update_item(a.clone()));
        assert_eq!(doc.item(a.id).unwrap().kind, ItemKind::Wide);
    }

    #[test]
    fn test_clear_all_then_undo_restores_original_ids() {
        let mut doc = wasd();
        let before = doc.items().to_vec();

        doc.clear_all();
        assert!(doc.is_empty());

        assert!(doc.undo());
        assert_eq!(doc.items(), before.as_slice());

        assert!(doc.redo());
        assert!(doc.is_empty());
        assert!(doc.undo());
        assert_eq!(sorted(doc.items()), sorted(&before));
    }

    #[test]
    fn test_remove_undo_restores_position_in_order() {
        let mut doc = wasd();
        let before = doc.items().to_vec();
        let s = doc.item_by_token("S").unwrap().id;

        assert!(doc.remove_item(s));
        assert_eq!(doc.len(), 3);
        assert!(doc.undo());
        assert_eq!(doc.items(), before.as_slice());
    }

    #[test]
    fn test_new_edit_discards_redo_branch() {
        let mut doc = wasd();
        assert!(doc.undo());
        assert!(doc.can_redo());

        doc.add_key("Q", "Q", Point::new(0.0, 0.0), KEY);
        assert!(!doc.can_redo());
        assert!(!doc.redo());
    }

    #[test]
    fn test_undo_redo_on_empty_history() {
        let mut doc = LayoutDocument::new(12.0);
        assert!(!doc.can_undo());
        assert!(!doc.can_redo());
        assert!(!doc.undo());
        assert!(!doc.redo());
    }

    #[test]
    fn test_every_edit_is_reversible() {
        // Детерминированная псевдослучайная последовательность правок
        let mut seed: u64 = 0x5eed;
        let mut next = move |bound: usize| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as usize) % bound
        };
        let tokens = ["W", "A", "S", "D", "SPACE", "LMB", "RMB"];
        let mut doc = LayoutDocument::new(12.0);

        for _ in 0..300 {
            let before = sorted(doc.items());
            let pick = doc.items().get(next(doc.len().max(1))).map(|item| item.id);

            match (next(7), pick) {
                (0, _) | (1, None) => {
                    let token = tokens[next(tokens.len())];
                    let origin = Point::new(next(500) as f64, next(500) as f64);
                    doc.add_key(token, token, origin, KEY);
                }
                (1, Some(id)) => {
                    doc.update_position(id, Point::new(next(800) as f64, next(600) as f64));
                }
                (2, Some(id)) => {
                    doc.update_label(id, &format!("L{}", next(100)));
                }
                (3, Some(id)) => {
                    doc.resize(id, next(80) as f64 - 40.0);
                }
                (4, Some(id)) => {
                    doc.remove_item(id);
                }
                (5, Some(id)) => {
                    let mut item = doc.item(id).unwrap().clone();
                    item.kind = ItemKind::Bar;
                    item.frame.size.height = 12.0 * (1 + next(4)) as f64;
                    doc.update_item(item);
                }
                (6, _) => doc.clear_all(),
                _ => {}
            }

            // Правки без видимого эффекта не проверяем
            if sorted(doc.items()) == before {
                continue;
            }

            let after = sorted(doc.items());
            assert!(doc.undo());
            assert_eq!(sorted(doc.items()), before);
            assert!(doc.redo());
            assert_eq!(sorted(doc.items()), after);
        }
    }

    #[test]
    fn test_select_in_rect_and_bulk_edits() {
        let mut doc = wasd();
        doc.select(doc.item_by_token("W").map(|item| item.id));
        assert!(doc.selected_id().is_some());

        // Рамка захватывает нижний ряд A, S, D
        let count = doc.select_in_rect(Rect::from_corners(Point::new(0.0, 70.0), Point::new(200.0, 90.0)));
        assert_eq!(count, 3);
        assert!(doc.selected_id().is_none());

        assert_eq!(doc.move_selected(24.0, 0.0), 3);
        assert_eq!(doc.item_by_token("A").unwrap().frame.origin, Point::new(24.0, 60.0));

        assert_eq!(doc.remove_selected(), 3);
        assert_eq!(doc.len(), 1);
        assert!(doc.multi_selected().is_empty());

        // Каждое удаление отменяется по отдельности
        for _ in 0..3 {
            assert!(doc.undo());
        }
        assert_eq!(doc.len(), 4);
    }

    #[test]
    fn test_select_unknown_id_ignored() {
        let mut doc = wasd();
        doc.select(Some(Uuid::new_v4()));
        assert!(doc.selected_id().is_none());
    }

    #[test]
    fn test_selection_pruned_on_remove() {
        let mut doc = wasd();
        let w = doc.item_by_token("W").unwrap().id;
        doc.select(Some(w));
        doc.remove_item(w);
        assert!(doc.selected_id().is_none());
    }

    #[test]
    fn test_replace_all_resets_history() {
        let mut doc = wasd();
        let items = vec![Item::key("LMB", "LMB", Point::new(0.0, 0.0), Size::new(75.0, 36.0))];

        doc.replace_all(items.clone(), 8.0);

        assert_eq!(doc.items(), items.as_slice());
        assert_eq!(doc.grid_size(), 8.0);
        assert!(!doc.can_undo());
        assert!(!doc.undo());
        assert_eq!(doc.items(), items.as_slice());
    }

    #[test]
    fn test_change_notifications() {
        let mut doc = LayoutDocument::new(12.0);
        let mut rx = doc.subscribe();

        doc.set_mode(EditorMode::AddingKey);
        doc.add_key("W", "W", Point::new(0.0, 0.0), KEY);
        doc.replace_all(Vec::new(), 12.0);

        assert_eq!(rx.try_recv().unwrap(), DocumentChange::Mode(EditorMode::AddingKey));
        assert_eq!(rx.try_recv().unwrap(), DocumentChange::Items);
        assert_eq!(rx.try_recv().unwrap(), DocumentChange::Reloaded);
    }
}
