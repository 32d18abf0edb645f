//! Сохранение раскладки: пресеты и временная сессия в JSON
mod preset;
mod store;

pub use store::PresetStore;
