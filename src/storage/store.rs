use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::editor::{LayoutDocument, Size};
use crate::error::{OverlayError, Result};
use crate::overlay_error;

use super::preset::{PresetFile, SESSION_PRESET_NAME};

const PRESET_EXTENSION: &str = "json";

/// Файловое хранилище пресетов и временной сессии.
///
/// Только кодирование и ввод-вывод. Недостающие каталоги создаются при записи
/// и считаются пустыми при чтении.
#[derive(Debug, Clone)]
pub struct PresetStore {
    root: PathBuf,
    presets_subdir: String,
    session_subdir: String,
    session_file: String,
}

impl PresetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = Config::default().storage;
        Self {
            root: root.into(),
            presets_subdir: defaults.presets_subdir,
            session_subdir: defaults.session_subdir,
            session_file: defaults.session_file,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let root = config.data_root().ok_or_else(|| {
            overlay_error!(persistence, "Не удалось определить каталог данных пользователя")
        })?;

        Ok(Self {
            presets_subdir: config.storage.presets_subdir.clone(),
            session_subdir: config.storage.session_subdir.clone(),
            session_file: config.storage.session_file.clone(),
            ..Self::new(root)
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn presets_dir(&self) -> PathBuf {
        self.root.join(&self.presets_subdir)
    }

    pub fn session_dir(&self) -> PathBuf {
        self.root.join(&self.session_subdir)
    }

    pub fn session_path(&self) -> PathBuf {
        self.session_dir().join(&self.session_file)
    }

    /// Экспорт пресета. Имя файла содержит имя пресета и отметку времени ISO-8601
    /// (двоеточия заменены), поэтому файлы не перезаписывают друг друга.
    pub fn export_preset(
        &self,
        name: &str,
        doc: &LayoutDocument,
        window: Size,
        now: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let name = if name.trim().is_empty() { "Untitled" } else { name.trim() };
        let preset = PresetFile::from_document(name, doc, window);
        let path = self.presets_dir().join(preset_file_name(name, now));

        write_json(&path, &preset)?;
        info!("Пресет экспортирован: {}", path.display());
        Ok(path)
    }

    pub fn read_preset(&self, path: &Path) -> Result<PresetFile> {
        let content = fs::read_to_string(path)?;
        let preset: PresetFile = serde_json::from_str(&content)?;
        debug!("Прочитан пресет {:?} ({} элементов)", preset.name, preset.items.len());
        Ok(preset)
    }

    /// Имена файлов `*.json` в каталоге пресетов в лексическом порядке
    pub fn list_presets(&self) -> Result<Vec<String>> {
        let dir = self.presets_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let is_preset = path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(PRESET_EXTENSION);
            if !is_preset {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Путь к пресету: существующий путь как есть, иначе имя в каталоге пресетов
    pub fn resolve_preset(&self, name_or_path: &str) -> PathBuf {
        let direct = PathBuf::from(name_or_path);
        if direct.exists() {
            return direct;
        }

        let mut file = name_or_path.to_string();
        if !file.ends_with(".json") {
            file.push_str(".json");
        }
        self.presets_dir().join(file)
    }

    pub fn save_session(&self, doc: &LayoutDocument, window: Size) -> Result<PathBuf> {
        let preset = PresetFile::from_document(SESSION_PRESET_NAME, doc, window);
        let path = self.session_path();
        write_json(&path, &preset)?;
        info!("Временная сессия сохранена: {}", path.display());
        Ok(path)
    }

    /// Временная сессия, если она есть
    pub fn load_session(&self) -> Result<Option<PresetFile>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        self.read_preset(&path).map(Some)
    }

    /// Удалить каталог временной сессии. Ошибка только логируется.
    pub fn remove_temporary_session(&self) -> bool {
        let dir = self.session_dir();
        if !dir.exists() {
            return true;
        }

        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                info!("Каталог временной сессии удалён: {}", dir.display());
                true
            }
            Err(e) => {
                warn!("Не удалось удалить каталог временной сессии {}: {}", dir.display(), e);
                false
            }
        }
    }

    // Операции на границе с документом: ошибки логируются, документ не меняется

    pub fn load_preset_into(&self, doc: &mut LayoutDocument, path: &Path) -> bool {
        match self.read_preset(path) {
            Ok(preset) => {
                let window = preset.window_size();
                info!(
                    "Загружен пресет {:?} из {} (окно {}x{})",
                    preset.name,
                    path.display(),
                    window.width,
                    window.height
                );
                preset.apply_to(doc);
                true
            }
            Err(e) => {
                warn!("Не удалось загрузить пресет {}: {}", path.display(), e);
                false
            }
        }
    }

    pub fn restore_session_into(&self, doc: &mut LayoutDocument) -> bool {
        match self.load_session() {
            Ok(Some(preset)) => {
                info!("Восстановлена временная сессия ({} элементов)", preset.items.len());
                preset.apply_to(doc);
                true
            }
            Ok(None) => {
                debug!("Временной сессии нет");
                false
            }
            Err(e) => {
                warn!("Не удалось прочитать временную сессию: {}", e);
                false
            }
        }
    }
}

/// Имя файла пресета: `<имя>-<ISO-8601 с '-' вместо ':'>.json`
pub fn preset_file_name(name: &str, now: DateTime<Utc>) -> String {
    let safe: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    let stamp = now.format("%Y-%m-%dT%H-%M-%SZ");
    format!("{}-{}.{}", safe, stamp, PRESET_EXTENSION)
}

/// Запись через временный файл и rename, чтобы не оставить полузаписанный JSON
fn write_json(path: &Path, preset: &PresetFile) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| OverlayError::Persistence(format!("У пути {} нет родителя", path.display())))?;
    fs::create_dir_all(parent)?;

    let json = serde_json::to_string_pretty(preset)?;
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Point;
    use chrono::TimeZone;

    fn doc_with_keys() -> LayoutDocument {
        let mut doc = LayoutDocument::new(12.0);
        doc.add_key("W", "W", Point::new(60.0, 0.0), Size::new(52.0, 52.0));
        doc.add_key("LMB", "LMB", Point::new(0.0, 60.0), Size::new(75.0, 36.0));
        doc
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).single().unwrap()
    }

    #[test]
    fn test_preset_file_name_has_timestamp() {
        assert_eq!(
            preset_file_name("My Preset", fixed_time()),
            "My Preset-2026-01-02T03-04-05Z.json"
        );
        assert_eq!(preset_file_name("a/b", fixed_time()), "a_b-2026-01-02T03-04-05Z.json");
    }

    #[test]
    fn test_export_then_load_replaces_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path());
        let source = doc_with_keys();

        let path = store
            .export_preset("Gaming", &source, Size::new(400.0, 300.0), fixed_time())
            .unwrap();
        assert!(path.starts_with(store.presets_dir()));
        assert!(!path.with_extension("tmp").exists());

        let mut target = LayoutDocument::new(8.0);
        target.add_key("Q", "Q", Point::new(0.0, 0.0), Size::new(52.0, 52.0));
        assert!(store.load_preset_into(&mut target, &path));

        assert_eq!(target.items(), source.items());
        assert_eq!(target.grid_size(), 12.0);
        assert!(!target.can_undo());
    }

    #[test]
    fn test_list_presets_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path());
        assert!(store.list_presets().unwrap().is_empty());

        let doc = doc_with_keys();
        let window = Size::new(400.0, 300.0);
        store.export_preset("b", &doc, window, fixed_time()).unwrap();
        store.export_preset("a", &doc, window, fixed_time()).unwrap();
        fs::write(store.presets_dir().join("notes.txt"), "x").unwrap();

        assert_eq!(
            store.list_presets().unwrap(),
            ["a-2026-01-02T03-04-05Z.json", "b-2026-01-02T03-04-05Z.json"]
        );
    }

    #[test]
    fn test_malformed_preset_leaves_document_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path());
        fs::create_dir_all(store.presets_dir()).unwrap();
        let bad = store.presets_dir().join("broken.json");
        fs::write(&bad, "{ \"name\": 1").unwrap();

        let mut doc = doc_with_keys();
        let before = doc.items().to_vec();

        assert!(!store.load_preset_into(&mut doc, &bad));
        assert!(!store.load_preset_into(&mut doc, &dir.path().join("missing.json")));
        assert_eq!(doc.items(), before.as_slice());
        assert!(doc.can_undo());
    }

    #[test]
    fn test_load_drops_duplicate_tokens_and_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path());
        fs::create_dir_all(store.presets_dir()).unwrap();
        let path = store.presets_dir().join("dupes.json");
        let json = r#"{
            "name": "Dupes",
            "windowWidth": 400.0,
            "windowHeight": 300.0,
            "gridSize": 12.0,
            "items": [
                {"id": "11111111-1111-4111-8111-111111111111", "type": "key", "label": "W",
                 "codeToken": "W", "frame": {"origin": {"x": 0.0, "y": 0.0}, "size": {"width": 52.0, "height": 52.0}}},
                {"id": "22222222-2222-4222-8222-222222222222", "type": "key", "label": "W2",
                 "codeToken": "W", "frame": {"origin": {"x": 60.0, "y": 0.0}, "size": {"width": 52.0, "height": 52.0}}},
                {"id": "11111111-1111-4111-8111-111111111111", "type": "bar", "label": "X",
                 "codeToken": null, "frame": {"origin": {"x": 0.0, "y": 60.0}, "size": {"width": 52.0, "height": 52.0}}}
            ]
        }"#;
        fs::write(&path, json).unwrap();

        let mut doc = LayoutDocument::new(12.0);
        assert!(store.load_preset_into(&mut doc, &path));
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.items()[0].label, "W");

        doc.add_key("W", "W", Point::new(120.0, 120.0), Size::new(52.0, 52.0));
        assert_eq!(doc.items().iter().filter(|item| item.has_token("W")).count(), 1);
    }

    #[test]
    fn test_session_save_restore_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path());
        assert!(store.load_session().unwrap().is_none());

        let doc = doc_with_keys();
        let path = store.save_session(&doc, Size::new(1920.0, 1080.0)).unwrap();
        assert!(path.ends_with("temp/tempSession.json"));

        let session = store.load_session().unwrap().unwrap();
        assert_eq!(session.name, SESSION_PRESET_NAME);

        let mut restored = LayoutDocument::new(12.0);
        assert!(store.restore_session_into(&mut restored));
        assert_eq!(restored.items(), doc.items());

        assert!(store.remove_temporary_session());
        assert!(!store.session_dir().exists());
        assert!(store.remove_temporary_session());
        assert!(!store.restore_session_into(&mut restored));
    }

    #[test]
    fn test_resolve_preset() {
        let dir = tempfile::tempdir().unwrap();
        let store = PresetStore::new(dir.path());
        assert_eq!(store.resolve_preset("Gaming"), store.presets_dir().join("Gaming.json"));

        let existing = dir.path().join("direct.json");
        fs::write(&existing, "{}").unwrap();
        assert_eq!(store.resolve_preset(existing.to_str().unwrap()), existing);
    }
}
