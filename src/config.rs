use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::editor::{Point, Size};

/// Имя каталога приложения внутри пользовательского каталога данных
pub const APP_DIR_NAME: &str = "keystrokes-rust";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub input: InputConfig,
    pub activity: ActivityConfig,
    pub editor: EditorConfig,
    pub screen: ScreenConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// `["auto"]` включает автопоиск всех клавиатур и мышей
    pub device_paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActivityConfig {
    pub tick_interval_ms: u64,
    pub retention_ms: u64,
    pub window_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EditorConfig {
    pub grid_size: f64,
    pub default_key_size: Size,
    pub mouse_button_size: Size,
    pub key_spacing: f64,
    pub capture_debounce_ms: u64,
    pub placement_origin: Point,
    pub placement_margin: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScreenConfig {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    pub presets_subdir: String,
    pub session_subdir: String,
    pub session_file: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    pub autosave_on_exit: bool,
    pub cleanup_on_exit: bool,
}

impl LoggingConfig {
    /// Директива фильтра: флаг командной строки, затем `filter`, затем `level`
    pub fn directive(&self, cli_level: Option<&str>) -> String {
        match cli_level {
            Some(level) => level.to_string(),
            None if !self.filter.trim().is_empty() => self.filter.clone(),
            None => self.level.clone(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
                filter: "keystrokes_rust=info".to_string(),
            },
            input: InputConfig {
                device_paths: vec!["auto".to_string()],
            },
            activity: ActivityConfig {
                tick_interval_ms: 100,
                retention_ms: 2000,
                window_ms: 1000,
            },
            editor: EditorConfig {
                grid_size: 12.0,
                default_key_size: Size::new(52.0, 52.0),
                mouse_button_size: Size::new(120.0, 36.0),
                key_spacing: 10.0,
                capture_debounce_ms: 200,
                placement_origin: Point::new(20.0, 100.0),
                placement_margin: 20.0,
            },
            screen: ScreenConfig {
                width: 1920.0,
                height: 1080.0,
            },
            storage: StorageConfig {
                data_dir: None,
                presets_subdir: "presets".to_string(),
                session_subdir: "temp".to_string(),
                session_file: "tempSession.json".to_string(),
            },
            session: SessionConfig {
                autosave_on_exit: true,
                cleanup_on_exit: true,
            },
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        // Значения по умолчанию → TOML файл → переменные окружения
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("KEYSTROKES_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if self.input.device_paths.is_empty() {
            anyhow::bail!("input.device_paths не может быть пустым (используйте \"auto\")");
        }

        // Валидация окон подсчёта кликов
        if self.activity.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms должно быть больше 0");
        }

        if self.activity.window_ms == 0 || self.activity.window_ms > self.activity.retention_ms {
            anyhow::bail!(
                "window_ms ({}) должно быть в диапазоне 1..=retention_ms ({})",
                self.activity.window_ms,
                self.activity.retention_ms
            );
        }

        // Валидация редактора
        if !(self.editor.grid_size > 0.0) {
            anyhow::bail!("grid_size должно быть больше 0");
        }

        for (name, size) in [
            ("default_key_size", self.editor.default_key_size),
            ("mouse_button_size", self.editor.mouse_button_size),
        ] {
            if !(size.width > 0.0 && size.height > 0.0) {
                anyhow::bail!("{} должен иметь положительные размеры", name);
            }
        }

        if !(self.screen.width > 0.0 && self.screen.height > 0.0) {
            anyhow::bail!("Размеры экрана должны быть положительными");
        }

        if self.storage.session_file.is_empty() || self.storage.presets_subdir.is_empty() {
            anyhow::bail!("Имена файлов хранилища не могут быть пустыми");
        }

        Ok(())
    }

    /// Автопоиск устройств включён
    pub fn auto_discover_devices(&self) -> bool {
        self.input.device_paths.iter().any(|path| path == "auto")
    }

    pub fn screen_size(&self) -> Size {
        Size::new(self.screen.width, self.screen.height)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.activity.tick_interval_ms)
    }

    pub fn capture_debounce(&self) -> Duration {
        Duration::from_millis(self.editor.capture_debounce_ms)
    }

    /// Корневой каталог данных приложения: явный из конфигурации или
    /// пользовательский каталог данных платформы
    pub fn data_root(&self) -> Option<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Some(dir.clone()),
            None => dirs_next::data_dir().map(|dir| dir.join(APP_DIR_NAME)),
        }
    }
}
