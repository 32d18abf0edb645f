use crate::error::{OverlayError, Result};
use crate::overlay_error;
use evdev::{Device, KeyCode};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Класс входного устройства по набору поддерживаемых клавиш
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Keyboard,
    Mouse,
}

pub struct DeviceFinder;

impl DeviceFinder {
    /// Найти устройства для пассивного чтения.
    ///
    /// `"auto"` в списке включает автопоиск всех клавиатур и мышей в /dev/input;
    /// остальные элементы считаются явными путями.
    pub fn find_input_devices(device_paths: &[String]) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();

        for entry in device_paths {
            if entry == "auto" {
                found.extend(Self::auto_find_devices()?);
                continue;
            }

            let path = PathBuf::from(entry);
            if path.exists() {
                info!("Используется указанное устройство: {:?}", path);
                found.push(path);
            } else {
                warn!("Указанное устройство не найдено: {:?}", path);
            }
        }

        found.sort();
        found.dedup();

        if found.is_empty() {
            return OverlayError::device_not_found(
                "Не найдено ни одной клавиатуры или мыши. \
                 Убедитесь, что пользователь добавлен в группу 'input'",
            );
        }

        Ok(found)
    }

    fn auto_find_devices() -> Result<Vec<PathBuf>> {
        info!("Начинаем автопоиск клавиатур и мышей...");

        let input_dir = Path::new("/dev/input");
        let entries = fs::read_dir(input_dir)
            .map_err(|e| overlay_error!(permission, "Нет доступа к {}: {}", input_dir.display(), e))?;

        let mut event_devices = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_event = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |name| name.starts_with("event"));
            if is_event {
                event_devices.push(path);
            }
        }

        // Сортируем устройства по номеру
        event_devices.sort();

        let mut devices = Vec::new();
        for path in event_devices {
            debug!("Проверяем устройство: {:?}", path);
            if let Some(kind) = Self::classify(&path) {
                info!("Найдено устройство {:?}: {:?}", kind, path);
                devices.push(path);
            }
        }

        Ok(devices)
    }

    fn classify(device_path: &Path) -> Option<DeviceKind> {
        match Device::open(device_path) {
            Ok(device) => {
                let name = device.name().unwrap_or("Unknown");
                let kind = device.supported_keys().and_then(|keys| {
                    Self::kind_from_keys(
                        keys.contains(KeyCode::KEY_A),
                        keys.contains(KeyCode::KEY_SPACE),
                        keys.contains(KeyCode::BTN_LEFT),
                    )
                });

                if kind.is_none() {
                    debug!("Устройство {:?} ({}) не клавиатура и не мышь", device_path, name);
                }
                kind
            }
            Err(e) => {
                debug!("Не удалось открыть устройство {:?}: {}", device_path, e);
                None
            }
        }
    }

    fn kind_from_keys(has_a: bool, has_space: bool, has_left_button: bool) -> Option<DeviceKind> {
        if has_a && has_space {
            Some(DeviceKind::Keyboard)
        } else if has_left_button {
            Some(DeviceKind::Mouse)
        } else {
            None
        }
    }
}
