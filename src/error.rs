use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Устройство не найдено: {0}")]
    DeviceNotFound(String),

    #[error("Недостаточно прав доступа: {0}")]
    Permission(String),

    #[error("Ошибка хранилища: {0}")]
    Persistence(String),

    #[error("Неверная команда: {0}")]
    InvalidCommand(String),
}

impl OverlayError {
    pub fn device_not_found<T>(msg: impl Into<String>) -> Result<T> {
        Err(OverlayError::DeviceNotFound(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, OverlayError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! overlay_error {
    (device_not_found, $($arg:tt)*) => {
        $crate::error::OverlayError::DeviceNotFound(format!($($arg)*))
    };
    (permission, $($arg:tt)*) => {
        $crate::error::OverlayError::Permission(format!($($arg)*))
    };
    (persistence, $($arg:tt)*) => {
        $crate::error::OverlayError::Persistence(format!($($arg)*))
    };
    (command, $($arg:tt)*) => {
        $crate::error::OverlayError::InvalidCommand(format!($($arg)*))
    };
}
