use crate::config::Config;
use crate::error::Result;
use crate::events::InputEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Источник событий ввода, работающий до остановки задачи
#[async_trait::async_trait]
pub trait InputListenerTrait {
    async fn run(self: Box<Self>) -> Result<()>;
}

/// Создать слушатель по флагу dry_run.
///
/// Если устройства не удалось открыть, возвращается холостой слушатель:
/// оверлей остаётся рабочим, просто без событий.
pub fn create_input_listener(
    config: Arc<Config>,
    sender: mpsc::UnboundedSender<InputEvent>,
    dry_run: bool,
) -> Box<dyn InputListenerTrait + Send> {
    if dry_run {
        return Box::new(super::dry_run_listener::DryRunInputListener::new(config));
    }

    match super::evdev_listener::EvdevInputListener::new(config.clone(), sender) {
        Ok(listener) => Box::new(listener),
        Err(e) => {
            warn!("Захват ввода недоступен, продолжаем без событий: {}", e);
            Box::new(super::dry_run_listener::DryRunInputListener::new(config))
        }
    }
}
