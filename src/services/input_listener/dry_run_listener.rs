use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, info};

use super::r#trait::InputListenerTrait;

/// Холостой слушатель: не открывает устройства и не шлёт событий
pub struct DryRunInputListener {
    config: Arc<Config>,
}

impl DryRunInputListener {
    pub fn new(config: Arc<Config>) -> Self {
        info!("Инициализация DryRunInputListener");
        Self { config }
    }

    async fn run_impl(self) -> Result<()> {
        info!(
            "Dry-run режим - устройства ввода не читаются (настроено путей: {})",
            self.config.input.device_paths.len()
        );

        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
            debug!("InputListener работает в dry-run режиме");
        }
    }
}

#[async_trait::async_trait]
impl InputListenerTrait for DryRunInputListener {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}
