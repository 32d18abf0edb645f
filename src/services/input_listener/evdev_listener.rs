use crate::config::Config;
use crate::error::{OverlayError, Result};
use crate::events::{InputEvent, KeyState};
use crate::trace_if_enabled;
use crate::utils::DeviceFinder;
use evdev::{Device, EventStream, EventType};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::r#trait::InputListenerTrait;

/// Пассивный слушатель evdev.
///
/// Устройства открываются только на чтение и не захватываются (без grab),
/// поэтому ввод продолжает доходить до остальных приложений. Каждое устройство
/// читается в своей задаче, события уходят в общий канал.
pub struct EvdevInputListener {
    config: Arc<Config>,
    sender: mpsc::UnboundedSender<InputEvent>,
    devices: Vec<(PathBuf, Device)>,
    tasks: JoinSet<()>,
}

impl EvdevInputListener {
    pub fn new(config: Arc<Config>, sender: mpsc::UnboundedSender<InputEvent>) -> Result<Self> {
        info!("Инициализация EvdevInputListener");

        if config.auto_discover_devices() {
            info!("Автопоиск клавиатур и мышей включён");
        }
        let paths = DeviceFinder::find_input_devices(&config.input.device_paths)?;

        let mut devices = Vec::new();
        for path in paths {
            match Device::open(&path) {
                Ok(device) => {
                    info!(
                        "Устройство открыто на чтение: {} ({:?})",
                        device.name().unwrap_or("Unknown"),
                        path
                    );
                    devices.push((path, device));
                }
                Err(e) => warn!("Не удалось открыть устройство {:?}: {}", path, e),
            }
        }

        if devices.is_empty() {
            return Err(OverlayError::Permission(
                "Ни одно устройство ввода не удалось открыть. \
                 Добавьте пользователя в группу 'input'"
                    .to_string(),
            ));
        }

        Ok(Self {
            config,
            sender,
            devices,
            tasks: JoinSet::new(),
        })
    }

    async fn run_impl(mut self) -> Result<()> {
        info!(
            "EvdevInputListener запущен, читаем {} устройств (путей в конфигурации: {})",
            self.devices.len(),
            self.config.input.device_paths.len()
        );

        for (path, device) in std::mem::take(&mut self.devices) {
            match device.into_event_stream() {
                Ok(stream) => {
                    self.tasks.spawn(read_device(path, stream, self.sender.clone()));
                }
                Err(e) => error!("Не удалось создать поток событий для {:?}: {}", path, e),
            }
        }

        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                if !e.is_cancelled() {
                    error!("Задача чтения устройства завершилась аварийно: {}", e);
                }
            }
        }

        warn!("Все устройства ввода закрыты");
        Ok(())
    }
}

async fn read_device(path: PathBuf, mut stream: EventStream, sender: mpsc::UnboundedSender<InputEvent>) {
    loop {
        let raw = match stream.next_event().await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Ошибка чтения событий {:?}: {}", path, e);
                return;
            }
        };

        if raw.event_type() != EventType::KEY {
            continue;
        }

        let Some(event) = InputEvent::from_evdev(raw.code(), raw.value(), Instant::now()) else {
            continue;
        };

        // Автоповтор не является новым нажатием
        if event.state() == KeyState::Repeat {
            continue;
        }

        trace_if_enabled!("{:?}: {}", path, event);

        if sender.send(event).is_err() {
            // Основной цикл остановлен
            return;
        }
    }
}

#[async_trait::async_trait]
impl InputListenerTrait for EvdevInputListener {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}

impl Drop for EvdevInputListener {
    fn drop(&mut self) {
        self.tasks.abort_all();
        info!("Устройства ввода освобождены");
    }
}
