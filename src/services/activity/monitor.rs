use crate::config::ActivityConfig;
use crate::events::{InputEvent, KeyState, MouseButton};
use crate::{debug_if_enabled, trace_if_enabled};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

use super::click_rate::ClickRateEstimator;
use super::state::ActivityState;

/// Владелец состояния активности на основном потоке.
///
/// Слушатель устройств только отправляет события в канал; монитор применяет их,
/// пересчитывает частоту кликов по таймеру и публикует снимки через `watch`.
pub struct ActivityMonitor {
    state: ActivityState,
    clicks: ClickRateEstimator,
    publisher: watch::Sender<ActivityState>,
}

impl ActivityMonitor {
    pub fn new(config: &ActivityConfig) -> Self {
        let (publisher, _) = watch::channel(ActivityState::new());
        Self {
            state: ActivityState::new(),
            clicks: ClickRateEstimator::new(
                Duration::from_millis(config.retention_ms),
                Duration::from_millis(config.window_ms),
            ),
            publisher,
        }
    }

    pub fn state(&self) -> &ActivityState {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<ActivityState> {
        self.publisher.subscribe()
    }

    pub fn apply(&mut self, event: InputEvent) {
        debug_if_enabled!("Событие ввода: {}", event);

        if let InputEvent::Button { button, state: KeyState::Pressed, timestamp } = event {
            self.clicks.record(button, timestamp);
        }

        if self.state.apply(&event) {
            self.publish();
        }
    }

    /// Забрать всё, что накопилось в канале, не ожидая новых событий
    pub fn drain(&mut self, events: &mut mpsc::UnboundedReceiver<InputEvent>) -> usize {
        let mut applied = 0;
        while let Ok(event) = events.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Периодический пересчёт частоты кликов
    pub fn tick(&mut self, now: Instant) {
        let rates = self.clicks.tick(now);
        trace_if_enabled!(
            "История кликов: LMB {}, RMB {}",
            self.clicks.history_len(MouseButton::Left),
            self.clicks.history_len(MouseButton::Right)
        );
        if self.state.set_rates(rates.left, rates.right) {
            self.publish();
        }
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }
}
