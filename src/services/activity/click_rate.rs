use crate::events::MouseButton;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Клики в секунду по левой и правой кнопкам
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClickRates {
    pub left: f64,
    pub right: f64,
}

/// Оценка частоты кликов скользящим окном.
///
/// История хранится не дольше `retention`, частота считается по последнему `window`.
/// Запись и подсчёт разделены: запись происходит на каждое нажатие, подсчёт по таймеру.
#[derive(Debug)]
pub struct ClickRateEstimator {
    retention: Duration,
    window: Duration,
    left: VecDeque<Instant>,
    right: VecDeque<Instant>,
}

impl ClickRateEstimator {
    pub fn new(retention: Duration, window: Duration) -> Self {
        Self {
            retention,
            window,
            left: VecDeque::new(),
            right: VecDeque::new(),
        }
    }

    /// Записать клик. Кнопки кроме левой и правой не считаются.
    pub fn record(&mut self, button: MouseButton, at: Instant) {
        if let Some(history) = self.history_mut(button) {
            history.push_back(at);
        }
    }

    /// Отбросить устаревшие отметки и посчитать частоты на момент `now`
    pub fn tick(&mut self, now: Instant) -> ClickRates {
        let (retention, window) = (self.retention, self.window);

        for history in [&mut self.left, &mut self.right] {
            history.retain(|&t| now.saturating_duration_since(t) <= retention);
        }

        let count = |history: &VecDeque<Instant>| {
            history
                .iter()
                .filter(|&&t| now.saturating_duration_since(t) <= window)
                .count() as f64
        };

        ClickRates {
            left: count(&self.left),
            right: count(&self.right),
        }
    }

    pub fn history_len(&self, button: MouseButton) -> usize {
        match button {
            MouseButton::Left => self.left.len(),
            MouseButton::Right => self.right.len(),
            _ => 0,
        }
    }

    fn history_mut(&mut self, button: MouseButton) -> Option<&mut VecDeque<Instant>> {
        match button {
            MouseButton::Left => Some(&mut self.left),
            MouseButton::Right => Some(&mut self.right),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> ClickRateEstimator {
        ClickRateEstimator::new(Duration::from_secs(2), Duration::from_secs(1))
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_five_clicks_within_window() {
        let t0 = Instant::now();
        let mut clicks = estimator();
        for offset in [0, 200, 400, 600, 800] {
            clicks.record(MouseButton::Left, t0 + ms(offset));
        }

        let rates = clicks.tick(t0 + ms(900));
        assert_eq!(rates.left, 5.0);
        assert_eq!(rates.right, 0.0);
    }

    #[test]
    fn test_rate_decays_and_retention_drops_old_clicks() {
        let t0 = Instant::now();
        let mut clicks = estimator();
        for offset in [0, 200, 400, 600, 800] {
            clicks.record(MouseButton::Left, t0 + ms(offset));
        }

        let rates = clicks.tick(t0 + ms(2100));
        assert_eq!(rates.left, 0.0);
        // t=0.0 старше двух секунд и удалён, t=0.2 ещё в истории
        assert_eq!(clicks.history_len(MouseButton::Left), 4);

        clicks.tick(t0 + ms(3000));
        assert_eq!(clicks.history_len(MouseButton::Left), 0);
    }

    #[test]
    fn test_buttons_are_independent() {
        let t0 = Instant::now();
        let mut clicks = estimator();
        clicks.record(MouseButton::Left, t0);
        clicks.record(MouseButton::Right, t0 + ms(100));
        clicks.record(MouseButton::Right, t0 + ms(150));
        clicks.record(MouseButton::Middle, t0 + ms(160));

        let rates = clicks.tick(t0 + ms(500));
        assert_eq!(rates, ClickRates { left: 1.0, right: 2.0 });
        assert_eq!(clicks.history_len(MouseButton::Middle), 0);
    }

    #[test]
    fn test_tick_before_clicks_never_negative() {
        let t0 = Instant::now();
        let mut clicks = estimator();
        clicks.record(MouseButton::Left, t0 + ms(500));

        // Отметка из «будущего» относительно now считается попавшей в окно
        let rates = clicks.tick(t0);
        assert_eq!(rates.left, 1.0);
        assert!(rates.right >= 0.0);
    }
}
