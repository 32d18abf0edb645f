mod click_rate;
mod monitor;
mod state;

pub use monitor::ActivityMonitor;
pub use state::ActivityState;
