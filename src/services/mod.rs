pub mod activity;
pub mod command;
pub mod console;
pub mod event_loop;
pub mod input_listener;

pub use command::EditorCommand;
pub use console::{spawn_console, spawn_status_logger};
pub use event_loop::OverlayRuntime;
pub use input_listener::create_input_listener;
