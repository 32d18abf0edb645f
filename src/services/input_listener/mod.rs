mod dry_run_listener;
mod evdev_listener;
mod r#trait;

pub use self::r#trait::create_input_listener;
