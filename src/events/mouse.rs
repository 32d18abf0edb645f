use serde::{Deserialize, Serialize};
use std::fmt;

/// Кнопки мыши, которые отображает оверлей
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Button3,
    Button4,
    Button5,
}

impl MouseButton {
    pub const ALL: [MouseButton; 6] = [
        MouseButton::Left,
        MouseButton::Right,
        MouseButton::Middle,
        MouseButton::Button3,
        MouseButton::Button4,
        MouseButton::Button5,
    ];

    /// evdev код BTN_* → кнопка. BTN_BACK и прочие не отслеживаются
    pub fn from_evdev_code(code: u16) -> Option<Self> {
        match code {
            0x110 => Some(MouseButton::Left),    // BTN_LEFT
            0x111 => Some(MouseButton::Right),   // BTN_RIGHT
            0x112 => Some(MouseButton::Middle),  // BTN_MIDDLE
            0x113 => Some(MouseButton::Button3), // BTN_SIDE
            0x114 => Some(MouseButton::Button4), // BTN_EXTRA
            0x115 => Some(MouseButton::Button5), // BTN_FORWARD
            _ => None,
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_evdev_code() {
        assert_eq!(MouseButton::from_evdev_code(0x110), Some(MouseButton::Left));
        assert_eq!(MouseButton::from_evdev_code(0x111), Some(MouseButton::Right));
        assert_eq!(MouseButton::from_evdev_code(0x112), Some(MouseButton::Middle));
        assert_eq!(MouseButton::from_evdev_code(0x115), Some(MouseButton::Button5));
    }

    #[test]
    fn test_non_mouse_codes_ignored() {
        // BTN_TOUCH и обычные клавиши не считаются кнопками мыши
        assert_eq!(MouseButton::from_evdev_code(0x14a), None);
        assert_eq!(MouseButton::from_evdev_code(30), None);
    }
}
