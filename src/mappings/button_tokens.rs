use crate::events::MouseButton;

/// Фиксированное отображение кнопок мыши в токены
pub struct ButtonTokens;

impl ButtonTokens {
    pub fn token_for(button: MouseButton) -> &'static str {
        match button {
            MouseButton::Left => "LMB",
            MouseButton::Right => "RMB",
            MouseButton::Middle => "MMB",
            MouseButton::Button3 => "MB3",
            MouseButton::Button4 => "MB4",
            MouseButton::Button5 => "MB5",
        }
    }

    pub fn button_for(token: &str) -> Option<MouseButton> {
        MouseButton::ALL
            .into_iter()
            .find(|button| Self::token_for(*button) == token)
    }
}
