//! Токены: стабильные строковые имена физических клавиш и кнопок
pub mod button_tokens;
pub mod key_tokens;

pub use button_tokens::ButtonTokens;
pub use key_tokens::KeyTokens;
