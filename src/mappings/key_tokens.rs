use crate::events::KeyCode;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Префикс синтетического токена для клавиш без имени: `Key<код>`
const UNKNOWN_KEY_PREFIX: &str = "Key";

/// Таблица токен ↔ evdev код. Имена токенов совпадают с именами в сохранённых пресетах.
const KEY_TOKENS: &[(&str, u16)] = &[
    // Буквенные клавиши
    ("A", 30),   // KEY_A
    ("B", 48),   // KEY_B
    ("C", 46),   // KEY_C
    ("D", 32),   // KEY_D
    ("E", 18),   // KEY_E
    ("F", 33),   // KEY_F
    ("G", 34),   // KEY_G
    ("H", 35),   // KEY_H
    ("I", 23),   // KEY_I
    ("J", 36),   // KEY_J
    ("K", 37),   // KEY_K
    ("L", 38),   // KEY_L
    ("M", 50),   // KEY_M
    ("N", 49),   // KEY_N
    ("O", 24),   // KEY_O
    ("P", 25),   // KEY_P
    ("Q", 16),   // KEY_Q
    ("R", 19),   // KEY_R
    ("S", 31),   // KEY_S
    ("T", 20),   // KEY_T
    ("U", 22),   // KEY_U
    ("V", 47),   // KEY_V
    ("W", 17),   // KEY_W
    ("X", 45),   // KEY_X
    ("Y", 21),   // KEY_Y
    ("Z", 44),   // KEY_Z

    // Цифровые клавиши (верхний ряд)
    ("1", 2),    // KEY_1
    ("2", 3),    // KEY_2
    ("3", 4),    // KEY_3
    ("4", 5),    // KEY_4
    ("5", 6),    // KEY_5
    ("6", 7),    // KEY_6
    ("7", 8),    // KEY_7
    ("8", 9),    // KEY_8
    ("9", 10),   // KEY_9
    ("0", 11),   // KEY_0

    // Специальные клавиши
    ("RETURN", 28),     // KEY_ENTER
    ("ESC", 1),         // KEY_ESC
    ("SPACE", 57),      // KEY_SPACE
    ("TAB", 15),        // KEY_TAB
    ("BACKSPACE", 14),  // KEY_BACKSPACE
    ("CAPS", 58),       // KEY_CAPSLOCK

    // Модификаторы (левые и правые отдельно)
    ("LSHIFT", 42),     // KEY_LEFTSHIFT
    ("RSHIFT", 54),     // KEY_RIGHTSHIFT
    ("LCTRL", 29),      // KEY_LEFTCTRL
    ("RCTRL", 97),      // KEY_RIGHTCTRL
    ("LALT", 56),       // KEY_LEFTALT
    ("RALT", 100),      // KEY_RIGHTALT
    ("LCMD", 125),      // KEY_LEFTMETA
    ("RCMD", 126),      // KEY_RIGHTMETA

    // Функциональные клавиши
    ("F1", 59),
    ("F2", 60),
    ("F3", 61),
    ("F4", 62),
    ("F5", 63),
    ("F6", 64),
    ("F7", 65),
    ("F8", 66),
    ("F9", 67),
    ("F10", 68),
    ("F11", 87),
    ("F12", 88),

    // Стрелки
    ("LEFT", 105),      // KEY_LEFT
    ("RIGHT", 106),     // KEY_RIGHT
    ("DOWN", 108),      // KEY_DOWN
    ("UP", 103),        // KEY_UP

    // Знаки препинания
    ("MINUS", 12),
    ("EQUAL", 13),
    ("LBRACKET", 26),
    ("RBRACKET", 27),
    ("BACKSLASH", 43),
    ("SEMICOLON", 39),
    ("QUOTE", 40),
    ("GRAVE", 41),
    ("COMMA", 51),
    ("PERIOD", 52),
    ("SLASH", 53),

    // Навигация
    ("INSERT", 110),
    ("DELETE", 111),
    ("HOME", 102),
    ("END", 107),
    ("PAGEUP", 104),
    ("PAGEDOWN", 109),
];

static TOKEN_BY_CODE: Lazy<HashMap<u16, &'static str>> =
    Lazy::new(|| KEY_TOKENS.iter().map(|&(token, code)| (code, token)).collect());

static CODE_BY_TOKEN: Lazy<HashMap<&'static str, u16>> =
    Lazy::new(|| KEY_TOKENS.iter().copied().collect());

/// Отображение кодов клавиш в стабильные строковые токены и обратно
pub struct KeyTokens;

impl KeyTokens {
    /// Токен для кода клавиши. Для неизвестных кодов синтезируется `Key<код>`,
    /// так что любая клавиша получает стабильный токен.
    pub fn token_for(code: KeyCode) -> String {
        match TOKEN_BY_CODE.get(&code.value()) {
            Some(token) => (*token).to_string(),
            None => format!("{}{}", UNKNOWN_KEY_PREFIX, code.value()),
        }
    }

    /// Обратное отображение, включая синтетические `Key<код>`
    pub fn code_for(token: &str) -> Option<KeyCode> {
        if let Some(code) = CODE_BY_TOKEN.get(token) {
            return Some(KeyCode(*code));
        }

        token
            .strip_prefix(UNKNOWN_KEY_PREFIX)
            .and_then(|raw| raw.parse::<u16>().ok())
            .map(KeyCode)
            // Только каноническая форма: `Key030` и `Key30` для KEY_A не принимаются
            .filter(|code| Self::token_for(*code) == token)
    }
}
