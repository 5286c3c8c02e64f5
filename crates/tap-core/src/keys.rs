//! Android key vocabulary: meta flags, named key codes and the
//! character → key-code lookup used to type literal text.

/// Android `KeyEvent.META_*` flags.
pub mod meta {
    pub const SHIFT_ON: i32 = 0x1;
    pub const ALT_ON: i32 = 0x2;
    pub const CTRL_ON: i32 = 0x1000;
    pub const META_ON: i32 = 0x10000;
    pub const CAPS_LOCK_ON: i32 = 0x100000;
    pub const NUM_LOCK_ON: i32 = 0x200000;
    pub const SCROLL_LOCK_ON: i32 = 0x400000;
}

/// Android `KeyEvent.ACTION_DOWN`.
pub const ACTION_DOWN: i32 = 0;
/// Android `KeyEvent.ACTION_UP`.
pub const ACTION_UP: i32 = 1;

/// What a modifier token does to the active modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierCommand {
    /// Flip the flag.
    Toggle(i32),
    /// Set the flag until the next typed key.
    Once(i32),
}

const MODIFIER_TOKENS: &[(&str, ModifierCommand)] = &[
    ("CTRL", ModifierCommand::Toggle(meta::CTRL_ON)),
    ("ALT", ModifierCommand::Toggle(meta::ALT_ON)),
    ("SHIFT", ModifierCommand::Toggle(meta::SHIFT_ON)),
    ("META", ModifierCommand::Toggle(meta::META_ON)),
    ("CAPSLOCK", ModifierCommand::Toggle(meta::CAPS_LOCK_ON)),
    ("NUMLOCK", ModifierCommand::Toggle(meta::NUM_LOCK_ON)),
    ("SCROLLOCK", ModifierCommand::Toggle(meta::SCROLL_LOCK_ON)),
    ("CTRLONCE", ModifierCommand::Once(meta::CTRL_ON)),
    ("ALTONCE", ModifierCommand::Once(meta::ALT_ON)),
    ("SHIFTONCE", ModifierCommand::Once(meta::SHIFT_ON)),
    ("METAONCE", ModifierCommand::Once(meta::META_ON)),
    ("CAPSLOCKONCE", ModifierCommand::Once(meta::CAPS_LOCK_ON)),
    ("NUMLOCKONCE", ModifierCommand::Once(meta::NUM_LOCK_ON)),
    ("SCROLLOCKONCE", ModifierCommand::Once(meta::SCROLL_LOCK_ON)),
];

pub fn modifier_token(token: &str) -> Option<ModifierCommand> {
    MODIFIER_TOKENS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, cmd)| *cmd)
}

/// Android key codes used below.
pub mod code {
    pub const HOME: i32 = 3;
    pub const BACK: i32 = 4;
    pub const KEY_0: i32 = 7;
    pub const STAR: i32 = 17;
    pub const POUND: i32 = 18;
    pub const DPAD_UP: i32 = 19;
    pub const DPAD_DOWN: i32 = 20;
    pub const DPAD_LEFT: i32 = 21;
    pub const DPAD_RIGHT: i32 = 22;
    pub const DPAD_CENTER: i32 = 23;
    pub const A: i32 = 29;
    pub const COMMA: i32 = 55;
    pub const PERIOD: i32 = 56;
    pub const TAB: i32 = 61;
    pub const SPACE: i32 = 62;
    pub const ENTER: i32 = 66;
    pub const DEL: i32 = 67;
    pub const GRAVE: i32 = 68;
    pub const MINUS: i32 = 69;
    pub const EQUALS: i32 = 70;
    pub const LEFT_BRACKET: i32 = 71;
    pub const RIGHT_BRACKET: i32 = 72;
    pub const BACKSLASH: i32 = 73;
    pub const SEMICOLON: i32 = 74;
    pub const APOSTROPHE: i32 = 75;
    pub const SLASH: i32 = 76;
    pub const AT: i32 = 77;
    pub const PLUS: i32 = 81;
    pub const PAGE_UP: i32 = 92;
    pub const PAGE_DOWN: i32 = 93;
    pub const ESCAPE: i32 = 111;
    pub const FORWARD_DEL: i32 = 112;
    pub const MOVE_HOME: i32 = 122;
    pub const MOVE_END: i32 = 123;
    pub const F1: i32 = 131;
}

/// Tokens that press a single non-printing key.
const NAMED_KEYS: &[(&str, i32)] = &[
    // Friendlier names for the two delete keys.
    ("BACKSPACE", code::DEL),
    ("DELETE", code::FORWARD_DEL),
    ("APP_SWITCH", 187),
    ("ASSIST", 219),
    ("BACK", code::BACK),
    ("BREAK", 121),
    ("BRIGHTNESS_DOWN", 220),
    ("BRIGHTNESS_UP", 221),
    ("CALCULATOR", 210),
    ("CALL", 5),
    ("CAMERA", 27),
    ("CAPTIONS", 175),
    ("CHANNEL_DOWN", 167),
    ("CHANNEL_UP", 166),
    ("CLEAR", 28),
    ("CONTACTS", 207),
    ("COPY", 278),
    ("CUT", 277),
    ("DEL", code::DEL),
    ("DPAD_CENTER", code::DPAD_CENTER),
    ("DPAD_DOWN", code::DPAD_DOWN),
    ("DPAD_DOWN_LEFT", 269),
    ("DPAD_DOWN_RIGHT", 271),
    ("DPAD_LEFT", code::DPAD_LEFT),
    ("DPAD_RIGHT", code::DPAD_RIGHT),
    ("DPAD_UP", code::DPAD_UP),
    ("DPAD_UP_LEFT", 268),
    ("DPAD_UP_RIGHT", 270),
    ("ENDCALL", 6),
    ("ENTER", code::ENTER),
    ("ENVELOPE", 65),
    ("ESCAPE", code::ESCAPE),
    ("EXPLORER", 64),
    ("F1", code::F1),
    ("F2", code::F1 + 1),
    ("F3", code::F1 + 2),
    ("F4", code::F1 + 3),
    ("F5", code::F1 + 4),
    ("F6", code::F1 + 5),
    ("F7", code::F1 + 6),
    ("F8", code::F1 + 7),
    ("F9", code::F1 + 8),
    ("F10", code::F1 + 9),
    ("F11", code::F1 + 10),
    ("F12", code::F1 + 11),
    ("FOCUS", 80),
    ("FORWARD", 125),
    ("FORWARD_DEL", code::FORWARD_DEL),
    ("FUNCTION", 119),
    ("GUIDE", 172),
    ("HELP", 259),
    ("HOME", code::HOME),
    ("INFO", 165),
    ("INSERT", 124),
    ("LANGUAGE_SWITCH", 204),
    ("LAST_CHANNEL", 229),
    ("MEDIA_FAST_FORWARD", 90),
    ("MEDIA_NEXT", 87),
    ("MEDIA_PAUSE", 127),
    ("MEDIA_PLAY", 126),
    ("MEDIA_PLAY_PAUSE", 85),
    ("MEDIA_PREVIOUS", 88),
    ("MEDIA_RECORD", 130),
    ("MEDIA_REWIND", 89),
    ("MEDIA_SKIP_BACKWARD", 273),
    ("MEDIA_SKIP_FORWARD", 272),
    ("MEDIA_STEP_BACKWARD", 275),
    ("MEDIA_STEP_FORWARD", 274),
    ("MEDIA_STOP", 86),
    ("MEDIA_TOP_MENU", 226),
    ("MENU", 82),
    ("MOVE_END", code::MOVE_END),
    ("MOVE_HOME", code::MOVE_HOME),
    ("MUTE", 91),
    ("NAVIGATE_IN", 262),
    ("NAVIGATE_NEXT", 261),
    ("NAVIGATE_OUT", 263),
    ("NAVIGATE_PREVIOUS", 260),
    ("NOTIFICATION", 83),
    ("PAGE_DOWN", code::PAGE_DOWN),
    ("PAGE_UP", code::PAGE_UP),
    ("PAIRING", 225),
    ("PASTE", 279),
    ("POWER", 26),
    ("PROG_BLUE", 186),
    ("PROG_GREEN", 184),
    ("PROG_RED", 183),
    ("PROG_YELLOW", 185),
    ("SCROLL_LOCK", 116),
    ("SEARCH", 84),
    ("SETTINGS", 176),
    ("SLEEP", 223),
    ("STEM_1", 265),
    ("STEM_2", 266),
    ("STEM_3", 267),
    ("STEM_PRIMARY", 264),
    ("SYSRQ", 120),
    ("SYSTEM_NAVIGATION_DOWN", 281),
    ("SYSTEM_NAVIGATION_LEFT", 282),
    ("SYSTEM_NAVIGATION_RIGHT", 283),
    ("SYSTEM_NAVIGATION_UP", 280),
    ("TAB", code::TAB),
    ("VOICE_ASSIST", 231),
    ("VOLUME_DOWN", 25),
    ("VOLUME_MUTE", 164),
    ("VOLUME_UP", 24),
    ("WAKEUP", 224),
    ("WINDOW", 171),
    ("ZOOM_IN", 168),
    ("ZOOM_OUT", 169),
    ("BUTTON_1", 188),
    ("BUTTON_2", 189),
    ("BUTTON_3", 190),
    ("BUTTON_4", 191),
    ("BUTTON_5", 192),
    ("BUTTON_6", 193),
    ("BUTTON_7", 194),
    ("BUTTON_8", 195),
    ("BUTTON_9", 196),
    ("BUTTON_10", 197),
    ("BUTTON_11", 198),
    ("BUTTON_12", 199),
    ("BUTTON_13", 200),
    ("BUTTON_14", 201),
    ("BUTTON_15", 202),
    ("BUTTON_16", 203),
    ("BUTTON_A", 96),
    ("BUTTON_B", 97),
    ("BUTTON_C", 98),
    ("BUTTON_L1", 102),
    ("BUTTON_L2", 104),
    ("BUTTON_MODE", 110),
    ("BUTTON_R1", 103),
    ("BUTTON_R2", 105),
    ("BUTTON_SELECT", 109),
    ("BUTTON_START", 108),
    ("BUTTON_THUMBL", 106),
    ("BUTTON_THUMBR", 107),
    ("BUTTON_X", 99),
    ("BUTTON_Y", 100),
    ("BUTTON_Z", 101),
];

/// Key code for a named-key token such as `"ENTER"` or `"F5"`.
pub fn named_key(token: &str) -> Option<i32> {
    NAMED_KEYS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, code)| *code)
}

/// Every named-key token, in table order.
pub fn named_keys() -> impl Iterator<Item = &'static str> {
    NAMED_KEYS.iter().map(|(name, _)| *name)
}

/// One key press needed to type a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub key_code: i32,
    /// Meta flags the character itself needs, e.g. shift for `'A'`.
    pub meta_state: i32,
}

impl KeyStroke {
    pub const fn plain(key_code: i32) -> Self {
        Self {
            key_code,
            meta_state: 0,
        }
    }

    pub const fn shifted(key_code: i32) -> Self {
        Self {
            key_code,
            meta_state: meta::SHIFT_ON,
        }
    }
}

/// Character → key strokes, standing in for Android's `KeyCharacterMap`.
pub trait CharacterMap: Send + Sync {
    /// Strokes typing `c`, or `None` if the layout cannot produce it.
    fn strokes(&self, c: char) -> Option<Vec<KeyStroke>>;
}

/// US layout for printable ASCII plus tab and newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiCharacterMap;

impl CharacterMap for AsciiCharacterMap {
    fn strokes(&self, c: char) -> Option<Vec<KeyStroke>> {
        ascii_stroke(c).map(|s| vec![s])
    }
}

fn ascii_stroke(c: char) -> Option<KeyStroke> {
    use code::*;

    let stroke = match c {
        'a'..='z' => KeyStroke::plain(A + (c as i32 - 'a' as i32)),
        'A'..='Z' => KeyStroke::shifted(A + (c as i32 - 'A' as i32)),
        '0'..='9' => KeyStroke::plain(KEY_0 + (c as i32 - '0' as i32)),
        ' ' => KeyStroke::plain(SPACE),
        '\t' => KeyStroke::plain(TAB),
        '\n' => KeyStroke::plain(ENTER),
        ',' => KeyStroke::plain(COMMA),
        '.' => KeyStroke::plain(PERIOD),
        '`' => KeyStroke::plain(GRAVE),
        '-' => KeyStroke::plain(MINUS),
        '=' => KeyStroke::plain(EQUALS),
        '[' => KeyStroke::plain(LEFT_BRACKET),
        ']' => KeyStroke::plain(RIGHT_BRACKET),
        '\\' => KeyStroke::plain(BACKSLASH),
        ';' => KeyStroke::plain(SEMICOLON),
        '\'' => KeyStroke::plain(APOSTROPHE),
        '/' => KeyStroke::plain(SLASH),
        '@' => KeyStroke::plain(AT),
        '+' => KeyStroke::plain(PLUS),
        '*' => KeyStroke::plain(STAR),
        '#' => KeyStroke::plain(POUND),
        '!' => KeyStroke::shifted(KEY_0 + 1),
        '$' => KeyStroke::shifted(KEY_0 + 4),
        '%' => KeyStroke::shifted(KEY_0 + 5),
        '^' => KeyStroke::shifted(KEY_0 + 6),
        '&' => KeyStroke::shifted(KEY_0 + 7),
        '(' => KeyStroke::shifted(KEY_0 + 9),
        ')' => KeyStroke::shifted(KEY_0),
        '_' => KeyStroke::shifted(MINUS),
        '~' => KeyStroke::shifted(GRAVE),
        '{' => KeyStroke::shifted(LEFT_BRACKET),
        '}' => KeyStroke::shifted(RIGHT_BRACKET),
        '|' => KeyStroke::shifted(BACKSLASH),
        ':' => KeyStroke::shifted(SEMICOLON),
        '"' => KeyStroke::shifted(APOSTROPHE),
        '<' => KeyStroke::shifted(COMMA),
        '>' => KeyStroke::shifted(PERIOD),
        '?' => KeyStroke::shifted(SLASH),
        _ => return None,
    };
    Some(stroke)
}
