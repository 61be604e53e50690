#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub keycode: u32,
    pub shift: bool,
}

impl KeyStroke {
    const fn plain(keycode: u32) -> Self {
        Self {
            keycode,
            shift: false,
        }
    }

    const fn shifted(keycode: u32) -> Self {
        Self {
            keycode,
            shift: true,
        }
    }
}

// Linux evdev keycodes (see linux/input-event-codes.h)
pub const KEY_1: u32 = 2;
pub const KEY_2: u32 = 3;
pub const KEY_3: u32 = 4;
pub const KEY_4: u32 = 5;
pub const KEY_5: u32 = 6;
pub const KEY_6: u32 = 7;
pub const KEY_7: u32 = 8;
pub const KEY_8: u32 = 9;
pub const KEY_9: u32 = 10;
pub const KEY_0: u32 = 11;

pub const KEY_MINUS: u32 = 12;
pub const KEY_EQUAL: u32 = 13;

pub const KEY_Q: u32 = 16;
pub const KEY_W: u32 = 17;
pub const KEY_E: u32 = 18;
pub const KEY_R: u32 = 19;
pub const KEY_T: u32 = 20;
pub const KEY_Y: u32 = 21;
pub const KEY_U: u32 = 22;
pub const KEY_I: u32 = 23;
pub const KEY_O: u32 = 24;
pub const KEY_P: u32 = 25;

pub const KEY_LEFTBRACE: u32 = 26;
pub const KEY_RIGHTBRACE: u32 = 27;
pub const KEY_ENTER: u32 = 28;

pub const KEY_LEFTCTRL: u32 = 29;

pub const KEY_A: u32 = 30;
pub const KEY_S: u32 = 31;
pub const KEY_D: u32 = 32;
pub const KEY_F: u32 = 33;
pub const KEY_G: u32 = 34;
pub const KEY_H: u32 = 35;
pub const KEY_J: u32 = 36;
pub const KEY_K: u32 = 37;
pub const KEY_L: u32 = 38;

pub const KEY_SEMICOLON: u32 = 39;
pub const KEY_APOSTROPHE: u32 = 40;
pub const KEY_GRAVE: u32 = 41;

pub const KEY_LEFTSHIFT: u32 = 42;

pub const KEY_BACKSLASH: u32 = 43;

pub const KEY_Z: u32 = 44;
pub const KEY_X: u32 = 45;
pub const KEY_C: u32 = 46;
pub const KEY_V: u32 = 47;
pub const KEY_B: u32 = 48;
pub const KEY_N: u32 = 49;
pub const KEY_M: u32 = 50;

pub const KEY_COMMA: u32 = 51;
pub const KEY_DOT: u32 = 52;
pub const KEY_SLASH: u32 = 53;

pub const KEY_RIGHTSHIFT: u32 = 54;

pub const KEY_LEFTALT: u32 = 56;
pub const KEY_SPACE: u32 = 57;

pub const KEY_RIGHTCTRL: u32 = 97;
pub const KEY_RIGHTALT: u32 = 100;

const LETTER_KEYCODES: [u32; 26] = [
    KEY_A, KEY_B, KEY_C, KEY_D, KEY_E, KEY_F, KEY_G, KEY_H, KEY_I, KEY_J, KEY_K, KEY_L, KEY_M,
    KEY_N, KEY_O, KEY_P, KEY_Q, KEY_R, KEY_S, KEY_T, KEY_U, KEY_V, KEY_W, KEY_X, KEY_Y, KEY_Z,
];

// (unshifted, shifted, keycode) for every key in the number row and the
// punctuation cluster of a US layout.
const SYMBOL_KEYS: [(char, char, u32); 21] = [
    ('1', '!', KEY_1),
    ('2', '@', KEY_2),
    ('3', '#', KEY_3),
    ('4', '$', KEY_4),
    ('5', '%', KEY_5),
    ('6', '^', KEY_6),
    ('7', '&', KEY_7),
    ('8', '*', KEY_8),
    ('9', '(', KEY_9),
    ('0', ')', KEY_0),
    ('-', '_', KEY_MINUS),
    ('=', '+', KEY_EQUAL),
    ('[', '{', KEY_LEFTBRACE),
    (']', '}', KEY_RIGHTBRACE),
    ('\\', '|', KEY_BACKSLASH),
    (';', ':', KEY_SEMICOLON),
    ('\'', '"', KEY_APOSTROPHE),
    ('`', '~', KEY_GRAVE),
    (',', '<', KEY_COMMA),
    ('.', '>', KEY_DOT),
    ('/', '?', KEY_SLASH),
];

/// Map a character from the input text to the character actually typed.
///
/// Returns `None` for characters that have no key on a US layout.
pub fn typed_char_for_output_char(c: char) -> Option<char> {
    match c {
        '\n' => Some('\n'),
        // Tab and CR are not typed; input is normalized to LF before a session starts.
        '\t' | '\r' => None,

        // Editors with smart-quote substitution turn these back into curly quotes.
        '’' | '‘' => Some('\''),
        '”' | '“' => Some('"'),

        c if c.is_ascii_graphic() || c == ' ' => Some(c),
        _ => None,
    }
}

pub fn keystroke_for_output_char(c: char) -> Option<KeyStroke> {
    typed_char_for_output_char(c).and_then(char_to_keystroke)
}

pub fn find_first_unsupported_char(text: &str) -> Option<(usize, char)> {
    text.char_indices()
        .find(|&(_idx, c)| keystroke_for_output_char(c).is_none())
}

pub fn char_to_keystroke(c: char) -> Option<KeyStroke> {
    match c {
        'a'..='z' => Some(KeyStroke::plain(LETTER_KEYCODES[(c as u8 - b'a') as usize])),
        'A'..='Z' => Some(KeyStroke::shifted(LETTER_KEYCODES[(c as u8 - b'A') as usize])),
        ' ' => Some(KeyStroke::plain(KEY_SPACE)),
        '\n' => Some(KeyStroke::plain(KEY_ENTER)),
        _ => SYMBOL_KEYS.iter().find_map(|&(plain, shifted, keycode)| {
            if c == plain {
                Some(KeyStroke::plain(keycode))
            } else if c == shifted {
                Some(KeyStroke::shifted(keycode))
            } else {
                None
            }
        }),
    }
}

/// Reverse lookup used by simulated surfaces: the character a keycode produces.
pub fn char_for_keystroke(keycode: u32, shift: bool) -> Option<char> {
    if let Some(idx) = LETTER_KEYCODES.iter().position(|&k| k == keycode) {
        let c = (b'a' + idx as u8) as char;
        return Some(if shift { c.to_ascii_uppercase() } else { c });
    }

    match keycode {
        KEY_SPACE => Some(' '),
        KEY_ENTER => Some('\n'),
        _ => SYMBOL_KEYS
            .iter()
            .find(|&&(_, _, k)| k == keycode)
            .map(|&(plain, shifted, _)| if shift { shifted } else { plain }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_carry_shift_only_when_upper_case() {
        assert_eq!(char_to_keystroke('h'), Some(KeyStroke::plain(KEY_H)));
        assert_eq!(char_to_keystroke('H'), Some(KeyStroke::shifted(KEY_H)));
        assert_eq!(char_to_keystroke('z'), Some(KeyStroke::plain(KEY_Z)));
    }

    #[test]
    fn shifted_symbols_share_the_unshifted_key() {
        assert_eq!(char_to_keystroke('!'), Some(KeyStroke::shifted(KEY_1)));
        assert_eq!(char_to_keystroke('1'), Some(KeyStroke::plain(KEY_1)));
        assert_eq!(char_to_keystroke('?'), Some(KeyStroke::shifted(KEY_SLASH)));
        assert_eq!(char_to_keystroke('"'), Some(KeyStroke::shifted(KEY_APOSTROPHE)));
    }

    #[test]
    fn every_typable_ascii_char_round_trips_through_the_keymap() {
        for b in 32u8..=126u8 {
            let c = b as char;
            let stroke = char_to_keystroke(c).expect("printable ASCII must be typable");
            assert_eq!(char_for_keystroke(stroke.keycode, stroke.shift), Some(c));
        }
    }

    #[test]
    fn smart_quotes_type_as_ascii() {
        assert_eq!(
            keystroke_for_output_char('’'),
            Some(KeyStroke::plain(KEY_APOSTROPHE))
        );
        assert_eq!(
            keystroke_for_output_char('“'),
            Some(KeyStroke::shifted(KEY_APOSTROPHE))
        );
    }

    #[test]
    fn reports_first_untypable_char() {
        assert_eq!(find_first_unsupported_char("Hi\nBye"), None);
        assert_eq!(find_first_unsupported_char("café au lait"), Some((3, 'é')));
        assert_eq!(find_first_unsupported_char("a\tb"), Some((1, '\t')));
    }
}
