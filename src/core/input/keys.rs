use serde::{Deserialize, Serialize};

/// Stable integer key identifier
///
/// Values match the engine key codes that persisted key-sensor bindings were
/// saved with, so they must never be renumbered. Scroll motion uses two
/// synthetic ids outside the physical range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const NONE: KeyCode = KeyCode(0);

    pub const BACKSPACE: KeyCode = KeyCode(8);
    pub const TAB: KeyCode = KeyCode(9);
    pub const CLEAR: KeyCode = KeyCode(12);
    pub const RETURN: KeyCode = KeyCode(13);
    pub const PAUSE: KeyCode = KeyCode(19);
    pub const ESCAPE: KeyCode = KeyCode(27);
    pub const SPACE: KeyCode = KeyCode(32);
    pub const QUOTE: KeyCode = KeyCode(39);
    pub const COMMA: KeyCode = KeyCode(44);
    pub const MINUS: KeyCode = KeyCode(45);
    pub const PERIOD: KeyCode = KeyCode(46);
    pub const SLASH: KeyCode = KeyCode(47);
    pub const ALPHA0: KeyCode = KeyCode(48);
    pub const ALPHA1: KeyCode = KeyCode(49);
    pub const ALPHA2: KeyCode = KeyCode(50);
    pub const ALPHA3: KeyCode = KeyCode(51);
    pub const ALPHA4: KeyCode = KeyCode(52);
    pub const ALPHA5: KeyCode = KeyCode(53);
    pub const ALPHA6: KeyCode = KeyCode(54);
    pub const ALPHA7: KeyCode = KeyCode(55);
    pub const ALPHA8: KeyCode = KeyCode(56);
    pub const ALPHA9: KeyCode = KeyCode(57);
    pub const SEMICOLON: KeyCode = KeyCode(59);
    pub const EQUALS: KeyCode = KeyCode(61);
    pub const LEFT_BRACKET: KeyCode = KeyCode(91);
    pub const BACKSLASH: KeyCode = KeyCode(92);
    pub const RIGHT_BRACKET: KeyCode = KeyCode(93);
    pub const BACK_QUOTE: KeyCode = KeyCode(96);
    pub const A: KeyCode = KeyCode(97);
    pub const B: KeyCode = KeyCode(98);
    pub const C: KeyCode = KeyCode(99);
    pub const D: KeyCode = KeyCode(100);
    pub const E: KeyCode = KeyCode(101);
    pub const F: KeyCode = KeyCode(102);
    pub const G: KeyCode = KeyCode(103);
    pub const H: KeyCode = KeyCode(104);
    pub const I: KeyCode = KeyCode(105);
    pub const J: KeyCode = KeyCode(106);
    pub const K: KeyCode = KeyCode(107);
    pub const L: KeyCode = KeyCode(108);
    pub const M: KeyCode = KeyCode(109);
    pub const N: KeyCode = KeyCode(110);
    pub const O: KeyCode = KeyCode(111);
    pub const P: KeyCode = KeyCode(112);
    pub const Q: KeyCode = KeyCode(113);
    pub const R: KeyCode = KeyCode(114);
    pub const S: KeyCode = KeyCode(115);
    pub const T: KeyCode = KeyCode(116);
    pub const U: KeyCode = KeyCode(117);
    pub const V: KeyCode = KeyCode(118);
    pub const W: KeyCode = KeyCode(119);
    pub const X: KeyCode = KeyCode(120);
    pub const Y: KeyCode = KeyCode(121);
    pub const Z: KeyCode = KeyCode(122);
    pub const DELETE: KeyCode = KeyCode(127);
    pub const KEYPAD0: KeyCode = KeyCode(256);
    pub const KEYPAD1: KeyCode = KeyCode(257);
    pub const KEYPAD2: KeyCode = KeyCode(258);
    pub const KEYPAD3: KeyCode = KeyCode(259);
    pub const KEYPAD4: KeyCode = KeyCode(260);
    pub const KEYPAD5: KeyCode = KeyCode(261);
    pub const KEYPAD6: KeyCode = KeyCode(262);
    pub const KEYPAD7: KeyCode = KeyCode(263);
    pub const KEYPAD8: KeyCode = KeyCode(264);
    pub const KEYPAD9: KeyCode = KeyCode(265);
    pub const KEYPAD_PERIOD: KeyCode = KeyCode(266);
    pub const KEYPAD_DIVIDE: KeyCode = KeyCode(267);
    pub const KEYPAD_MULTIPLY: KeyCode = KeyCode(268);
    pub const KEYPAD_MINUS: KeyCode = KeyCode(269);
    pub const KEYPAD_PLUS: KeyCode = KeyCode(270);
    pub const KEYPAD_ENTER: KeyCode = KeyCode(271);
    pub const KEYPAD_EQUALS: KeyCode = KeyCode(272);
    pub const UP_ARROW: KeyCode = KeyCode(273);
    pub const DOWN_ARROW: KeyCode = KeyCode(274);
    pub const RIGHT_ARROW: KeyCode = KeyCode(275);
    pub const LEFT_ARROW: KeyCode = KeyCode(276);
    pub const INSERT: KeyCode = KeyCode(277);
    pub const HOME: KeyCode = KeyCode(278);
    pub const END: KeyCode = KeyCode(279);
    pub const PAGE_UP: KeyCode = KeyCode(280);
    pub const PAGE_DOWN: KeyCode = KeyCode(281);
    pub const F1: KeyCode = KeyCode(282);
    pub const F2: KeyCode = KeyCode(283);
    pub const F3: KeyCode = KeyCode(284);
    pub const F4: KeyCode = KeyCode(285);
    pub const F5: KeyCode = KeyCode(286);
    pub const F6: KeyCode = KeyCode(287);
    pub const F7: KeyCode = KeyCode(288);
    pub const F8: KeyCode = KeyCode(289);
    pub const F9: KeyCode = KeyCode(290);
    pub const F10: KeyCode = KeyCode(291);
    pub const F11: KeyCode = KeyCode(292);
    pub const F12: KeyCode = KeyCode(293);
    pub const NUMLOCK: KeyCode = KeyCode(300);
    pub const CAPS_LOCK: KeyCode = KeyCode(301);
    pub const SCROLL_LOCK: KeyCode = KeyCode(302);
    pub const RIGHT_SHIFT: KeyCode = KeyCode(303);
    pub const LEFT_SHIFT: KeyCode = KeyCode(304);
    pub const RIGHT_CONTROL: KeyCode = KeyCode(305);
    pub const LEFT_CONTROL: KeyCode = KeyCode(306);
    pub const RIGHT_ALT: KeyCode = KeyCode(307);
    pub const LEFT_ALT: KeyCode = KeyCode(308);
    pub const RIGHT_META: KeyCode = KeyCode(309);
    pub const LEFT_META: KeyCode = KeyCode(310);
    pub const PRINT: KeyCode = KeyCode(316);

    /// Synthetic id for downward wheel motion
    pub const SCROLL_DOWN: KeyCode = KeyCode(99997);
    /// Synthetic id for upward wheel motion
    pub const SCROLL_UP: KeyCode = KeyCode(99999);

    pub fn is_scroll(self) -> bool {
        self == KeyCode::SCROLL_UP || self == KeyCode::SCROLL_DOWN
    }

    pub fn is_modifier(self) -> bool {
        MODIFIER_KEYS.contains(&self)
    }

    /// Whether a key sensor may be bound to this id
    pub fn is_bindable(self) -> bool {
        self == KeyCode::NONE || self.is_scroll() || VALID_INPUT_KEYS.contains(&self)
    }
}

/// Physical keys sampled for key sensors
#[rustfmt::skip]
pub const VALID_INPUT_KEYS: &[KeyCode] = &[
    // Letters
    KeyCode::A, KeyCode::B, KeyCode::C, KeyCode::D, KeyCode::E, KeyCode::F, KeyCode::G,
    KeyCode::H, KeyCode::I, KeyCode::J, KeyCode::K, KeyCode::L, KeyCode::M, KeyCode::N,
    KeyCode::O, KeyCode::P, KeyCode::Q, KeyCode::R, KeyCode::S, KeyCode::T, KeyCode::U,
    KeyCode::V, KeyCode::W, KeyCode::X, KeyCode::Y, KeyCode::Z,
    // Numbers
    KeyCode::ALPHA0, KeyCode::ALPHA1, KeyCode::ALPHA2, KeyCode::ALPHA3, KeyCode::ALPHA4,
    KeyCode::ALPHA5, KeyCode::ALPHA6, KeyCode::ALPHA7, KeyCode::ALPHA8, KeyCode::ALPHA9,
    // Symbols
    KeyCode::BACK_QUOTE, KeyCode::MINUS, KeyCode::EQUALS, KeyCode::LEFT_BRACKET,
    KeyCode::RIGHT_BRACKET, KeyCode::SEMICOLON, KeyCode::QUOTE, KeyCode::COMMA,
    KeyCode::PERIOD, KeyCode::SLASH, KeyCode::BACKSLASH,
    // Keypad
    KeyCode::KEYPAD0, KeyCode::KEYPAD1, KeyCode::KEYPAD2, KeyCode::KEYPAD3,
    KeyCode::KEYPAD4, KeyCode::KEYPAD5, KeyCode::KEYPAD6, KeyCode::KEYPAD7,
    KeyCode::KEYPAD8, KeyCode::KEYPAD9, KeyCode::KEYPAD_DIVIDE, KeyCode::KEYPAD_ENTER,
    KeyCode::KEYPAD_EQUALS, KeyCode::KEYPAD_MINUS, KeyCode::KEYPAD_PLUS,
    KeyCode::KEYPAD_MULTIPLY, KeyCode::KEYPAD_PERIOD,
    // Controls
    KeyCode::TAB, KeyCode::RETURN, KeyCode::ESCAPE, KeyCode::SPACE, KeyCode::DELETE,
    KeyCode::BACKSPACE, KeyCode::INSERT, KeyCode::HOME, KeyCode::END, KeyCode::PAGE_UP,
    KeyCode::PAGE_DOWN, KeyCode::LEFT_ARROW, KeyCode::RIGHT_ARROW, KeyCode::UP_ARROW,
    KeyCode::DOWN_ARROW, KeyCode::CAPS_LOCK, KeyCode::NUMLOCK, KeyCode::SCROLL_LOCK,
    KeyCode::PRINT, KeyCode::PAUSE, KeyCode::CLEAR, KeyCode::LEFT_CONTROL,
    KeyCode::RIGHT_CONTROL, KeyCode::LEFT_SHIFT, KeyCode::RIGHT_SHIFT, KeyCode::LEFT_ALT,
    KeyCode::RIGHT_ALT, KeyCode::LEFT_META, KeyCode::RIGHT_META,
    // Function keys
    KeyCode::F1, KeyCode::F2, KeyCode::F3, KeyCode::F4, KeyCode::F5, KeyCode::F6,
    KeyCode::F7, KeyCode::F8, KeyCode::F9, KeyCode::F10, KeyCode::F11, KeyCode::F12,
];

/// Keys that double as editor shortcut modifiers
pub const MODIFIER_KEYS: &[KeyCode] = &[
    KeyCode::LEFT_CONTROL,
    KeyCode::RIGHT_CONTROL,
    KeyCode::LEFT_SHIFT,
    KeyCode::RIGHT_SHIFT,
    KeyCode::LEFT_ALT,
    KeyCode::RIGHT_ALT,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_valid_input_keys_are_unique() {
        let unique: HashSet<_> = VALID_INPUT_KEYS.iter().collect();
        assert_eq!(unique.len(), VALID_INPUT_KEYS.len());
        assert!(!VALID_INPUT_KEYS.contains(&KeyCode::NONE));
    }

    #[test]
    fn test_modifiers_are_bindable_keys() {
        for key in MODIFIER_KEYS {
            assert!(key.is_modifier());
            assert!(VALID_INPUT_KEYS.contains(key));
        }
        assert!(!KeyCode::A.is_modifier());
    }

    #[test]
    fn test_bindable_ids() {
        assert!(KeyCode::NONE.is_bindable());
        assert!(KeyCode::SCROLL_UP.is_bindable());
        assert!(KeyCode::SCROLL_DOWN.is_bindable());
        assert!(KeyCode::KEYPAD_ENTER.is_bindable());
        assert!(!KeyCode(99998).is_bindable());
        assert!(!KeyCode(1).is_bindable());
    }
}
