/// Key mapping from the left hand side of a standard english keyboard
/// to Chip8 key codes, laid out like the original 4x4 hex keypad.
static KEY_MAP: [(&str, u8); 16] = [
    ("1", 0x1),
    ("2", 0x2),
    ("3", 0x3),
    ("4", 0xC),
    ("q", 0x4),
    ("w", 0x5),
    ("e", 0x6),
    ("r", 0xD),
    ("a", 0x7),
    ("s", 0x8),
    ("d", 0x9),
    ("f", 0xE),
    ("z", 0xA),
    ("x", 0x0),
    ("c", 0xB),
    ("v", 0xF),
];

/// Look up the Chip8 key code for a key name. Names are case insensitive,
/// unknown names map to `None`.
pub fn key_code(name: &str) -> Option<u8> {
    KEY_MAP
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|&(_, code)| code)
}
