use chip::definitions::keyboard;

/// The host keys of the keypad, the position in the table is the keypad key.
///
/// ```text
/// 1 2 3 4        1 2 3 C
/// q w e r   =>   4 5 6 D
/// a s d f        7 8 9 E
/// z x c v        A 0 B F
/// ```
pub const KEYMAP: [char; keyboard::SIZE] = [
    'x', // 0
    '1', // 1
    '2', // 2
    '3', // 3
    'q', // 4
    'w', // 5
    'e', // 6
    'a', // 7
    's', // 8
    'd', // 9
    'z', // A
    'c', // B
    '4', // C
    'r', // D
    'f', // E
    'v', // F
];

/// Returns the keypad key for the host key, ignoring the case.
pub fn keymap(key: char) -> Option<u8> {
    let key = key.to_ascii_lowercase();
    KEYMAP.iter().position(|&k| k == key).map(|index| index as u8)
}
