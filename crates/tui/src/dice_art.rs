use std::collections::HashMap;

use once_cell::sync::Lazy;

const FACE_SIZE: usize = 5;
const PIP_CHAR: char = '●';
const BLANK_CHAR: char = ' ';

type Face = [&'static str; FACE_SIZE];

static FACES: Lazy<HashMap<u8, Face>> = Lazy::new(|| {
    HashMap::from([
        (1, ["     ", "     ", "  1  ", "     ", "     "]),
        (2, ["1    ", "     ", "     ", "     ", "    1"]),
        (3, ["1    ", "     ", "  1  ", "     ", "    1"]),
        (4, ["1   1", "     ", "     ", "     ", "1   1"]),
        (5, ["1   1", "     ", "  1  ", "     ", "1   1"]),
        (6, ["1   1", "     ", "1   1", "     ", "1   1"]),
    ])
});

/// Boxed die face for `value`; empty when the value is not a die face.
pub fn render(value: u8) -> Vec<String> {
    let Some(face) = FACES.get(&value) else {
        return Vec::new();
    };
    let inner_width = FACE_SIZE * 2 + 1;
    let mut lines = Vec::with_capacity(FACE_SIZE + 2);
    lines.push(format!("┌{}┐", "─".repeat(inner_width)));
    for row in face {
        let cells: Vec<String> = row
            .chars()
            .map(|symbol| if symbol == '1' { PIP_CHAR } else { BLANK_CHAR })
            .map(String::from)
            .collect();
        lines.push(format!("│ {} │", cells.join(" ")));
    }
    lines.push(format!("└{}┘", "─".repeat(inner_width)));
    lines
}
