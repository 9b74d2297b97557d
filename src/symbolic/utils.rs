// the collection of utility functions for bracket parsing and proceeding

/// Checks that round brackets are balanced and never close before they open.
pub fn brackets_are_balanced(s: &str) -> bool {
    let mut depth: i64 = 0;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Returns the position of the bracket closing the one opened at `open_pos`.
pub fn find_pair_to_this_bracket(input: &str, open_pos: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    if bytes.get(open_pos) != Some(&b'(') {
        return None;
    }
    let mut depth = 0;
    for (i, &c) in bytes.iter().enumerate().skip(open_pos) {
        match c {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Positions (byte offsets) of `target_char` that are not inside any pair of brackets.
pub fn find_char_positions_outside_brackets(input: &str, target_char: char) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut depth = 0;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 && c == target_char => positions.push(i),
            _ => {}
        }
    }
    positions
}

/// Rightmost occurrence of any of `operators` outside brackets, accepted by `accept`.
pub fn find_rightmost_operator_outside_brackets<F>(
    input: &str,
    operators: &[char],
    accept: F,
) -> Option<(usize, char)>
where
    F: Fn(&str, usize) -> bool,
{
    let mut depth = 0;
    let mut last_op = None;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 && operators.contains(&c) && accept(input, i) => {
                last_op = Some((i, c));
            }
            _ => {}
        }
    }
    last_op
}

/// `true` for names like `x`, `T1`, `T2Ahx`, `_tmp`.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
