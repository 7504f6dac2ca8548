/// Type-of-address octet for a dial string: 145 (international) when the
/// number carries a leading '+', 129 otherwise.
pub fn toa_from_number(number: &str) -> i32 {
    if number.starts_with('+') { 145 } else { 129 }
}

/// Canonicalises a dial string before it is handed to telephony: separator
/// characters are dropped and the SIM pause/wait letters are mapped to the
/// ',' / ';' dial modifiers.
pub fn pre_dial_transform(number: &str) -> String {
    let mut out = String::with_capacity(number.len());
    for c in number.chars() {
        match c {
            ' ' | '-' | '(' | ')' | '.' | '/' => {}
            'p' | 'P' => out.push(','),
            'w' | 'W' => out.push(';'),
            _ => out.push(c),
        }
    }
    out
}
