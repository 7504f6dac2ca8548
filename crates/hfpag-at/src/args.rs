use core::fmt;

/// One argument of an AT SET command. Arguments that parse as decimal
/// integers are carried as integers, everything else as strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtArg {
    Int(i32),
    Str(String),
}

impl AtArg {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            AtArg::Int(v) => Some(*v),
            AtArg::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AtArg::Int(_) => None,
            AtArg::Str(s) => Some(s),
        }
    }
}

impl fmt::Display for AtArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtArg::Int(v) => write!(f, "{}", v),
            AtArg::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Splits the argument part of an AT SET command on commas, skipping commas
/// that fall inside double-quoted spans, and converts each piece.
pub fn parse_args(input: &str) -> Vec<AtArg> {
    split_quoted(input)
        .into_iter()
        .map(|piece| {
            let trimmed = piece.trim();
            match trimmed.parse::<i32>() {
                Ok(v) => AtArg::Int(v),
                Err(_) => AtArg::Str(trimmed.to_string()),
            }
        })
        .collect()
}

/// Splits `input` on `,` while treating double-quoted spans as opaque.
/// An unterminated quote runs to the end of the input.
pub fn split_quoted(input: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                pieces.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() || !pieces.is_empty() || !input.is_empty() {
        pieces.push(current);
    }
    pieces
}
