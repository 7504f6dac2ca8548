#[derive(Debug, PartialEq, Eq)]
pub enum AtParseErr {
    /// Command string was empty after preprocessing
    Empty,
    /// SET-type command without an '=' separator
    MissingEquals,
    /// A GET/query form was supplied where only SET is accepted
    QueryNotAccepted,
    /// Command prefix is not in the recognised vendor table
    UnknownCommand { command: String },
    /// An argument failed integer conversion where one was required
    InvalidInteger { field: &'static str },
}
