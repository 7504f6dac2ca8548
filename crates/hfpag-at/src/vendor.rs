use hfpag_core::AtParseErr;

use crate::args::{parse_args, AtArg};

/// Bluetooth SIG company identifiers for the vendor AT commands the AG
/// recognises.
pub mod company_id {
    pub const PLANTRONICS: i32 = 85;
    pub const APPLE: i32 = 76;
    pub const GOOGLE: i32 = 224;
}

/// Reply sent for a well-formed +XAPL handshake: pretend to be an iPhone
/// with the battery-reporting feature bit (2) set.
pub const XAPL_REPLY: &str = "+XAPL=iPhone,2";

/// Maps a vendor AT command name to its company id, if recognised.
pub fn lookup_company_id(command: &str) -> Option<i32> {
    match command {
        "+XEVENT" => Some(company_id::PLANTRONICS),
        "+ANDROID" => Some(company_id::GOOGLE),
        "+XAPL" => Some(company_id::APPLE),
        "+IPHONEACCEV" => Some(company_id::APPLE),
        _ => None,
    }
}

/// A recognised vendor-specific SET command, ready for broadcasting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorAtCommand {
    pub command: String,
    pub company_id: i32,
    pub args: Vec<AtArg>,
}

/// Parses a preprocessed unknown-AT string as a vendor-specific SET
/// command. Only the SET form is accepted; query forms are rejected.
pub fn parse_vendor_set_command(at_string: &str) -> Result<VendorAtCommand, AtParseErr> {
    if at_string.is_empty() {
        return Err(AtParseErr::Empty);
    }
    let equal_idx = at_string.find('=').ok_or(AtParseErr::MissingEquals)?;
    let command = &at_string[..equal_idx];
    let company_id = lookup_company_id(command).ok_or_else(|| AtParseErr::UnknownCommand {
        command: command.to_string(),
    })?;
    let arg = &at_string[equal_idx + 1..];
    if arg.starts_with('?') {
        return Err(AtParseErr::QueryNotAccepted);
    }
    Ok(VendorAtCommand {
        command: command.to_string(),
        company_id,
        args: parse_args(arg),
    })
}
