//! AT command model for the HFP Audio Gateway
//!
//! Parsing helpers for the AT dialog the AG holds with a handsfree peer:
//! argument splitting, unknown-command preprocessing, command type
//! classification, `+BIND` indicator lists and vendor-specific commands.

pub mod args;
pub mod bind;
pub mod command_type;
pub mod number;
pub mod unknown;
pub mod vendor;

pub use args::{parse_args, AtArg};
pub use bind::{parse_bind_ids, HfIndicator};
pub use command_type::AtCommandType;
pub use number::{pre_dial_transform, toa_from_number};
pub use unknown::preprocess_unknown_at;
pub use vendor::{lookup_company_id, parse_vendor_set_command, VendorAtCommand, XAPL_REPLY};
