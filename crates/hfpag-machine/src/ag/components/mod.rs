pub mod at_handlers;
pub mod dial_out;
pub mod virtual_call;
pub mod voice_recognition;
