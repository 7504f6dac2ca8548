pub mod components;
pub mod peer_machine;
