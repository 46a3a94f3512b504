pub mod magic_box_client;

pub use magic_box_client::*;
