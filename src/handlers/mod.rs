pub mod account;
pub mod admin;
pub mod magic_box;

pub use account::account_config;
pub use admin::admin_config;
pub use magic_box::magic_box_config;
