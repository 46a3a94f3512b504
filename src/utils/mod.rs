pub mod code_generator;
pub mod jwt;
pub mod weighted;

pub use code_generator::generate_coupon_code;
pub use jwt::*;
pub use weighted::{Weighted, pick_weighted, probability_percentages};
