pub mod common;
pub mod food_scan;
pub mod quota;
