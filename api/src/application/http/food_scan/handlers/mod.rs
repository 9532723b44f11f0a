pub mod get_quota;
pub mod scan_food;
