pub mod food_scan;
pub mod health;
pub mod nutrition;
pub mod server;
