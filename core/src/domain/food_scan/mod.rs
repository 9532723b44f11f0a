pub mod catalog;
pub mod composite;
pub mod entities;
pub mod normalizer;
pub mod parser;
pub mod ports;
pub mod prompts;
pub mod resolution;
pub mod schema;
pub mod services;
pub mod validator;
pub mod value_objects;

#[cfg(test)]
pub(crate) mod test_support;

pub use entities::*;
pub use ports::*;
pub use value_objects::*;
