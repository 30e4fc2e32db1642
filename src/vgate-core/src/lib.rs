pub mod core;
pub mod models;

pub use self::core::*;
pub use self::models::*;
