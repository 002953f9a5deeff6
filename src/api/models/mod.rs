pub mod common;
pub mod system;
pub mod users;

pub use common::*;
pub use system::*;
pub use users::*;
pub use crate::core::error::ErrorResponse;
