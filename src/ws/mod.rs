pub mod actor;
pub mod handler;
pub mod protocol;
pub mod registry;

pub use registry::{ConnectionManager, ConnectionSender};
