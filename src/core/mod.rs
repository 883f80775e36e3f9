pub mod error;
pub mod factory;
pub mod manager;
pub mod memory;
pub mod message;
pub mod observe;
pub mod options;
