mod client;
mod error;
pub mod manage;
mod not_found;
pub mod retrieve;
pub mod upload;

pub use not_found::not_found_handler;
