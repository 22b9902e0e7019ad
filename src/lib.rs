pub mod client;
pub mod error;
pub mod models;


pub use client::ZendeskClient;
pub use error::{Result, ZendeskError};
pub use models::*;
