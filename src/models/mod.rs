pub mod job_status;
pub mod ticket;
pub mod user;

pub use job_status::*;
pub use ticket::*;
pub use user::*;
