pub mod request;
pub mod response;

pub use request::DumpQuery;
pub use response::{ErrorResponse, RefreshResponse, StatusResponse, iso8601};
