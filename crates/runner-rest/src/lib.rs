mod request;
mod rest_runner;

pub use request::{RestError, RestRequest};
pub use rest_runner::RestRunner;
