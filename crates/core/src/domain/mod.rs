pub mod actor;
pub mod bid;
pub mod request;
pub mod supplier;
