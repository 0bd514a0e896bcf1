pub mod notify;
pub mod select;
pub mod session;
pub mod store;
pub mod types;
