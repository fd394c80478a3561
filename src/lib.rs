pub mod clean;
pub mod config;
pub mod constants;
pub mod driver;
pub mod error;
pub mod logging;
pub mod records;
pub mod router;
pub mod store;
pub mod validate;
pub mod warehouse;
