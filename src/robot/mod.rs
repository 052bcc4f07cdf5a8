pub mod client;
pub mod config;
pub mod console;
pub mod driver;
pub mod error;
pub mod logging;
pub mod state;
pub mod structs;
pub mod stub;
