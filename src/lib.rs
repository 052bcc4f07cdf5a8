pub mod robot;
pub use robot::client::*;
pub use robot::config::*;
pub use robot::console::*;
pub use robot::driver::*;
pub use robot::error::*;
pub use robot::logging::*;
pub use robot::state::*;
pub use robot::structs::*;
pub use robot::stub::*;

pub mod aubo;
pub use aubo::client::*;
