// HTTP routes
pub mod health;
pub mod refresh;

pub use health::*;
pub use refresh::*;
