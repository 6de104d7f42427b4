pub mod book_changes;
pub mod diagnostics;
pub mod health;

pub use book_changes::*;
pub use diagnostics::*;
pub use health::*;
