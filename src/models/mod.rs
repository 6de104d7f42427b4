pub mod book;
pub mod book_changes;
pub mod change;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod messages;
pub mod ready;

pub use book::*;
pub use book_changes::*;
pub use change::*;
pub use diagnostics::*;
pub use error::*;
pub use health::*;
pub use messages::*;
pub use ready::*;
