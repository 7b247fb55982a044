//! Systems: logic that queries and rewrites pools in the world

mod extract;
mod reallocate;
mod restore;
mod schedule;
mod stages;

pub use extract::*;
pub use reallocate::*;
pub use restore::*;
pub use schedule::*;
pub use stages::*;
