pub mod calculated;
pub mod handler;
pub mod patch;

pub use calculated::ResourceUrls;
pub use handler::{ResourceHandler, Representation};
