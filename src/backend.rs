pub mod config;
pub mod source;
pub mod speed;
pub mod store;
pub mod types;

pub use source::{BskySource, TimelineSource};
pub use store::Store;
