mod entry;
mod render;
mod store;

pub use entry::{LeafRecord, SubEntry};
pub use render::Renderer;
pub use store::LeafStore;

pub(crate) use entry::EntryPattern;
