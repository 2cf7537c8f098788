mod file;
mod memory;
mod types;

pub use file::FileStore;
pub use memory::InMemoryStore;
pub use types::DurableStore;
