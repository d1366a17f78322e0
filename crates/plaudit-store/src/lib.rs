pub mod error;
pub mod file;
pub mod log;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use file::FileStore;
pub use log::CommentLog;
pub use memory::MemoryStore;
pub use store::{Appended, CommentStore};
