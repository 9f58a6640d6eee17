pub mod builder;
pub mod handle;
pub mod model;
pub mod poller;

pub use builder::FileBuilder;
pub use handle::{Error, FileHandle};
pub use model::{File, FileState, FileStatus, ListFilesResponse};
pub use poller::{wait_until_active, Error as PollError, PollPolicy, StatusLookup};
