mod dtimestamp;
mod file_id;

pub use dtimestamp::DTimestamp;
pub use file_id::FileId;
