pub mod object_store;
pub mod upload;

pub use object_store::ObjectStore;
pub use upload::{content_type_for, object_key_for, UploadResult, UploadSummary};
