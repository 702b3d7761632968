pub mod http_object_store;

pub use http_object_store::HttpObjectStore;
