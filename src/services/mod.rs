pub mod archive;
pub mod spotify;
pub mod store;
