//! Client-side orchestration for a remote media index: batch uploads,
//! text/content search dispatch and the album cache.

pub mod albums;
pub mod config;
pub mod media_file;
pub mod search;
pub mod transport;
pub mod upload;

pub use mediafind_common as common;
