// Library interface for newsprint modules
// This allows tests and the helper binaries to import modules

pub mod store;
pub mod digest;
pub mod render;
pub mod pdf;
pub mod export;
