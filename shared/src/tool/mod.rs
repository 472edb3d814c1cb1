pub mod error;
pub mod hex_utils;

// Re-export commonly used types
pub use error::*;
pub use hex_utils::HexUtils;
