/// Shared re-export of minicbor lib across all Kaspeak crates
pub use minicbor;

/// Dynamic CBOR value tree used as the plain-object form of typed messages
pub mod plain;

/// Hex-friendly byte helpers
pub mod utils;
