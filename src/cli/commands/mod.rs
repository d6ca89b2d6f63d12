#[cfg(feature = "audit-log")]
pub mod audit_cmd;
pub mod completions;
pub mod destroy;
pub mod export;
pub mod generate;
pub mod import_cmd;
pub mod info;
pub mod list;
pub mod public_key;
pub mod sha256;
pub mod version;
