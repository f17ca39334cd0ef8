//! Process-level setup
//!
//! The bridge keeps no global state beyond the logger.

use log::info;
use std::ffi::c_uint;
use std::io::Write;

/// Install the `env_logger` backend, configured through `RUST_LOG`; repeat calls are harmless
#[unsafe(no_mangle)]
pub extern "C" fn irlens_initialize() {
    if env_logger::try_init().is_ok() {
        info!("irlens {} initialized", env!("CARGO_PKG_VERSION"));
    }
}

/// Flush any buffered log output
#[unsafe(no_mangle)]
pub extern "C" fn irlens_shutdown() {
    log::logger().flush();
    let _ = std::io::stderr().flush();
}

/// Packed crate version: `major << 16 | minor << 8 | patch`
#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_version_info() -> c_uint {
    let part = |s: &str| s.parse::<c_uint>().unwrap_or(0);
    let major = part(env!("CARGO_PKG_VERSION_MAJOR"));
    let minor = part(env!("CARGO_PKG_VERSION_MINOR"));
    let patch = part(env!("CARGO_PKG_VERSION_PATCH"));
    (major << 16) | (minor << 8) | patch
}
