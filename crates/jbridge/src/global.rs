//! Process-wide bridge
//!
//! For call sites that do not carry a `Bridge` of their own. The bridge is
//! bound exactly once; no thread ever observes a partially bound entry-point
//! table.

use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::boundary::Boundary;
use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};

static GLOBAL: OnceCell<Bridge> = OnceCell::new();

/// Load the configured library and install it as the process-wide bridge.
///
/// A second call returns the bridge installed first; if it asks for a
/// different library a warning is logged and the request is ignored.
pub fn init(config: &BridgeConfig) -> BridgeResult<&'static Bridge> {
    config.validate()?;
    let bridge = GLOBAL.get_or_try_init(|| {
        tracing::info!(library = %config.boundary.library, "initializing process-wide bridge");
        Bridge::open(&config.boundary)
    })?;
    if bridge.library() != Some(config.boundary.library.as_str()) {
        tracing::warn!(
            installed = ?bridge.library(),
            requested = %config.boundary.library,
            "process-wide bridge already initialized; keeping the existing one"
        );
    }
    Ok(bridge)
}

/// Install an already bound boundary as the process-wide bridge.
///
/// Returns the installed bridge, which is the existing one if `init` or
/// `init_with` already ran.
pub fn init_with(boundary: Arc<dyn Boundary>) -> &'static Bridge {
    let mut installed = false;
    let bridge = GLOBAL.get_or_init(|| {
        installed = true;
        Bridge::new(boundary)
    });
    if !installed {
        tracing::warn!("process-wide bridge already initialized; keeping the existing one");
    }
    bridge
}

/// The process-wide bridge, or `BridgeNotInitialized`
pub fn bridge() -> BridgeResult<&'static Bridge> {
    GLOBAL.get().ok_or(BridgeError::NotInitialized)
}

/// Whether the process-wide bridge has been installed
pub fn is_initialized() -> bool {
    GLOBAL.get().is_some()
}
