//! Native-messaging transport: stdio framing plus the host-side runtime
//! state files it mediates through.

pub mod framing;
pub mod state;

pub use state::{ExtensionMessage, NativeHostState};
