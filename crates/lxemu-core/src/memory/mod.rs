//! Address-space layout, access policy, and the RAM/device router.

/// Access-width and alignment policy helpers.
pub mod access;
/// Address-space layout and classification.
pub mod map;
/// RAM owner and device-space forwarder.
pub mod router;

pub use access::{validate_alignment, AccessWidth};
pub use map::{MemoryMap, MemoryMapError, MemoryRegion, DEVICE_BASE, RAM_BASE, RAM_END};
pub use router::Router;
