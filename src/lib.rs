// gpupixel — GPU pixel-update dispatch.
//
// One operation: given the dimensions of a host pixel buffer, allocate a
// GPU-resident R32Sint 2D image, compile the fixed update kernel, bind the
// image for read-write access at slot 0, and dispatch a grid of 16×16
// thread groups covering it. Exposed as a typed Rust API (`update_pixels`)
// and over a C ABI (`UpdatePixels` in `ffi`).
//
// Every call is independent: device, kernel, and image are created fresh
// and released when the returned `DispatchTicket` is dropped. Nothing is
// cached or shared across calls.

pub mod device;
pub mod error;
pub mod ffi;
pub mod image;
pub mod kernel;
pub mod pipeline;

pub use error::GpuError;
pub use pipeline::{dispatch_extent, update_pixels, DispatchTicket, UpdateParams, WORKGROUP_DIM};
