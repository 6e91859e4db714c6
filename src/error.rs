// error.rs — failure taxonomy for the pixel-update pipeline.
//
// Each pipeline stage has exactly one way to fail, and the first failure
// aborts the remaining stages. Every variant carries the underlying
// driver/validation message so the caller (or the log) can tell a missing
// adapter apart from a broken shader without digging through wgpu internals.

use std::fmt;

/// Errors from the pixel-update pipeline, in stage order.
#[derive(Debug)]
pub enum GpuError {
    /// No compatible hardware adapter could be initialized, or the device
    /// request was rejected by the driver.
    DeviceUnavailable(String),
    /// The kernel source failed WGSL validation (syntax or semantic error).
    CompilationFailed(String),
    /// The device rejected the compiled kernel — e.g. a missing entry point
    /// or a pipeline layout the module does not match.
    KernelCreationFailed(String),
    /// The image could not be allocated: non-positive dimensions, a
    /// dimension over the device limit, or out of device memory.
    ResourceAllocationFailed(String),
    /// The read-write view could not be derived from the image. Should not
    /// occur given the fixed format, but is kept distinct so it is visible
    /// if a driver disagrees.
    ViewCreationFailed(String),
}

impl GpuError {
    /// Stable status code for the C ABI. 0 is reserved for success.
    pub fn status(&self) -> i32 {
        match self {
            GpuError::DeviceUnavailable(_) => 1,
            GpuError::CompilationFailed(_) => 2,
            GpuError::KernelCreationFailed(_) => 3,
            GpuError::ResourceAllocationFailed(_) => 4,
            GpuError::ViewCreationFailed(_) => 5,
        }
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::DeviceUnavailable(detail) => {
                write!(f, "no usable GPU device: {detail}")
            }
            GpuError::CompilationFailed(detail) => {
                write!(f, "kernel compilation failed: {detail}")
            }
            GpuError::KernelCreationFailed(detail) => {
                write!(f, "kernel creation failed: {detail}")
            }
            GpuError::ResourceAllocationFailed(detail) => {
                write!(f, "image allocation failed: {detail}")
            }
            GpuError::ViewCreationFailed(detail) => {
                write!(f, "image view creation failed: {detail}")
            }
        }
    }
}

impl std::error::Error for GpuError {}
