//! C ABI surface.
//!
//! One export, matching the native library this crate replaces:
//!
//! ```c
//! int32_t UpdatePixels(int32_t* pixels, int32_t width, int32_t height,
//!                      int32_t color, const int32_t* indices,
//!                      int32_t numIndices);
//! ```
//!
//! Returns 0 on success or the failed stage's status code (1–5, see
//! [`crate::error::GpuError::status`]). The original returned `void` and
//! logged failures;
//! the status code is additive, so callers that ignore it get the old
//! behavior. The call returns once the dispatch is enqueued — it does not
//! wait for GPU completion, and `pixels` is neither read nor written.

use crate::pipeline::{update_pixels, UpdateParams};

/// Status code for a successful call.
pub const STATUS_OK: i32 = 0;

/// Run the pixel-update pipeline for a `width × height` buffer.
///
/// `pixels` is accepted for ABI compatibility and never dereferenced.
/// `indices` is only read when non-null and `num_indices > 0`, in which case
/// it must point to at least `num_indices` readable `i32`s.
///
/// # Safety
/// `indices`/`num_indices` must satisfy the contract above. All other
/// pointer arguments may be null.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn UpdatePixels(
    pixels: *mut i32,
    width: i32,
    height: i32,
    color: i32,
    indices: *const i32,
    num_indices: i32,
) -> i32 {
    // The caller's buffer never enters the pipeline; only its dimensions do.
    let _ = pixels;

    let indices = if !indices.is_null() && num_indices > 0 {
        std::slice::from_raw_parts(indices, num_indices as usize).to_vec()
    } else {
        Vec::new()
    };

    let params = UpdateParams {
        width,
        height,
        color,
        indices,
    };

    match update_pixels(&params) {
        // Fire-and-forget: dropping the ticket releases the device and
        // image without waiting for GPU completion.
        Ok(_ticket) => STATUS_OK,
        Err(err) => {
            log::error!("UpdatePixels failed: {err}");
            err.status()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GpuError;

    #[test]
    fn test_ok_status_is_zero_and_distinct_from_errors() {
        assert_eq!(STATUS_OK, 0);
        let errors = [
            GpuError::DeviceUnavailable(String::new()),
            GpuError::CompilationFailed(String::new()),
            GpuError::KernelCreationFailed(String::new()),
            GpuError::ResourceAllocationFailed(String::new()),
            GpuError::ViewCreationFailed(String::new()),
        ];
        for err in &errors {
            assert_ne!(err.status(), STATUS_OK);
        }
    }

    #[test]
    #[ignore = "requires a GPU"]
    fn test_ffi_null_pointers_are_accepted() {
        // pixels and indices may both be null; the call must still run.
        let status = unsafe {
            UpdatePixels(std::ptr::null_mut(), 16, 16, 0, std::ptr::null(), 0)
        };
        assert_eq!(status, STATUS_OK);
    }

    #[test]
    #[ignore = "requires a GPU"]
    fn test_ffi_reports_invalid_dimensions() {
        let status = unsafe {
            UpdatePixels(std::ptr::null_mut(), 0, 16, 0, std::ptr::null(), 0)
        };
        assert_eq!(
            status,
            GpuError::ResourceAllocationFailed(String::new()).status()
        );
    }

    #[test]
    #[ignore = "requires a GPU"]
    fn test_ffi_index_list_is_read_but_inert() {
        let indices = [0i32, 5, 9];
        let status = unsafe {
            UpdatePixels(
                std::ptr::null_mut(),
                16,
                16,
                0x00FF_0000,
                indices.as_ptr(),
                indices.len() as i32,
            )
        };
        assert_eq!(status, STATUS_OK);
    }
}
