// pipeline.rs — the four-stage pixel-update pipeline.
//
// One call = one pipeline run: acquire device → compile kernel → allocate
// image → dispatch. Strictly sequential, no retry; the first error aborts
// the rest and every GPU object created so far is dropped on the way out.
//
// Per call the state flows
//   Uninitialized → DeviceReady → KernelReady → ResourceReady → Dispatched
// and everything is released when the returned `DispatchTicket` is dropped.
//
// COMPLETION:
// `update_pixels` returns as soon as the dispatch is enqueued — GPU
// execution may still be in flight. That is deliberate: the ticket carries
// the queue submission index, and callers that need the result to be
// visible call `DispatchTicket::wait()`. Dropping the ticket without
// waiting is fire-and-forget (what the C ABI does).

use crate::device::GpuDevice;
use crate::error::GpuError;
use crate::image::{GpuImage, ImageExtent};
use crate::kernel::ComputeKernel;

/// Thread-group footprint in each of x and y. Must match the
/// `@workgroup_size` declared by the kernel source.
pub const WORKGROUP_DIM: u32 = 16;

/// Host-side parameters for one pipeline call.
///
/// `color` and `indices` are accepted for ABI compatibility but currently
/// have no effect on GPU state — they are reserved for selective-update
/// semantics. The caller's pixel buffer itself never enters the pipeline;
/// only its dimensions do.
#[derive(Debug, Clone)]
pub struct UpdateParams {
    pub width: i32,
    pub height: i32,
    /// Reserved for a future kernel parameter; unused.
    pub color: i32,
    /// Reserved for selective updates; unused.
    pub indices: Vec<i32>,
}

impl UpdateParams {
    /// Parameters with no color and no index list.
    pub fn new(width: i32, height: i32) -> Self {
        UpdateParams {
            width,
            height,
            color: 0,
            indices: Vec::new(),
        }
    }
}

/// Number of thread groups needed to cover a `width × height` image with
/// [`WORKGROUP_DIM`]² groups: ceiling division in x and y, one layer in z.
pub fn dispatch_extent(width: u32, height: u32) -> (u32, u32, u32) {
    let x = (width + WORKGROUP_DIM - 1) / WORKGROUP_DIM;
    let y = (height + WORKGROUP_DIM - 1) / WORKGROUP_DIM;
    (x, y, 1)
}

/// Completion token for an enqueued dispatch.
///
/// Owns the device, the compiled kernel, and the image for the duration of
/// the GPU work. Dropping the ticket releases them all; the GPU driver keeps
/// in-flight work valid until it completes, but any computed result is then
/// discarded.
#[derive(Debug)]
pub struct DispatchTicket {
    gpu: GpuDevice,
    image: GpuImage,
    // Kept alive until the ticket is dropped so the pipeline object is not
    // released under an in-flight dispatch.
    _kernel: ComputeKernel,
    index: wgpu::SubmissionIndex,
}

impl DispatchTicket {
    /// Block until the GPU has finished executing the dispatch.
    pub fn wait(&self) {
        let _ = self
            .gpu
            .device
            .poll(wgpu::Maintain::wait_for(self.index.clone()));
    }

    /// The image the kernel wrote to. Contents are only trustworthy after
    /// [`wait`](Self::wait).
    pub fn image(&self) -> &GpuImage {
        &self.image
    }

    /// The device this call ran on.
    pub fn device(&self) -> &GpuDevice {
        &self.gpu
    }
}

/// Run the full pipeline for one call.
///
/// Acquires a fresh device, recompiles the fixed kernel, allocates an
/// uninitialized `width × height` image, binds both, and enqueues a
/// `ceil(width/16) × ceil(height/16) × 1` grid of thread groups.
///
/// Returns once the work is enqueued — see [`DispatchTicket`] for
/// completion. Nothing is shared between calls; invoking this concurrently
/// from multiple threads is safe.
///
/// # Errors
/// The first stage failure, per the [`GpuError`] taxonomy. On error no
/// dispatch is issued and all intermediate objects are released.
pub fn update_pixels(params: &UpdateParams) -> Result<DispatchTicket, GpuError> {
    let gpu = GpuDevice::acquire()?;
    let kernel = ComputeKernel::compile(&gpu)?;
    let extent = ImageExtent::new(params.width, params.height)?;
    let image = GpuImage::allocate(&gpu, extent)?;
    Ok(dispatch(gpu, kernel, image))
}

/// Stage 4: bind kernel + image view and enqueue the thread-group grid.
///
/// Dispatch itself has no failure mode — invalid device state would only
/// manifest as absent output.
fn dispatch(gpu: GpuDevice, kernel: ComputeKernel, image: GpuImage) -> DispatchTicket {
    let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("update_pixels BG"),
        layout: &kernel.bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(&image.view),
        }],
    });

    let (groups_x, groups_y, groups_z) = dispatch_extent(image.width, image.height);
    log::debug!(
        "dispatching {groups_x}x{groups_y}x{groups_z} thread groups over {}x{}",
        image.width,
        image.height
    );

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("update_pixels dispatch"),
        });
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("update_pixels"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&kernel.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(groups_x, groups_y, groups_z);
    }
    let index = gpu.queue.submit(std::iter::once(encoder.finish()));

    DispatchTicket {
        gpu,
        image,
        _kernel: kernel,
        index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Grid math (pure, no GPU needed) -----------------------------------

    #[test]
    fn test_dispatch_extent_exact_multiples() {
        assert_eq!(dispatch_extent(32, 32), (2, 2, 1));
        assert_eq!(dispatch_extent(16, 16), (1, 1, 1));
        assert_eq!(dispatch_extent(64, 16), (4, 1, 1));
    }

    #[test]
    fn test_dispatch_extent_rounds_up() {
        assert_eq!(dispatch_extent(33, 16), (3, 1, 1));
        assert_eq!(dispatch_extent(1, 1), (1, 1, 1));
        assert_eq!(dispatch_extent(17, 17), (2, 2, 1));
        assert_eq!(dispatch_extent(15, 31), (1, 2, 1));
    }

    #[test]
    fn test_dispatch_extent_covers_every_pixel() {
        for (w, h) in [(1u32, 1u32), (16, 16), (33, 16), (100, 100), (752, 480)] {
            let (gx, gy, gz) = dispatch_extent(w, h);
            assert!(gx * WORKGROUP_DIM >= w, "{w}x{h}: x underflow");
            assert!(gy * WORKGROUP_DIM >= h, "{w}x{h}: y underflow");
            // No more than one extra group per axis.
            assert!((gx - 1) * WORKGROUP_DIM < w, "{w}x{h}: x overflow");
            assert!((gy - 1) * WORKGROUP_DIM < h, "{w}x{h}: y overflow");
            assert_eq!(gz, 1);
        }
    }

    #[test]
    fn test_update_params_defaults() {
        let params = UpdateParams::new(640, 480);
        assert_eq!(params.color, 0);
        assert!(params.indices.is_empty());
    }

    // ---- GPU integration ---------------------------------------------------

    #[test]
    #[ignore = "requires a GPU"]
    fn test_full_pipeline_writes_linear_indices() {
        let ticket = update_pixels(&UpdateParams::new(32, 32)).expect("pipeline should run");
        ticket.wait();
        let pixels = ticket.image().readback(ticket.device());
        let expected: Vec<i32> = (0..32 * 32).collect();
        assert_eq!(pixels, expected);
    }

    #[test]
    #[ignore = "requires a GPU"]
    fn test_full_pipeline_non_multiple_dimensions() {
        // 33×16 needs a (3, 1, 1) grid; the edge workgroup overhangs the
        // image, so correct output proves the kernel's bounds guard.
        let ticket = update_pixels(&UpdateParams::new(33, 16)).expect("pipeline should run");
        ticket.wait();
        let pixels = ticket.image().readback(ticket.device());
        let expected: Vec<i32> = (0..33 * 16).collect();
        assert_eq!(pixels, expected);
    }

    #[test]
    #[ignore = "requires a GPU"]
    fn test_invalid_dimensions_fail_before_dispatch() {
        let err = update_pixels(&UpdateParams::new(0, 32)).unwrap_err();
        assert!(matches!(err, GpuError::ResourceAllocationFailed(_)));
        let err = update_pixels(&UpdateParams::new(32, -1)).unwrap_err();
        assert!(matches!(err, GpuError::ResourceAllocationFailed(_)));
    }

    #[test]
    #[ignore = "requires a GPU"]
    fn test_color_and_indices_have_no_effect() {
        let plain = update_pixels(&UpdateParams::new(20, 20)).expect("plain call");
        plain.wait();
        let baseline = plain.image().readback(plain.device());

        let decorated = update_pixels(&UpdateParams {
            width: 20,
            height: 20,
            color: 0x00FF_00FF,
            indices: vec![0, 1, 2, 3],
        })
        .expect("decorated call");
        decorated.wait();
        let output = decorated.image().readback(decorated.device());

        assert_eq!(baseline, output);
    }

    #[test]
    #[ignore = "requires a GPU"]
    fn test_repeated_calls_are_independent() {
        // Each call acquires and releases its own device/kernel/image set.
        for _ in 0..3 {
            let ticket = update_pixels(&UpdateParams::new(48, 48)).expect("call should succeed");
            ticket.wait();
            let pixels = ticket.image().readback(ticket.device());
            assert_eq!(pixels.len(), 48 * 48);
            assert_eq!(pixels[0], 0);
            assert_eq!(pixels[48 * 48 - 1], 48 * 48 - 1);
        }
    }
}
