// image.rs — GPU image resource and its read-write view.
//
// The pipeline's only resource: a device-local 2D texture of signed 32-bit
// integers sized to the caller's buffer, bound for read-write storage access
// by the kernel. The caller's pixel data is never uploaded — the texture
// starts uninitialized, matching the contract of the system this crate
// reimplements.
//
// `readback()` exists for tests and debugging only. It is synchronous and
// stalls the GPU; the public pipeline never calls it. wgpu requires the
// bytes-per-row of a texture→buffer copy to be a multiple of 256
// (`COPY_BYTES_PER_ROW_ALIGNMENT`), so rows are padded in the transfer
// buffer and compacted after mapping.

use crate::device::GpuDevice;
use crate::error::GpuError;

const COPY_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// Validated image dimensions.
///
/// The C ABI delivers dimensions as `i32`; the constructor is the single
/// place where non-positive values are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageExtent {
    pub width: u32,
    pub height: u32,
}

impl ImageExtent {
    /// Validate caller-supplied dimensions.
    ///
    /// # Errors
    /// [`GpuError::ResourceAllocationFailed`] when either dimension is zero
    /// or negative.
    pub fn new(width: i32, height: i32) -> Result<Self, GpuError> {
        if width <= 0 || height <= 0 {
            return Err(GpuError::ResourceAllocationFailed(format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(ImageExtent {
            width: width as u32,
            height: height as u32,
        })
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A 2D `R32Sint` image resident on the GPU, with the full-resource view
/// the kernel binds at slot 0.
///
/// Owns its wgpu resources; dropping the `GpuImage` releases the texture
/// memory. Any computed contents are discarded with it unless read back
/// first.
#[derive(Debug)]
pub struct GpuImage {
    pub texture: wgpu::Texture,
    /// Full-resource view granting the kernel read-write access.
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl GpuImage {
    /// Allocate a device-local image of the given extent.
    ///
    /// The texture is created with `STORAGE_BINDING` (kernel read-write)
    /// and `COPY_SRC` (test readback) usage, one mip level, no CPU-visible
    /// mapping. Contents are uninitialized until the kernel runs.
    ///
    /// # Errors
    /// [`GpuError::ResourceAllocationFailed`] when the device is out of
    /// memory or rejects the descriptor (e.g. a dimension over the device
    /// limit); [`GpuError::ViewCreationFailed`] when the view cannot be
    /// derived.
    pub fn allocate(gpu: &GpuDevice, extent: ImageExtent) -> Result<Self, GpuError> {
        // Two scopes: out-of-memory outermost, validation inner. Either one
        // firing means the allocation failed.
        gpu.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("gpupixel image"),
            size: wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R32Sint,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let validation = pollster::block_on(gpu.device.pop_error_scope());
        let oom = pollster::block_on(gpu.device.pop_error_scope());
        if let Some(e) = oom.or(validation) {
            return Err(GpuError::ResourceAllocationFailed(e.to_string()));
        }

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        if let Some(e) = pollster::block_on(gpu.device.pop_error_scope()) {
            return Err(GpuError::ViewCreationFailed(e.to_string()));
        }

        Ok(GpuImage {
            texture,
            view,
            width: extent.width,
            height: extent.height,
        })
    }

    /// Read the image back to CPU memory (tests/debug only).
    ///
    /// Synchronous and expensive: encodes a texture→buffer copy, submits it,
    /// and blocks until the buffer can be mapped. Returns `width * height`
    /// pixels in row-major order with no padding.
    pub fn readback(&self, gpu: &GpuDevice) -> Vec<i32> {
        let row_bytes = self.width * std::mem::size_of::<i32>() as u32;
        let aligned_bytes_per_row = align_to(row_bytes, COPY_ALIGNMENT);
        let transfer_size = (aligned_bytes_per_row * self.height) as u64;

        let transfer_buf = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gpupixel readback"),
            size: transfer_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("gpupixel readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &transfer_buf,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(aligned_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));

        // Map the buffer — async in wgpu's API, blocked on via poll(Wait).
        let slice = transfer_buf.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            sender.send(result).expect("readback channel closed");
        });
        let _ = gpu.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .expect("readback map callback never fired")
            .expect("readback map failed");

        // Compact rows, stripping the alignment padding.
        let mapped = slice.get_mapped_range();
        let mut out = vec![0i32; (self.width * self.height) as usize];
        for y in 0..self.height as usize {
            let src_start = y * aligned_bytes_per_row as usize;
            let dst_start = y * self.width as usize;
            out[dst_start..dst_start + self.width as usize].copy_from_slice(
                bytemuck::cast_slice(&mapped[src_start..src_start + row_bytes as usize]),
            );
        }
        drop(mapped);
        transfer_buf.unmap();

        out
    }
}

/// Round `value` up to the next multiple of `alignment`.
#[inline]
pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) / alignment * alignment
}
