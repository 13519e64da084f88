use thiserror::Error;

/// Everything that can go wrong outside of plain I/O.
///
/// Startup failures (`InvalidPrefix`, `GpuInit`) surface to `main` and set a
/// non-zero exit code. Runtime failures inside the GPU worker (`GpuCompute`,
/// `SpuriousGpuMatch`) are logged and the offending batch is skipped; the
/// search is idempotent with respect to dropped candidates, so skipping is
/// always safe.
#[derive(Debug, Error)]
pub enum Error {
    /// No target encoding length decodes the padded prefix into 32 bytes.
    #[error("prefix {0:?} cannot start a Base58-encoded 32-byte key")]
    InvalidPrefix(String),

    /// Platform/device selection, program build, or buffer creation failed.
    #[error("OpenCL setup failed: {0}")]
    GpuInit(ocl::Error),

    /// A kernel launch or buffer transfer failed after successful init.
    #[error("OpenCL launch failed: {0}")]
    GpuCompute(ocl::Error),

    /// The device reported a work item whose reconstructed key does not
    /// actually produce an address with the requested prefix.
    #[error("GPU returned non-matching solution (work item {work_item})")]
    SpuriousGpuMatch { work_item: u64 },
}
