//! OpenCL batch search driver.
//!
//! The kernel is a black box with a narrow contract: per launch it receives
//! a 32-byte root and interprets each global id as a 24-bit tail placed
//! big-endian at offsets 29..32 of the root; every work item derives the
//! Ed25519 public key for its candidate, tests it against the range tables
//! uploaded once at init, and a matching item stores its global id into the
//! single-cell result buffer. The host re-derives any reported candidate on
//! the CPU before trusting it, so a broken kernel can cost throughput but
//! never corrupt output.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_channel::Sender;
use ocl::{Buffer, Context, Device, Kernel, MemFlags, Platform, ProQue, Program, Queue};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::derive::{derive_pubkey, encode_address};
use crate::error::Error;
use crate::matcher::Matcher;
use crate::{Config, FoundKey, SearchShared};

/// Sentinel the result cell is reset to before each launch; anything else
/// read back is the global id of a matching work item.
pub const NO_SOLUTION: u64 = u64::MAX;

static KERNEL_SRC: &str = include_str!("./kernels/ed25519_vanity.cl");

/// One OpenCL device plus the four buffers of the wire format. Owned by
/// the single GPU worker thread; every foreign resource is released by
/// `ocl`'s drop glue when the worker returns.
pub struct GpuSearcher {
    matcher: Arc<Matcher>,
    kernel: Kernel,
    root_buffer: Buffer<u8>,
    result_buffer: Buffer<u64>,
    // uploaded once at init; kept alive for the kernel's lifetime
    _min_buffer: Buffer<u8>,
    _max_buffer: Buffer<u8>,
    global_work_size: usize,
    local_work_size: Option<usize>,
}

impl GpuSearcher {
    /// Build the device context, compile the kernel and upload the range
    /// tables. Any failure here is a [`Error::GpuInit`]; the caller falls
    /// back to CPU-only search.
    pub fn init(config: &Config, matcher: &Arc<Matcher>) -> Result<Self, Error> {
        Self::build(config, matcher).map_err(Error::GpuInit)
    }

    fn build(config: &Config, matcher: &Arc<Matcher>) -> ocl::Result<Self> {
        let platforms = Platform::list();
        let platform = *platforms.get(config.gpu_platform).ok_or_else(|| {
            ocl::Error::from(format!(
                "no OpenCL platform at index {} ({} available)",
                config.gpu_platform,
                platforms.len()
            ))
        })?;

        let device = Device::by_idx_wrap(platform, config.gpu_device)?;
        log::debug!(
            "using OpenCL device {} on platform {}",
            device.name().unwrap_or_else(|_| "unknown".into()),
            platform.name().unwrap_or_else(|_| "unknown".into())
        );

        let context = Context::builder()
            .platform(platform)
            .devices(device)
            .build()?;

        let program = Program::builder()
            .devices(device)
            .src(KERNEL_SRC)
            .build(&context)?;

        let queue = Queue::new(&context, device, None)?;

        let global_work_size = config.global_work_size();
        let ocl_pq = ProQue::new(context, queue, program, Some(global_work_size as u32));

        // flatten the range tables; one upload for the program's lifetime
        let ranges = matcher.ranges();
        let mut min_table = Vec::with_capacity(ranges.len() * 32);
        let mut max_table = Vec::with_capacity(ranges.len() * 32);
        for range in ranges {
            min_table.extend_from_slice(&range.min);
            max_table.extend_from_slice(&range.max);
        }

        let min_buffer = Buffer::builder()
            .queue(ocl_pq.queue().clone())
            .flags(MemFlags::new().read_only())
            .len(min_table.len())
            .copy_host_slice(&min_table)
            .build()?;

        let max_buffer = Buffer::builder()
            .queue(ocl_pq.queue().clone())
            .flags(MemFlags::new().read_only())
            .len(max_table.len())
            .copy_host_slice(&max_table)
            .build()?;

        let root_buffer = Buffer::builder()
            .queue(ocl_pq.queue().clone())
            .flags(MemFlags::new().read_only())
            .len(32)
            .build()?;

        let result_buffer = Buffer::builder()
            .queue(ocl_pq.queue().clone())
            .flags(MemFlags::new().write_only())
            .len(1)
            .copy_host_slice(&[NO_SOLUTION])
            .build()?;

        let kernel = ocl_pq
            .kernel_builder("search_vanity")
            .arg_named("root", None::<&Buffer<u8>>)
            .arg_named("range_min", None::<&Buffer<u8>>)
            .arg_named("range_max", None::<&Buffer<u8>>)
            .arg_named("range_count", ranges.len() as u32)
            .arg_named("result", None::<&Buffer<u64>>)
            .build()?;
        kernel.set_arg("root", &root_buffer)?;
        kernel.set_arg("range_min", &min_buffer)?;
        kernel.set_arg("range_max", &max_buffer)?;
        kernel.set_arg("result", &result_buffer)?;

        Ok(Self {
            matcher: Arc::clone(matcher),
            kernel,
            root_buffer,
            result_buffer,
            _min_buffer: min_buffer,
            _max_buffer: max_buffer,
            global_work_size,
            local_work_size: config.gpu_local_work_size,
        })
    }

    /// Launch batches until the stop flag is raised or the sink closes.
    pub fn run(self, shared: &SearchShared, sink: &Sender<FoundKey>) {
        let mut root = [0u8; 32];
        while !shared.stop.load(Ordering::Relaxed) {
            OsRng.fill_bytes(&mut root);
            match self.launch(&root) {
                Ok(NO_SOLUTION) => {}
                Ok(work_item) => match self.confirm(&root, work_item) {
                    Ok(found) => {
                        if sink.send(found).is_err() {
                            return;
                        }
                    }
                    Err(err) => log::warn!("{err}"),
                },
                Err(err) => log::error!("skipping batch: {err}"),
            }
            shared
                .attempts
                .fetch_add(self.global_work_size as u64, Ordering::Relaxed);
        }
    }

    /// One full batch: reset the result cell, upload the root, enqueue the
    /// kernel and read the result back (the blocking read doubles as the
    /// completion wait).
    fn launch(&self, root: &[u8; 32]) -> Result<u64, Error> {
        self.launch_inner(root).map_err(Error::GpuCompute)
    }

    fn launch_inner(&self, root: &[u8; 32]) -> ocl::Result<u64> {
        self.result_buffer.write(&[NO_SOLUTION][..]).enq()?;
        self.root_buffer.write(&root[..]).enq()?;

        let mut cmd = self.kernel.cmd().global_work_size(self.global_work_size);
        if let Some(local) = self.local_work_size {
            cmd = cmd.local_work_size(local);
        }
        unsafe {
            cmd.enq()?;
        }

        let mut result = [NO_SOLUTION];
        self.result_buffer.read(&mut result[..]).enq()?;
        Ok(result[0])
    }

    /// Rebuild the candidate the kernel claims matched and re-derive it on
    /// the CPU. A key that fails the textual check is reported as spurious
    /// instead of being emitted.
    fn confirm(&self, root: &[u8; 32], work_item: u64) -> Result<FoundKey, Error> {
        let seed = candidate_seed(root, work_item);
        let pubkey = derive_pubkey(&seed);
        let address = encode_address(&pubkey);
        if self.matcher.matches(&pubkey) && self.matcher.confirm(&address) {
            Ok(FoundKey { seed, address })
        } else {
            Err(Error::SpuriousGpuMatch { work_item })
        }
    }
}

/// The candidate private key for a work item: the host root with the
/// 24-bit global id written big-endian over the last three bytes.
pub fn candidate_seed(root: &[u8; 32], work_item: u64) -> [u8; 32] {
    let mut seed = *root;
    seed[29] = (work_item >> 16) as u8;
    seed[30] = (work_item >> 8) as u8;
    seed[31] = work_item as u8;
    seed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_tail_is_big_endian_at_offsets_29_to_31() {
        let root = [0xAAu8; 32];
        let seed = candidate_seed(&root, 0x0012_3456);
        assert_eq!(&seed[..29], &root[..29]);
        assert_eq!(seed[29], 0x12);
        assert_eq!(seed[30], 0x34);
        assert_eq!(seed[31], 0x56);
    }

    #[test]
    fn candidate_zero_keeps_a_zeroed_tail() {
        let mut root = [0u8; 32];
        root[29] = 0xFF;
        root[30] = 0xFF;
        root[31] = 0xFF;
        // the tail always comes from the work item, never the root
        assert_eq!(candidate_seed(&root, 0)[29..], [0, 0, 0]);
    }

    #[test]
    fn sentinel_is_all_ones() {
        assert_eq!(NO_SOLUTION, 0xFFFF_FFFF_FFFF_FFFF);
    }
}
