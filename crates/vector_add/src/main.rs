use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use nanorand::{Rng, WyRand};
use tracing::info;
use vector_add::verify::{self, DEFAULT_ATOL, DEFAULT_RTOL};
use vector_add::{
    launch_with, CpuRuntime, LaunchConfig, Runtime, DEFAULT_BLOCK_SIZE, DEFAULT_THREADS_PER_BLOCK,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    /// Emulated accelerator on the CPU thread pool.
    Cpu,
    /// CUDA device 0, needs the `cuda` feature.
    Cuda,
}

/// Adds two random vectors with the block-parallel kernel and checks the result.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Opt {
    /// How many numbers to generate and add together.
    #[arg(long, default_value_t = 512 * 2048)]
    len: usize,

    /// Elements covered by one block.
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u32,

    /// Device threads sharing one block.
    #[arg(long, default_value_t = DEFAULT_THREADS_PER_BLOCK)]
    threads: u32,

    /// Ask the occupancy API for the thread count instead of using `--threads`.
    #[arg(long)]
    suggest_threads: bool,

    #[arg(long, value_enum, default_value_t = Backend::Cpu)]
    backend: Backend,

    /// Seed for the input vectors; random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Run the emulated blocks on the calling thread only.
    #[arg(long)]
    sequential: bool,
}

impl Opt {
    fn config(&self) -> LaunchConfig {
        let config = LaunchConfig::new().block_size(self.block_size);
        if self.suggest_threads {
            config.suggested_threads()
        } else {
            config.threads_per_block(self.threads)
        }
    }
}

fn run<R: Runtime>(runtime: &R, opt: &Opt) -> Result<()> {
    // generate our random vectors, uniform in [0, 1).
    let mut wyrand = match opt.seed {
        Some(seed) => WyRand::new_seed(seed),
        None => WyRand::new(),
    };
    let mut lhs = vec![0.0f32; opt.len];
    wyrand.fill(&mut lhs);
    let mut rhs = vec![0.0f32; opt.len];
    wyrand.fill(&mut rhs);

    let lhs_buf = runtime.alloc_from(&lhs)?;
    let rhs_buf = runtime.alloc_from(&rhs)?;
    let mut out_buf = runtime.alloc_zeroed::<f32>(opt.len)?;

    let config = opt.config();
    info!(
        len = opt.len,
        block_size = config.block_size,
        blocks = config.grid_for(opt.len)?.x,
        "launching"
    );
    launch_with::<R, f32>(runtime, &config, &lhs_buf, &rhs_buf, &mut out_buf)?;

    // the launch may still be running on the device.
    runtime.synchronize()?;

    let out = runtime.to_vec::<f32>(&out_buf)?;
    let expected = verify::reference_add(&lhs, &rhs);
    if let Some(i) = verify::first_mismatch(&out, &expected, DEFAULT_RTOL, DEFAULT_ATOL) {
        bail!(
            "kernel mismatch at index {i}: {} + {} gave {}, expected {}",
            lhs[i],
            rhs[i],
            out[i],
            expected[i]
        );
    }

    println!("vector_add_kernel successfully");
    Ok(())
}

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_env("VECTOR_ADD_LOG");
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let opt = Opt::parse();
    match opt.backend {
        Backend::Cpu => {
            let runtime = if opt.sequential {
                CpuRuntime::new().sequential()
            } else {
                CpuRuntime::new()
            };
            run(&runtime, &opt)
        }
        #[cfg(feature = "cuda")]
        Backend::Cuda => run(&vector_add::CudaRuntime::new()?, &opt),
        #[cfg(not(feature = "cuda"))]
        Backend::Cuda => bail!("the cuda backend needs the `cuda` feature"),
    }
}
