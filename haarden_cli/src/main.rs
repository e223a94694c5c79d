
use haarden as hd;
use haarden_loader as hdl;

use clap::{Parser, ValueEnum};

use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Policy
{
    /// Threshold only the finest detail bands.
    Outermost,
    /// Threshold the detail bands of every level.
    AllLevels,
}

impl From<Policy> for hd::ThresholdPolicy
{
    fn from(policy: Policy) -> Self
    {
        return match policy {
            Policy::Outermost => hd::ThresholdPolicy::OutermostLevel,
            Policy::AllLevels => hd::ThresholdPolicy::AllLevels,
        };
    }
}

/// Haar wavelet denoiser for rendered frames.
#[derive(Parser, Debug)]
#[command(name = "haarden", version)]
struct CmdLineArgs
{
    /// Image to denoise (any format the `image` crate reads).
    input: PathBuf,
    /// Output PNG. Defaults to `<input>_denoised.png`.
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(short, long, default_value_t = hd::DEFAULT_THRESHOLD)]
    threshold: f32,
    #[arg(short, long, default_value_t = hd::DEFAULT_LEVELS)]
    levels: u32,
    #[arg(long, value_enum, default_value_t = Policy::Outermost)]
    policy: Policy,
    /// Always process 4 channels, like a raw RGBA8 render readback.
    #[arg(long, default_value_t = false)]
    rgba: bool,
}

impl CmdLineArgs
{
    fn params(&self) -> hd::DenoiseParams
    {
        return hd::DenoiseParams {
            threshold: self.threshold,
            levels: self.levels,
            policy: self.policy.into(),
        };
    }
}

fn run(args: &CmdLineArgs) -> Result<(PathBuf, hd::DenoiseStats), hdl::LoadError>
{
    let output = args.output.clone().unwrap_or_else(|| hdl::denoised_path(&args.input));
    let params = args.params();
    log::info!("threshold {}, {} level(s), {:?}", params.threshold, params.levels, params.policy);

    return match hdl::denoise_file(&args.input, &output, &params, args.rgba)
    {
        Ok(stats) => Ok((output, stats)),
        Err(err) =>
        {
            log::error!("{} -> {}: {:?}", args.input.display(), output.display(), err);
            Err(err)
        }
    };
}

fn main() -> ExitCode
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CmdLineArgs::parse();
    match run(&args)
    {
        Ok((output, stats)) =>
        {
            println!("{} -> {}: {} level(s), {} coefficient(s) zeroed, {} sample(s) clamped",
                     args.input.display(), output.display(), stats.levels, stats.zeroed_coefficients, stats.clamped_samples);
            return ExitCode::SUCCESS;
        }
        Err(err) =>
        {
            eprintln!("Failed to denoise {}: {}", args.input.display(), err);
            return ExitCode::FAILURE;
        }
    }
}
