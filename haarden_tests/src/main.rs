
pub use haarden as hd;
pub use haarden_loader as hdl;

use clap::Parser;

use std::fs;
use std::path::{Path, PathBuf};
use std::io::Write;

#[derive(Parser, Debug)]
struct CmdLineArgs
{
    #[arg(long, default_value_t = false)]
    overwrite_outputs: bool,
    #[arg(long, default_value_t = false)]
    all_levels: bool,
    #[arg(long, default_value_t = hd::DEFAULT_THRESHOLD)]
    threshold: f32,
}

#[derive(Default)]
struct Summary
{
    passed: u32,
    failed: u32,
    written: u32,
}

const TEST_IMAGES_DIR: &str = "test_images";
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tga"];

fn main()
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if !Path::new(TEST_IMAGES_DIR).is_dir() {
        panic!("It appears that the \"{}\" directory is missing (it's not directly visible from the current working directory). The \"{}\" directory is located in the project's base directory.", TEST_IMAGES_DIR, TEST_IMAGES_DIR);
    }

    let args = CmdLineArgs::parse();
    let params = hd::DenoiseParams {
        threshold: args.threshold,
        policy: if args.all_levels { hd::ThresholdPolicy::AllLevels } else { hd::ThresholdPolicy::OutermostLevel },
        ..Default::default()
    };

    let images = match collect_test_images(Path::new(TEST_IMAGES_DIR))
    {
        Ok(images) => images,
        Err(err) => { panic!("Failed to read \"{}\": {}", TEST_IMAGES_DIR, err); }
    };

    let mut summary = Summary::default();
    for (i, path) in images.iter().enumerate()
    {
        print!("\r[{}/{}] '{}' ", i + 1, images.len(), path.display());
        std::io::stdout().flush().unwrap();

        match run_image(path, &params, args.overwrite_outputs)
        {
            Ok(Outcome::Written) => { summary.written += 1; println!("Written."); }
            Ok(Outcome::Matches) => { summary.passed += 1;  println!("Ok."); }
            Ok(Outcome::NoReference) => { println!("No reference, skipped."); }
            Ok(Outcome::Differs(count)) =>
            {
                summary.failed += 1;
                log::warn!("{}: {} byte(s) differ from {}", path.display(), count, hdl::denoised_path(path).display());
                println!("{} byte(s) differ from reference!", count);
            }
            Err(err) =>
            {
                summary.failed += 1;
                log::error!("{}: {:?}", path.display(), err);
                println!("Error: {}", err);
            }
        }
    }

    println!("{} passed, {} failed, {} written.", summary.passed, summary.failed, summary.written);
    if summary.failed > 0 {
        std::process::exit(1);
    }
}

enum Outcome
{
    Written,
    Matches,
    NoReference,
    Differs(usize),
}

fn run_image(path: &Path, params: &hd::DenoiseParams, overwrite: bool) -> Result<Outcome, hdl::LoadError>
{
    let mut img = hdl::load_image(path, true)?;
    img.denoise(params)?;

    let reference_path = hdl::denoised_path(path);
    if overwrite
    {
        hdl::save_png(&reference_path, &img.data, img.width, img.height, img.channels)?;
        return Ok(Outcome::Written);
    }

    if !reference_path.is_file() {
        return Ok(Outcome::NoReference);
    }

    let reference = hdl::load_image(&reference_path, true)?;
    if reference.width != img.width || reference.height != img.height {
        return Ok(Outcome::Differs(img.data.len()));
    }

    let diff = img.data.iter().zip(reference.data.iter()).filter(|(a, b)| a != b).count();
    return Ok(if diff == 0 { Outcome::Matches } else { Outcome::Differs(diff) });
}

fn collect_test_images(dir: &Path) -> std::io::Result<Vec<PathBuf>>
{
    let mut images = Vec::new();
    for entry in fs::read_dir(dir)?
    {
        let path = entry?.path();
        if !path.is_file() { continue; }

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
        if stem.ends_with("_denoised") || !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        images.push(path);
    }

    images.sort();
    return Ok(images);
}
