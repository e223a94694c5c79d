
use haarden as hd;

use std::path::{Path, PathBuf};
use std::time::Instant;

const CHANNELS: usize = 4;
const NUM_REPEATS: u32 = 5;
const RESOLUTIONS: [(usize, usize); 6] = [
    (256, 256),
    (640, 360),
    (1280, 720),
    (1920, 1080),
    (2560, 1440),
    (3840, 2160),
];

fn main()
{
    println!("Haar Denoise Benchmark");
    println!("Each resolution is denoised {} times with {} channels.", NUM_REPEATS, CHANNELS);

    let params = hd::DenoiseParams::default();
    let mut results: Vec<(f32, f32)> = Vec::with_capacity(RESOLUTIONS.len());

    for &(width, height) in RESOLUTIONS.iter()
    {
        let original = noise_image(width, height);
        let mut image = original.clone();
        let mut total_ms = 0.0;

        for _ in 0..NUM_REPEATS
        {
            image.copy_from_slice(&original);

            let timer_start = Instant::now();
            let res = hd::denoise_image(&mut image, width, height, CHANNELS, &params);
            total_ms += timer_start.elapsed().as_micros() as f32 / 1_000.0;

            if let Err(err) = res
            {
                eprintln!("Denoising failed at {}x{}: {}", width, height, err);
                std::process::exit(1);
            }
        }

        let megapixels = (width * height) as f32 / 1_000_000.0;
        let avg_ms = total_ms / NUM_REPEATS as f32;
        println!("{}x{}: {:.2}ms ({:.2}ms per megapixel)", width, height, avg_ms, avg_ms / megapixels);
        results.push((megapixels, avg_ms));
    }

    match save_plot(&results)
    {
        Ok(path) => { println!("Result has been saved to {}", path.display()); }
        Err(err) => { eprintln!("Failed to save benchmark plot: {}", err); }
    }
}

/// Bright base with speckle, roughly what a low sample count render looks like.
fn noise_image(width: usize, height: usize) -> Vec<u8>
{
    let mut state: u32 = 0x9e3779b9;
    let mut image = Vec::with_capacity(width * height * CHANNELS);
    for _ in 0..width * height * CHANNELS
    {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        image.push(96 + (state % 64) as u8);
    }
    return image;
}

use plotters::prelude::*;
pub fn save_plot(results: &[(f32, f32)]) -> Result<PathBuf, Box<dyn std::error::Error>>
{
    let output_path = unused_path(Path::new("."), "benchmark_result", "png");

    let root_area = BitMapBackend::new(&output_path, (1920, 1080)).into_drawing_area();
    root_area.fill(&WHITE)?;

    let root_area = root_area.titled("Denoise Benchmark Results", ("sans-serif", 60))?;

    let max_mp = results.iter().map(|r| r.0).fold(0.0f32, f32::max) * 1.05;
    let max_ms = results.iter().map(|r| r.1).fold(0.0f32, f32::max) * 1.2 + 1.0;

    let mut cc = ChartBuilder::on(&root_area)
    .margin(5)
    .set_all_label_area_size(50)
    .build_cartesian_2d(0.0f32..max_mp, 0.0f32..max_ms)?;

    cc.configure_mesh()
    .x_labels(20)
    .y_labels(20)
    .disable_mesh()
    .x_label_formatter(&|v| format!("{:.1}", v))
    .y_label_formatter(&|v| format!("{:.1}", v))
    .x_desc("Resolution (megapixels)")
    .y_desc("Time (ms)")
    .draw()?;

    cc.draw_series(LineSeries::new(results.iter().copied(), &BLACK))?;
    cc.draw_series(results.iter().map(|&p| Circle::new(p, 5, BLACK.filled())))?;

    root_area.present()?;
    return Ok(output_path.clone());
}

/// First of `dir/base.ext`, `dir/base_0.ext`, `dir/base_1.ext`, ... that doesn't exist yet.
fn unused_path(dir: &Path, base_name: &str, extension: &str) -> PathBuf
{
    let first = dir.join(format!("{}.{}", base_name, extension));
    if !first.exists() {
        return first;
    }

    return (0u32..)
        .map(|n| dir.join(format!("{}_{}.{}", base_name, n, extension)))
        .find(|p| !p.exists())
        .unwrap_or(first);
}
