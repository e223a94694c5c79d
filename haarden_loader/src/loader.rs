
use haarden as hd;

use std::path::Path;
use std::time::Instant;

/// Interleaved 8-bit raster, row-major, no row padding.
#[derive(Clone, Debug)]
pub struct InterleavedImage
{
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: usize,
}

impl InterleavedImage
{
    pub fn denoise(&mut self, params: &hd::DenoiseParams) -> Result<hd::DenoiseStats, hd::DenoiseError>
    {
        return hd::denoise_image(&mut self.data, self.width as usize, self.height as usize, self.channels, params);
    }
}

#[derive(Debug)]
pub enum LoadError
{
    Io(std::io::Error),
    ImageErr(image::ImageError),
    Denoise(hd::DenoiseError),
    UnsupportedChannelCount(usize),
}

impl std::fmt::Display for LoadError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        return match self {
            LoadError::Io(err)       => write!(f, "I/O error: {}", err),
            LoadError::ImageErr(err) => write!(f, "image error: {}", err),
            LoadError::Denoise(err)  => write!(f, "denoise error: {}", err),
            LoadError::UnsupportedChannelCount(n) => write!(f, "can't encode an image with {} channel(s)", n),
        };
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError
{
    fn from(err: std::io::Error) -> Self
    {
        return LoadError::Io(err);
    }
}

impl From<image::ImageError> for LoadError
{
    fn from(err: image::ImageError) -> Self
    {
        return LoadError::ImageErr(err);
    }
}

impl From<hd::DenoiseError> for LoadError
{
    fn from(err: hd::DenoiseError) -> Self
    {
        return LoadError::Denoise(err);
    }
}

/// Decodes any format supported by `image`. With `force_rgba` the result is
/// always 4 channels (the layout of a render readback); otherwise grayscale and
/// opaque images keep fewer channels. Higher bit depths are reduced to 8 bits.
pub fn load_image(path: &Path, force_rgba: bool) -> Result<InterleavedImage, LoadError>
{
    use image::ColorType;

    let timer_start = Instant::now();
    let img = image::open(path)?;
    let (width, height) = (img.width(), img.height());

    let (data, channels) = if force_rgba {
        (img.into_rgba8().into_raw(), 4)
    } else {
        match img.color()
        {
            ColorType::L8  | ColorType::L16  => (img.into_luma8().into_raw(), 1),
            ColorType::La8 | ColorType::La16 => (img.into_luma_alpha8().into_raw(), 2),
            ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => (img.into_rgb8().into_raw(), 3),
            _ => (img.into_rgba8().into_raw(), 4),
        }
    };

    let time = timer_start.elapsed().as_micros() as f32 / 1_000.0;
    log::info!("loaded {} ({}x{}, {} channel(s)) in {:.2}ms", path.display(), width, height, channels, time);

    return Ok(InterleavedImage { data, width, height, channels });
}

/// Encodes an interleaved buffer as PNG.
pub fn save_png(path: &Path, data: &[u8], width: u32, height: u32, channels: usize) -> Result<(), LoadError>
{
    use image::ExtendedColorType;

    let color = match channels
    {
        1 => ExtendedColorType::L8,
        2 => ExtendedColorType::La8,
        3 => ExtendedColorType::Rgb8,
        4 => ExtendedColorType::Rgba8,
        n => { return Err(LoadError::UnsupportedChannelCount(n)); }
    };

    image::save_buffer_with_format(path, data, width, height, color, image::ImageFormat::Png)?;
    log::info!("saved {} ({}x{})", path.display(), width, height);
    return Ok(());
}

/// Load, denoise and save as PNG. The output is written only if denoising succeeded.
pub fn denoise_file(input: &Path, output: &Path, params: &hd::DenoiseParams, force_rgba: bool) -> Result<hd::DenoiseStats, LoadError>
{
    let mut img = load_image(input, force_rgba)?;

    let timer_start = Instant::now();
    let stats = img.denoise(params)?;
    let time = timer_start.elapsed().as_micros() as f32 / 1_000.0;
    log::info!("denoised {} in {:.2}ms", input.display(), time);

    save_png(output, &img.data, img.width, img.height, img.channels)?;
    return Ok(stats);
}

/// Output path next to the input: `dir/name.ext` -> `dir/name_denoised.png`.
pub fn denoised_path(input: &Path) -> std::path::PathBuf
{
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
    return input.with_file_name(format!("{}_denoised.png", stem));
}
