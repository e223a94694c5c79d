
use crate::base::*;
use crate::wavelet::*;

/// Which detail bands get hard-thresholded.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThresholdPolicy
{
    /// Only the LH/HL/HH bands of level 0. Inner levels nested inside the
    /// coarse quadrant keep all of their detail.
    #[default]
    OutermostLevel,
    /// LH/HL/HH bands of every level that ran, each using its own region.
    AllLevels,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DenoiseParams
{
    /// Detail coefficients with a magnitude below this are zeroed.
    /// Negative values behave like 0.
    pub threshold: f32,
    pub levels: u32,
    pub policy: ThresholdPolicy,
}

pub const DEFAULT_THRESHOLD: f32 = 5.0;
pub const DEFAULT_LEVELS: u32 = 2;

impl Default for DenoiseParams
{
    fn default() -> Self
    {
        return Self {
            threshold: DEFAULT_THRESHOLD,
            levels: DEFAULT_LEVELS,
            policy: Default::default(),
        };
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DenoiseStats
{
    /// Decomposition levels that actually ran (same for every channel).
    pub levels: u32,
    pub zeroed_coefficients: usize,
    /// Output samples that fell outside [0, 255] before clamping.
    pub clamped_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenoiseError
{
    InvalidDimensions { width: usize, height: usize, channels: usize },
    InvalidBufferSize { expected: usize, actual: usize },
}

impl std::fmt::Display for DenoiseError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        return match self {
            DenoiseError::InvalidDimensions { width, height, channels } => {
                write!(f, "invalid image dimensions {}x{} with {} channel(s)", width, height, channels)
            }
            DenoiseError::InvalidBufferSize { expected, actual } => {
                write!(f, "image buffer holds {} bytes, expected {}", actual, expected)
            }
        };
    }
}

impl std::error::Error for DenoiseError {}

////////
// Thresholding

/// Zeroes detail coefficients of one level whose magnitude is below `threshold`.
/// Returns how many were zeroed (coefficients that were already 0 aren't counted).
pub fn threshold_level(field: &mut ScalarField, level: u32, threshold: f32) -> usize
{
    let region = Region::for_level(field.width(), field.height(), level);
    if !region.can_decompose() { return 0; }

    let stride = field.width();
    let data = field.data_mut();
    let mut zeroed = 0;
    region.for_each_detail(|x, y| {
        let value = &mut data[y * stride + x];
        if value.abs() < threshold
        {
            if *value != 0.0 { zeroed += 1; }
            *value = 0.0;
        }
    });

    return zeroed;
}

/// `levels` is the number of levels the forward transform actually ran;
/// bands of levels that didn't run are never touched.
pub fn threshold_detail_coefficients(field: &mut ScalarField, levels: u32, threshold: f32,
                                     policy: ThresholdPolicy) -> usize
{
    if levels == 0 { return 0; }

    return match policy
    {
        ThresholdPolicy::OutermostLevel => threshold_level(field, 0, threshold),
        ThresholdPolicy::AllLevels => (0..levels).map(|level| threshold_level(field, level, threshold)).sum(),
    };
}

////////
// Channels

/// Forward transform, threshold, inverse transform. The result may leave the
/// 0-255 range; clamping is up to the caller. Returns the zeroed coefficient count.
pub fn denoise_channel(field: &mut ScalarField, params: &DenoiseParams) -> usize
{
    let levels = haar_forward(field, params.levels);
    let zeroed = threshold_detail_coefficients(field, levels, params.threshold, params.policy);
    haar_inverse(field, params.levels);
    return zeroed;
}

/// Scatters an interleaved buffer into one field per channel.
pub fn split_channels(image: &[u8], width: usize, height: usize, channels: usize) -> Vec<ScalarField>
{
    let mut fields: Vec<ScalarField> = (0..channels).map(|_| ScalarField::new(width, height)).collect();
    for (i, pixel) in image.chunks_exact(channels).enumerate()
    {
        for (c, &value) in pixel.iter().enumerate()
        {
            fields[c].data_mut()[i] = value as f32;
        }
    }
    return fields;
}

/// Gathers channel fields back into an interleaved buffer. Returns how many
/// samples had to be clamped.
pub fn merge_channels(fields: &[ScalarField], image: &mut [u8]) -> usize
{
    let channels = fields.len();
    let mut clamped = 0;
    for (i, pixel) in image.chunks_exact_mut(channels).enumerate()
    {
        for (c, out) in pixel.iter_mut().enumerate()
        {
            let value = fields[c].data()[i];
            if !(0.0..=255.0).contains(&value.round()) { clamped += 1; }
            *out = to_u8_clamped(value);
        }
    }
    return clamped;
}

////////
// Images

pub fn validate_image(image: &[u8], width: usize, height: usize, channels: usize) -> Result<(), DenoiseError>
{
    let invalid_dims = DenoiseError::InvalidDimensions { width, height, channels };
    if width == 0 || height == 0 || channels == 0 {
        return Err(invalid_dims);
    }

    let expected = width.checked_mul(height).and_then(|n| n.checked_mul(channels)).ok_or(invalid_dims)?;
    if image.len() != expected {
        return Err(DenoiseError::InvalidBufferSize { expected, actual: image.len() });
    }

    return Ok(());
}

/// Denoises an interleaved 8-bit image in place, each channel independently.
/// The buffer is left untouched if validation fails.
pub fn denoise_image(image: &mut [u8], width: usize, height: usize, channels: usize,
                     params: &DenoiseParams) -> Result<DenoiseStats, DenoiseError>
{
    validate_image(image, width, height, channels)?;

    let levels = executable_levels(width, height, params.levels);
    log::debug!("denoising {}x{} image, {} channel(s), {}/{} level(s), threshold {}, {:?}",
                width, height, channels, levels, params.levels, params.threshold, params.policy);

    let mut fields = split_channels(image, width, height, channels);
    let per_channel = denoise_fields(&mut fields, params);
    for (c, zeroed) in per_channel.iter().enumerate()
    {
        log::debug!("channel {}: zeroed {} detail coefficient(s)", c, zeroed);
    }

    let zeroed_coefficients: usize = per_channel.iter().sum();
    let clamped_samples = merge_channels(&fields, image);

    log::debug!("zeroed {} detail coefficient(s), clamped {} sample(s)", zeroed_coefficients, clamped_samples);

    return Ok(DenoiseStats { levels, zeroed_coefficients, clamped_samples });
}

/// Zeroed coefficient count for each channel, in channel order.
#[cfg(not(feature = "parallel"))]
pub fn denoise_fields(fields: &mut [ScalarField], params: &DenoiseParams) -> Vec<usize>
{
    return fields.iter_mut().map(|field| denoise_channel(field, params)).collect();
}

/// Zeroed coefficient count for each channel, in channel order.
#[cfg(feature = "parallel")]
pub fn denoise_fields(fields: &mut [ScalarField], params: &DenoiseParams) -> Vec<usize>
{
    use rayon::prelude::*;
    return fields.par_iter_mut().map(|field| denoise_channel(field, params)).collect();
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::wavelet::tests::{assert_close, noisy_field};

    fn nonzero_details(field: &ScalarField, levels: u32) -> usize
    {
        let mut count = 0;
        for level in 0..levels
        {
            let region = Region::for_level(field.width(), field.height(), level);
            region.for_each_detail(|x, y| {
                if field.at(x, y) != 0.0 { count += 1; }
            });
        }
        return count;
    }

    fn noisy_image(width: usize, height: usize, channels: usize, seed: u32) -> Vec<u8>
    {
        let field = noisy_field(width * channels, height, seed);
        return field.data().iter().map(|v| *v as u8).collect();
    }

    #[test]
    fn thresholding_is_idempotent()
    {
        for policy in [ThresholdPolicy::OutermostLevel, ThresholdPolicy::AllLevels]
        {
            let mut field = noisy_field(16, 16, 1);
            let levels = haar_forward(&mut field, 2);

            threshold_detail_coefficients(&mut field, levels, 20.0, policy);
            let once = field.clone();
            let zeroed_again = threshold_detail_coefficients(&mut field, levels, 20.0, policy);
            assert_eq!(field, once);
            assert_eq!(zeroed_again, 0);
        }
    }

    #[test]
    fn higher_threshold_never_adds_coefficients()
    {
        let mut transformed = noisy_field(32, 32, 2);
        let levels = haar_forward(&mut transformed, 2);

        for policy in [ThresholdPolicy::OutermostLevel, ThresholdPolicy::AllLevels]
        {
            let mut prev = usize::MAX;
            for threshold in [0.0, 1.0, 5.0, 10.0, 40.0, 100.0, 1000.0]
            {
                let mut field = transformed.clone();
                threshold_detail_coefficients(&mut field, levels, threshold, policy);
                let count = nonzero_details(&field, levels);
                assert!(count <= prev, "{:?}: threshold {} kept {} > {}", policy, threshold, count, prev);
                prev = count;
            }
        }
    }

    #[test]
    fn outermost_policy_leaves_inner_levels_alone()
    {
        let mut field = noisy_field(16, 16, 4);
        let levels = haar_forward(&mut field, 2);
        let before = field.clone();

        threshold_detail_coefficients(&mut field, levels, 1.0e6, ThresholdPolicy::OutermostLevel);

        let outer = Region::for_level(16, 16, 0);
        for y in 0..16
        {
            for x in 0..16
            {
                if outer.is_detail(x, y) {
                    assert_eq!(field.at(x, y), 0.0);
                } else {
                    assert_eq!(field.at(x, y), before.at(x, y));
                }
            }
        }
    }

    #[test]
    fn all_levels_policy_keeps_only_the_coarse_band()
    {
        let mut field = noisy_field(16, 16, 5);
        let levels = haar_forward(&mut field, 2);
        let before = field.clone();

        threshold_detail_coefficients(&mut field, levels, 1.0e6, ThresholdPolicy::AllLevels);

        for y in 0..16
        {
            for x in 0..16
            {
                if x < 4 && y < 4 {
                    assert_eq!(field.at(x, y), before.at(x, y));
                } else {
                    assert_eq!(field.at(x, y), 0.0);
                }
            }
        }
    }

    #[test]
    fn large_coefficients_survive()
    {
        let mut field = ScalarField::new(4, 4);
        field.set(3, 3, -50.0);
        field.set(2, 0, 4.0);
        let zeroed = threshold_level(&mut field, 0, 5.0);
        assert_eq!(zeroed, 1);
        assert_eq!(field.at(3, 3), -50.0);
        assert_eq!(field.at(2, 0), 0.0);
    }

    #[test]
    fn negative_threshold_zeroes_nothing()
    {
        let mut field = noisy_field(8, 8, 6);
        let levels = haar_forward(&mut field, 2);
        let before = field.clone();
        assert_eq!(threshold_detail_coefficients(&mut field, levels, -3.0, ThresholdPolicy::AllLevels), 0);
        assert_eq!(field, before);
    }

    #[test]
    fn constant_channel_is_reproduced()
    {
        let mut field = ScalarField::filled(4, 4, 100.0);
        let zeroed = denoise_channel(&mut field, &DenoiseParams::default());
        assert_eq!(zeroed, 0);
        assert_close(&field, &ScalarField::filled(4, 4, 100.0), 1e-5);
    }

    #[test]
    fn zero_threshold_channel_is_identity()
    {
        let original = noisy_field(24, 12, 8);
        let mut field = original.clone();
        let params = DenoiseParams { threshold: 0.0, ..Default::default() };
        denoise_channel(&mut field, &params);
        assert_close(&field, &original, 1e-4);
    }

    #[test]
    fn zero_threshold_image_is_identity()
    {
        let original = noisy_image(20, 14, 4, 9);
        let mut image = original.clone();
        let params = DenoiseParams { threshold: 0.0, levels: 3, policy: ThresholdPolicy::AllLevels };
        let stats = denoise_image(&mut image, 20, 14, 4, &params).unwrap();
        assert_eq!(image, original);
        assert_eq!(stats.levels, 3);
        assert_eq!(stats.zeroed_coefficients, 0);
        assert_eq!(stats.clamped_samples, 0);
    }

    #[test]
    fn black_image_stays_black()
    {
        let mut image = vec![0u8; 2 * 2];
        denoise_image(&mut image, 2, 2, 1, &DenoiseParams::default()).unwrap();
        assert_eq!(image, vec![0u8; 4]);
    }

    #[test]
    fn single_pixel_is_returned_exactly()
    {
        let mut image = vec![3u8, 250, 17, 1];
        let params = DenoiseParams { threshold: 100.0, ..Default::default() };
        let stats = denoise_image(&mut image, 1, 1, 4, &params).unwrap();
        assert_eq!(image, vec![3u8, 250, 17, 1]);
        assert_eq!(stats.levels, 0);
    }

    #[test]
    fn heavy_thresholding_smooths_noise()
    {
        let (width, height) = (32, 32);
        let original = noisy_image(width, height, 1, 10);
        let mut image = original.clone();
        let params = DenoiseParams { threshold: 1.0e4, levels: 2, policy: ThresholdPolicy::OutermostLevel };
        let stats = denoise_image(&mut image, width, height, 1, &params).unwrap();
        assert!(stats.zeroed_coefficients > 0);

        // With all level-0 detail gone, each 2x2 block collapses to its mean.
        for by in 0..height / 2
        {
            for bx in 0..width / 2
            {
                let idx = |x: usize, y: usize| y * width + x;
                let (x, y) = (bx * 2, by * 2);
                let block = [original[idx(x, y)], original[idx(x + 1, y)], original[idx(x, y + 1)], original[idx(x + 1, y + 1)]];
                let mean = block.iter().map(|v| *v as f32).sum::<f32>() / 4.0;
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)]
                {
                    let got = image[idx(x + dx, y + dy)] as f32;
                    assert!((got - mean).abs() <= 1.0, "block ({}, {}): {} vs mean {}", bx, by, got, mean);
                }
            }
        }
    }

    #[test]
    fn channels_are_denoised_independently()
    {
        let (width, height) = (16, 8);
        let interleaved = noisy_image(width, height, 3, 12);
        let mut image = interleaved.clone();
        let params = DenoiseParams { threshold: 30.0, ..Default::default() };
        denoise_image(&mut image, width, height, 3, &params).unwrap();

        for c in 0..3
        {
            let mut single: Vec<u8> = interleaved.iter().skip(c).step_by(3).copied().collect();
            denoise_image(&mut single, width, height, 1, &params).unwrap();
            let from_multi: Vec<u8> = image.iter().skip(c).step_by(3).copied().collect();
            assert_eq!(single, from_multi, "channel {}", c);
        }
    }

    #[test]
    fn per_channel_counts_follow_channel_order()
    {
        let (width, height) = (16, 16);
        let flat = ScalarField::filled(width, height, 40.0);
        let noisy = noisy_field(width, height, 13);
        let mut fields = vec![flat.clone(), noisy.clone(), flat];
        let params = DenoiseParams { threshold: 50.0, ..Default::default() };

        let counts = denoise_fields(&mut fields, &params);
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[0], 0);
        assert_eq!(counts[2], 0);

        let mut single = noisy;
        assert_eq!(counts[1], denoise_channel(&mut single, &params));
        assert!(counts[1] > 0);
        assert_eq!(fields[1], single);

        // The image path reports the same total.
        let interleaved = noisy_image(width, height, 1, 14);
        let mut image = interleaved.clone();
        let stats = denoise_image(&mut image, width, height, 1, &params).unwrap();
        let mut channel = split_channels(&interleaved, width, height, 1);
        assert_eq!(stats.zeroed_coefficients, denoise_fields(&mut channel, &params).iter().sum::<usize>());
    }

    #[test]
    fn rejects_invalid_dimensions()
    {
        let mut image = vec![0u8; 16];
        let params = DenoiseParams::default();
        assert_eq!(denoise_image(&mut image, 0, 4, 4, &params),
                   Err(DenoiseError::InvalidDimensions { width: 0, height: 4, channels: 4 }));
        assert_eq!(denoise_image(&mut image, 4, 4, 0, &params),
                   Err(DenoiseError::InvalidDimensions { width: 4, height: 4, channels: 0 }));
        assert!(matches!(denoise_image(&mut image, usize::MAX, 2, 4, &params),
                         Err(DenoiseError::InvalidDimensions { .. })));
    }

    #[test]
    fn rejects_mismatched_buffer_and_leaves_it_untouched()
    {
        let mut image: Vec<u8> = (0..15).collect();
        let err = denoise_image(&mut image, 2, 2, 4, &DenoiseParams::default()).unwrap_err();
        assert_eq!(err, DenoiseError::InvalidBufferSize { expected: 16, actual: 15 });
        assert_eq!(image, (0..15).collect::<Vec<u8>>());
        assert_eq!(err.to_string(), "image buffer holds 15 bytes, expected 16");
    }

    #[test]
    fn default_params_match_reference_values()
    {
        let params = DenoiseParams::default();
        assert_eq!(params.threshold, 5.0);
        assert_eq!(params.levels, 2);
        assert_eq!(params.policy, ThresholdPolicy::OutermostLevel);
    }
}
