
////////
// Math

pub const SQRT_2: f32 = std::f32::consts::SQRT_2;

/// Rounds half away from zero and clamps into the displayable 8-bit range.
/// NaN maps to 0.
#[inline]
pub fn to_u8_clamped(value: f32) -> u8
{
    if value.is_nan() { return 0; }
    return value.round().clamp(0.0, 255.0) as u8;
}

////////
// Scalar fields

/// Row-major grid of float samples. The stride is always `width`, and it
/// stays fixed across decomposition levels: sub-bands of deeper levels are
/// stored as shrinking top-left sub-rectangles of the same buffer.
/// Fields are private so `data.len() == width * height` always holds.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarField
{
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl ScalarField
{
    pub fn new(width: usize, height: usize) -> Self
    {
        return Self { width, height, data: vec![0.0; width * height] };
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Self
    {
        assert!(data.len() == width * height, "Field data must hold exactly width*height samples");
        return Self { width, height, data };
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Self
    {
        return Self { width, height, data: vec![value; width * height] };
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32
    {
        return self.data[y * self.width + x];
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32)
    {
        self.data[y * self.width + x] = value;
    }

    #[inline]
    pub fn width(&self) -> usize  { return self.width; }
    #[inline]
    pub fn height(&self) -> usize { return self.height; }

    #[inline]
    pub fn data(&self) -> &[f32]
    {
        return &self.data;
    }

    /// Samples can be changed but not resized.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32]
    {
        return &mut self.data;
    }

    pub fn into_vec(self) -> Vec<f32>
    {
        return self.data;
    }
}

////////
// Decomposition regions

/// Working area of one decomposition level: the top-left `width x height`
/// rectangle of the full field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region
{
    pub level: u32,
    pub width: usize,
    pub height: usize,
}

impl Region
{
    /// Region processed at `level` for a field of the given size.
    pub fn for_level(field_width: usize, field_height: usize, level: u32) -> Self
    {
        let width  = field_width.checked_shr(level).unwrap_or(0);
        let height = field_height.checked_shr(level).unwrap_or(0);
        return Self { level, width, height };
    }

    /// A level only runs while both sides can still be halved.
    #[inline]
    pub fn can_decompose(&self) -> bool
    {
        return self.width >= 2 && self.height >= 2;
    }

    /// Number of column (or row) pairs, which is also the size of the
    /// average band along that axis.
    #[inline]
    pub fn half_width(&self) -> usize  { return self.width / 2; }
    #[inline]
    pub fn half_height(&self) -> usize { return self.height / 2; }

    /// Extent actually covered by pairs. An odd trailing column/row is
    /// outside of it and never touched.
    #[inline]
    pub fn paired_width(&self) -> usize  { return self.half_width() * 2; }
    #[inline]
    pub fn paired_height(&self) -> usize { return self.half_height() * 2; }

    /// True for the LH, HL and HH bands of this level.
    #[inline]
    pub fn is_detail(&self, x: usize, y: usize) -> bool
    {
        if x >= self.paired_width() || y >= self.paired_height() { return false; }
        return x >= self.half_width() || y >= self.half_height();
    }

    pub fn for_each_detail<F: FnMut(usize, usize)>(&self, mut f: F)
    {
        for y in 0..self.paired_height()
        {
            // Rows in the top half only have detail samples right of the LL band.
            let start_x = if y < self.half_height() { self.half_width() } else { 0 };
            for x in start_x..self.paired_width()
            {
                f(x, y);
            }
        }
    }
}

/// Number of levels that will actually run out of the `requested` ones.
pub fn executable_levels(width: usize, height: usize, requested: u32) -> u32
{
    let mut levels = 0;
    while levels < requested && Region::for_level(width, height, levels).can_decompose()
    {
        levels += 1;
    }
    return levels;
}
