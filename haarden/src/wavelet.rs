
// Orthonormal 2D Haar transform. Every level works in place on the top-left
// region of the field, using the full field width as stride, so after L levels
// the LL band of depth L sits in the top-left corner and the detail bands of
// every level are nested around it.

use crate::base::*;

/// Applies up to `levels` decomposition steps. Returns how many actually ran,
/// which is fewer than requested once the working region gets smaller than 2x2.
pub fn haar_forward(field: &mut ScalarField, levels: u32) -> u32
{
    let executed = executable_levels(field.width(), field.height(), levels);
    for level in 0..executed
    {
        let region = Region::for_level(field.width(), field.height(), level);
        log::debug!("haar forward: level {} on {}x{}", level, region.width, region.height);
        let stride = field.width();
        forward_level(field.data_mut(), stride, &region);
    }

    if executed < levels {
        log::trace!("haar forward: skipped {} level(s) on {}x{} field", levels - executed, field.width(), field.height());
    }

    return executed;
}

/// Exact inverse of `haar_forward` for the same `levels`, applied innermost level first.
pub fn haar_inverse(field: &mut ScalarField, levels: u32)
{
    let executed = executable_levels(field.width(), field.height(), levels);
    for level in (0..executed).rev()
    {
        let region = Region::for_level(field.width(), field.height(), level);
        log::debug!("haar inverse: level {} on {}x{}", level, region.width, region.height);
        let stride = field.width();
        inverse_level(field.data_mut(), stride, &region);
    }
}

fn forward_level(data: &mut [f32], stride: usize, region: &Region)
{
    let half_w = region.half_width();
    let half_h = region.half_height();
    let rows = region.height * stride;

    // Scratch buffers start as copies so that everything outside the
    // paired area (outer detail bands, odd trailing column/row) survives.
    let mut horiz = data[..rows].to_vec();
    for y in 0..region.paired_height()
    {
        let row = y * stride;
        for i in 0..half_w
        {
            let a = data[row + 2 * i];
            let b = data[row + 2 * i + 1];
            horiz[row + i]          = (a + b) / SQRT_2;
            horiz[row + half_w + i] = (a - b) / SQRT_2;
        }
    }

    let mut vert = horiz.clone();
    for x in 0..region.paired_width()
    {
        for j in 0..half_h
        {
            let a = horiz[(2 * j) * stride + x];
            let b = horiz[(2 * j + 1) * stride + x];
            vert[j * stride + x]            = (a + b) / SQRT_2;
            vert[(half_h + j) * stride + x] = (a - b) / SQRT_2;
        }
    }

    data[..rows].copy_from_slice(&vert);
}

fn inverse_level(data: &mut [f32], stride: usize, region: &Region)
{
    let half_w = region.half_width();
    let half_h = region.half_height();
    let rows = region.height * stride;

    // Vertical pass first, mirroring the forward order.
    let mut vert = data[..rows].to_vec();
    for x in 0..region.paired_width()
    {
        for j in 0..half_h
        {
            let avg  = data[j * stride + x];
            let diff = data[(j + half_h) * stride + x];
            vert[(2 * j) * stride + x]     = (avg + diff) / SQRT_2;
            vert[(2 * j + 1) * stride + x] = (avg - diff) / SQRT_2;
        }
    }

    let mut horiz = vert.clone();
    for y in 0..region.paired_height()
    {
        let row = y * stride;
        for i in 0..half_w
        {
            let avg  = vert[row + i];
            let diff = vert[row + half_w + i];
            horiz[row + 2 * i]     = (avg + diff) / SQRT_2;
            horiz[row + 2 * i + 1] = (avg - diff) / SQRT_2;
        }
    }

    data[..rows].copy_from_slice(&horiz);
}
