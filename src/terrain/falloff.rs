//! Edge falloff mask for island-shaped terrain

use super::noise_field::HeightField;

/// Curve steepness
const FALLOFF_A: f32 = 3.0;
/// Curve midpoint shift
const FALLOFF_B: f32 = 2.2;

/// Evaluate the falloff curve for `v` in `[0, 1]`
fn evaluate(v: f32) -> f32 {
    let a = v.powf(FALLOFF_A);
    a / (a + (FALLOFF_B - FALLOFF_B * v).powf(FALLOFF_A))
}

/// Generate a `size` x `size` falloff mask.
///
/// Values are ~0 at the center and reach 1 on the outer edges. The mask
/// depends only on `size`.
pub fn generate(size: usize) -> HeightField {
    let size = size.max(1);
    let span = (size - 1).max(1) as f32;

    HeightField::from_fn(size, size, |x, y| {
        let nx = x as f32 / span * 2.0 - 1.0;
        let ny = y as f32 / span * 2.0 - 1.0;
        evaluate(nx.abs().max(ny.abs()))
    })
}

/// Subtract `mask` from `field` in place, clamping to `[0, 1]`.
///
/// Cells outside the mask's extent are left untouched.
pub fn apply(field: &mut HeightField, mask: &HeightField) {
    let width = field.width().min(mask.width());
    let height = field.height().min(mask.height());
    for y in 0..height {
        for x in 0..width {
            field[(x, y)] = (field[(x, y)] - mask[(x, y)]).clamp(0.0, 1.0);
        }
    }
}
