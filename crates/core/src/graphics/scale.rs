//! Integer nearest-neighbour scaling for presented frames.

use crate::types::Frame;

/// Largest supported scale factor.
pub const MAX_SCALE: u32 = 4;

/// Scale a frame up by an integer factor, duplicating each pixel into a
/// `factor` x `factor` block.
///
/// The factor is clamped to `1..=MAX_SCALE`; a factor of 1 returns a copy.
pub fn scale_nearest(input: &Frame, factor: u32) -> Frame {
    let factor = factor.clamp(1, MAX_SCALE);
    if factor == 1 {
        return input.clone();
    }

    let mut output = Frame::new(input.width * factor, input.height * factor);
    let out_width = output.width as usize;
    let f = factor as usize;

    for (y, row) in input.pixels.chunks(input.width as usize).enumerate() {
        for (x, &pixel) in row.iter().enumerate() {
            for dy in 0..f {
                let start = (y * f + dy) * out_width + x * f;
                output.pixels[start..start + f].fill(pixel);
            }
        }
    }

    output
}
