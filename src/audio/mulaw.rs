//! µ-law companding.
//!
//! The model works on 8-bit µ-law codes. [`encode`] maps an amplitude in
//! `[-1, 1]` to a code in `[-128, 127]`, [`decode`] maps a code back to an
//! amplitude. Codes are carried through the model as `code / 128`, and the
//! decoder's 256 output classes map back onto that range via
//! [`dequantize_class`].

/// Compression parameter (8-bit µ-law).
pub const MU: f32 = 255.0;

/// Divisor between µ-law codes and the normalized model input.
pub const QUANTIZATION_SCALE: f32 = 128.0;

/// Number of decoder output classes.
pub const NUM_CLASSES: usize = 256;

/// µ-law encode a single amplitude into an integer code (returned as `f32`).
pub fn encode(x: f32) -> f32 {
    if x == 0.0 {
        return 0.0;
    }
    let magnitude = (1.0 + MU * x.abs()).ln() / (1.0 + MU).ln();
    let code = (x.signum() * magnitude * (MU / 2.0).ceil()).floor();
    code.clamp(-QUANTIZATION_SCALE, QUANTIZATION_SCALE - 1.0)
}

/// Invert [`encode`], reconstructing the amplitude at the centre of the code's
/// quantization bin.
pub fn decode(code: f32) -> f32 {
    if code == 0.0 {
        return 0.0;
    }
    let y = (code + 0.5) * 2.0 / (MU + 1.0);
    y.signum() / MU * ((1.0 + MU).powf(y.abs()) - 1.0)
}

/// Encode and normalize a slice of amplitudes into model input values.
pub fn encode_normalized(samples: &[f32]) -> Vec<f32> {
    samples
        .iter()
        .map(|&s| encode(s) / QUANTIZATION_SCALE)
        .collect()
}

/// Turn normalized model values back into amplitudes.
pub fn decode_normalized(values: &[f32]) -> Vec<f32> {
    values
        .iter()
        .map(|&v| decode((v * QUANTIZATION_SCALE).round()))
        .collect()
}

/// Map a decoder class index onto the normalized value range.
pub fn dequantize_class(class: u32) -> f32 {
    (class as f32 - QUANTIZATION_SCALE) / QUANTIZATION_SCALE
}

/// Map a normalized value onto its decoder class index.
pub fn quantize_class(value: f32) -> u32 {
    (value * QUANTIZATION_SCALE + QUANTIZATION_SCALE)
        .round()
        .clamp(0.0, (NUM_CLASSES - 1) as f32) as u32
}
