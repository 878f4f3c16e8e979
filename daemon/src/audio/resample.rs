/// Linear-interpolation resampler. Identity when the rates already match;
/// otherwise produces `floor(duration * dst_rate)` samples, within one sample
/// of the exact duration.
pub fn resample(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let target_len = (samples.len() as u64 * dst_rate as u64 / src_rate as u64) as usize;
    let mut out = Vec::with_capacity(target_len);
    let step = src_rate as f64 / dst_rate as f64;

    for i in 0..target_len {
        let pos = i as f64 * step;
        let idx = pos as usize;
        if idx + 1 < samples.len() {
            let frac = (pos - idx as f64) as f32;
            out.push(samples[idx] * (1.0 - frac) + samples[idx + 1] * frac);
        } else {
            out.push(samples[samples.len() - 1]);
        }
    }

    out
}
