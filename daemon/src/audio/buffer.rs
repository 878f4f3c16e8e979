use super::rms;

/// Bounded trailing window of resampled mono audio, handed to batch
/// transcription. New samples append at the back; anything past the cap is
/// evicted from the front, so `len() <= capacity()` always holds.
pub struct RollingBuffer {
    samples: Vec<f32>,
    capacity: usize,
}

impl RollingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Capacity for `seconds` of audio at `sample_rate`.
    pub fn with_window(seconds: u32, sample_rate: u32) -> Self {
        Self::new((seconds as usize) * (sample_rate as usize))
    }

    pub fn extend(&mut self, chunk: &[f32]) {
        self.samples.extend_from_slice(chunk);
        if self.samples.len() > self.capacity {
            let excess = self.samples.len() - self.capacity;
            self.samples.drain(..excess);
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_buffer_appends() {
        let mut buffer = RollingBuffer::new(100);
        buffer.extend(&[0.1; 40]);
        assert_eq!(buffer.len(), 40);
        buffer.extend(&[0.2; 40]);
        assert_eq!(buffer.len(), 80);
    }

    #[test]
    fn test_rolling_buffer_never_exceeds_capacity() {
        let mut buffer = RollingBuffer::new(100);
        for _ in 0..10 {
            buffer.extend(&[0.1; 37]);
            assert!(buffer.len() <= 100);
        }
        assert_eq!(buffer.len(), 100);
    }

    #[test]
    fn test_rolling_buffer_evicts_oldest() {
        let mut buffer = RollingBuffer::new(4);
        buffer.extend(&[1.0, 2.0, 3.0, 4.0]);
        buffer.extend(&[5.0, 6.0]);
        assert_eq!(buffer.samples(), &[3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_rolling_buffer_oversized_chunk() {
        let mut buffer = RollingBuffer::new(3);
        buffer.extend(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buffer.samples(), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_rolling_buffer_with_window() {
        let buffer = RollingBuffer::with_window(3, 16000);
        assert_eq!(buffer.capacity(), 48000);
    }

    #[test]
    fn test_rolling_buffer_clear() {
        let mut buffer = RollingBuffer::new(10);
        buffer.extend(&[0.5; 8]);
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_rolling_buffer_rms() {
        let mut buffer = RollingBuffer::new(10);
        buffer.extend(&[0.5; 10]);
        assert!((buffer.rms() - 0.5).abs() < 1e-6);
    }
}
