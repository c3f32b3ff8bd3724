//! Frequency analysis for the recording visualizer.
//!
//! Fixed 256-point FFT over the newest captured samples, yielding 128
//! magnitude bins per frame. Magnitudes are normalized against a slowly
//! decaying running peak so bar heights stay in 0..1 across quiet and loud
//! passages.

use std::collections::VecDeque;

use spectrum_analyzer::scaling::divide_by_N;
use spectrum_analyzer::windows::hann_window;
use spectrum_analyzer::{samples_fft_to_spectrum, FrequencyLimit};

/// Analysis window size. Must stay a power of two for the FFT.
pub const FFT_SIZE: usize = 256;
/// Frequency bins per frame (below Nyquist).
pub const NUM_BINS: usize = FFT_SIZE / 2;

/// Samples retained beyond one window, absorbing bursty callback delivery.
const RING_CAPACITY: usize = FFT_SIZE * 8;

/// Decay applied to the running peak each frame.
const PEAK_DECAY: f32 = 0.985;

pub struct SpectrumAnalyzer {
    ring: VecDeque<f32>,
    sample_rate: u32,
    bins: Vec<f32>,
    peak: f32,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            ring: VecDeque::with_capacity(RING_CAPACITY),
            sample_rate: sample_rate.max(1),
            bins: vec![0.0; NUM_BINS],
            peak: 0.0,
        }
    }

    /// Append freshly captured samples, keeping only the newest window's
    /// worth of history.
    pub fn push_samples(&mut self, samples: &[f32]) {
        self.ring.extend(samples.iter().copied());
        while self.ring.len() > RING_CAPACITY {
            self.ring.pop_front();
        }
    }

    /// Recompute bin magnitudes from the newest 256-sample window.
    /// Until a full window has arrived, bins stay at zero.
    pub fn update(&mut self) -> &[f32] {
        if self.ring.len() < FFT_SIZE {
            return &self.bins;
        }

        let skip = self.ring.len() - FFT_SIZE;
        let window: Vec<f32> = self.ring.iter().skip(skip).copied().collect();
        let windowed = hann_window(&window);
        let spectrum = match samples_fft_to_spectrum(
            &windowed,
            self.sample_rate,
            FrequencyLimit::All,
            Some(&divide_by_N),
        ) {
            Ok(s) => s,
            Err(_) => return &self.bins,
        };

        let mut magnitudes = [0.0f32; NUM_BINS];
        for (i, (_, value)) in spectrum.data().iter().take(NUM_BINS).enumerate() {
            magnitudes[i] = value.val();
        }

        let frame_max = magnitudes.iter().copied().fold(0.0f32, f32::max);
        self.peak = (self.peak * PEAK_DECAY).max(frame_max).max(1e-6);
        for (bin, mag) in self.bins.iter_mut().zip(magnitudes.iter()) {
            *bin = (mag / self.peak).clamp(0.0, 1.0);
        }
        &self.bins
    }

    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    /// Forget all buffered audio and levels (used on teardown).
    pub fn reset(&mut self) {
        self.ring.clear();
        self.bins.iter_mut().for_each(|b| *b = 0.0);
        self.peak = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_silence_keeps_bins_zero() {
        let mut analyzer = SpectrumAnalyzer::new(44_100);
        analyzer.push_samples(&vec![0.0; FFT_SIZE * 2]);
        let bins = analyzer.update();
        assert_eq!(bins.len(), NUM_BINS);
        assert!(bins.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_short_input_yields_no_bins_yet() {
        let mut analyzer = SpectrumAnalyzer::new(44_100);
        analyzer.push_samples(&[0.5; 10]);
        assert!(analyzer.update().iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_tone_peaks_in_expected_bin() {
        let rate = 44_100;
        // Bin width = rate / FFT_SIZE ≈ 172 Hz; aim at bin 12.
        let target_bin = 12;
        let freq = target_bin as f32 * rate as f32 / FFT_SIZE as f32;
        let mut analyzer = SpectrumAnalyzer::new(rate);
        analyzer.push_samples(&sine(freq, rate, FFT_SIZE * 4));
        let bins = analyzer.update().to_vec();

        let loudest = bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!(
            (loudest as i32 - target_bin as i32).abs() <= 1,
            "expected energy near bin {}, got {}",
            target_bin,
            loudest
        );
        assert!(bins.iter().all(|&b| (0.0..=1.0).contains(&b)));
        // Normalization puts the dominant bin at full height.
        assert!((bins[loudest] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut analyzer = SpectrumAnalyzer::new(44_100);
        analyzer.push_samples(&sine(440.0, 44_100, FFT_SIZE * 2));
        analyzer.update();
        analyzer.reset();
        assert!(analyzer.bins().iter().all(|&b| b == 0.0));
        assert!(analyzer.update().iter().all(|&b| b == 0.0));
    }
}
