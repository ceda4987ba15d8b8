//! Gain floor and residual whitening weights.
//!
//! The floor keeps the attenuation ceiling the user asked for; the
//! whitening weights tilt that floor so the residual noise spectrum
//! flattens out, hiding colored musical noise. A right-half Hamming taper
//! rolls the whitening off toward Nyquist. The manager also completes the
//! symmetric length-`N` gain layout once the `[0..K)` region is final.

use crate::dsp::utils::SPECTRAL_EPS;
use std::f32::consts::PI;

pub struct NoiseFloorManager {
    taper: Vec<f32>,
    whitening: Vec<f32>,
}

impl NoiseFloorManager {
    pub fn new(real_spectrum_size: usize) -> Self {
        let denom = (real_spectrum_size.max(2) - 1) as f32;
        let taper = (0..real_spectrum_size)
            .map(|k| 0.54 + 0.46 * (PI * k as f32 / denom).cos())
            .collect();
        Self {
            taper,
            whitening: vec![1.0; real_spectrum_size],
        }
    }

    /// Applies the per-bin gain floor to the `[0..K)` region:
    /// `gain = floor + (1 - floor) * gain` with
    /// `floor = min(reduction * w, 1)`.
    pub fn apply_floor(
        &mut self,
        gain: &mut [f32],
        noise: &[f32],
        reduction: f32,
        whitening_factor: f32,
    ) {
        let k_len = self.taper.len();
        debug_assert!(gain.len() >= k_len);
        debug_assert_eq!(noise.len(), k_len);

        if whitening_factor > 0.0 {
            let phi = whitening_factor.clamp(0.0, 1.0);
            let noise_peak = noise
                .iter()
                .fold(SPECTRAL_EPS, |acc, &v| acc.max(v));
            for k in 0..k_len {
                self.whitening[k] =
                    (noise_peak / noise[k].max(SPECTRAL_EPS)).powf(phi) * self.taper[k];
            }
        } else {
            self.whitening.fill(1.0);
        }

        for k in 0..k_len {
            let floor = (reduction * self.whitening[k]).min(1.0);
            gain[k] = floor + (1.0 - floor) * gain[k];
        }
    }

    /// Mirrors the computed `[0..K)` gains into the symmetric half so the
    /// vector can multiply a half-complex spectrum directly.
    pub fn mirror(gain: &mut [f32]) {
        let n = gain.len();
        for k in 1..n / 2 {
            gain[n - k] = gain[k];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unity_reduction_forces_passthrough() {
        let mut mgr = NoiseFloorManager::new(9);
        let mut gain = vec![0.2f32; 16];
        let noise = vec![0.5f32; 9];
        mgr.apply_floor(&mut gain, &noise, 1.0, 0.0);
        for &g in gain[..9].iter() {
            assert!((g - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_floor_lifts_but_never_lowers() {
        let mut mgr = NoiseFloorManager::new(9);
        let mut gain = vec![0.0f32; 16];
        let noise = vec![0.5f32; 9];
        mgr.apply_floor(&mut gain, &noise, 0.1, 0.0);
        for &g in gain[..9].iter() {
            assert!((g - 0.1).abs() < 1e-6);
        }

        let mut high = vec![0.9f32; 16];
        mgr.apply_floor(&mut high, &noise, 0.1, 0.0);
        for &g in high[..9].iter() {
            assert!(g >= 0.9);
        }
    }

    #[test]
    fn test_whitening_raises_floor_in_noise_valleys() {
        let mut mgr = NoiseFloorManager::new(9);
        // Peaked noise at low bins, weak at high bins.
        let noise: Vec<f32> = (0..9).map(|k| if k < 3 { 1.0 } else { 0.01 }).collect();
        let mut gain = vec![0.0f32; 16];
        mgr.apply_floor(&mut gain, &noise, 0.01, 1.0);
        // Valley bins get a higher floor than the peak bins (before the
        // taper pulls the very top back down).
        assert!(gain[4] > gain[1], "{} vs {}", gain[4], gain[1]);
    }

    #[test]
    fn test_mirror_completes_symmetric_layout() {
        let mut gain = vec![0.0f32; 16];
        for k in 0..9 {
            gain[k] = k as f32;
        }
        NoiseFloorManager::mirror(&mut gain);
        for k in 1..8 {
            assert_eq!(gain[16 - k], gain[k]);
        }
        assert_eq!(gain[8], 8.0);
    }
}
