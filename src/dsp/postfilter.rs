//! SNR-adaptive moving average over the gain spectrum.
//!
//! Isolated gain peaks over an otherwise suppressed spectrum are what the
//! ear hears as musical noise. When the frame's clean-over-noisy power
//! ratio is poor, the gain curve is averaged with a window that widens as
//! the ratio drops; clean frames pass through untouched.

use crate::dsp::utils::SPECTRAL_EPS;

const POSTFILTER_SCALE: f32 = 10.0;
const PRESERVE_MINIMUM_GAIN: bool = true;

pub struct PostFilter {
    scratch: Vec<f32>,
}

impl PostFilter {
    pub fn new(real_spectrum_size: usize) -> Self {
        Self {
            scratch: vec![0.0; real_spectrum_size],
        }
    }

    /// Filters the `[0..K)` gain region in place. `snr_threshold` is the
    /// linear power-ratio threshold, `gain_floor` the scalar reduction
    /// coefficient re-applied after averaging.
    pub fn apply(
        &mut self,
        gain: &mut [f32],
        signal: &[f32],
        snr_threshold: f32,
        gain_floor: f32,
    ) {
        let k_len = self.scratch.len();
        debug_assert!(gain.len() >= k_len);
        debug_assert_eq!(signal.len(), k_len);

        // `signal` is a power spectrum, so the clean-over-noisy power
        // ratio applies the gain squared.
        let mut clean_power = 0.0;
        let mut noisy_power = 0.0;
        for k in 0..k_len {
            clean_power += signal[k] * gain[k] * gain[k];
            noisy_power += signal[k];
        }
        let zeta = clean_power / (noisy_power + SPECTRAL_EPS);

        if zeta < snr_threshold {
            let width =
                2 * (POSTFILTER_SCALE * (1.0 - zeta / snr_threshold)).round() as usize + 1;
            let half = width / 2;
            self.scratch[..k_len].copy_from_slice(&gain[..k_len]);

            for k in 0..k_len {
                let mut acc = 0.0;
                for offset in 0..width {
                    // Symmetric edge clamping.
                    let idx = (k + offset).saturating_sub(half).min(k_len - 1);
                    acc += self.scratch[idx];
                }
                let averaged = acc / width as f32;
                gain[k] = if PRESERVE_MINIMUM_GAIN {
                    averaged.min(self.scratch[k])
                } else {
                    averaged
                };
            }
        }

        let floor = gain_floor.min(1.0);
        for g in gain[..k_len].iter_mut() {
            *g = g.max(floor);
        }
    }
}
