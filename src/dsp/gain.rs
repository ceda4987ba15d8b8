//! Spectral gain estimators.
//!
//! All three operate per bin on the reference spectrum against the scaled
//! noise estimate and write the `[0..K)` region of the length-`N` gain
//! vector; the noise-floor manager mirrors the symmetric half afterwards.

use crate::dsp::utils::SPECTRAL_EPS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainEstimationType {
    Wiener,
    Gates,
    GeneralizedSpectralSubtraction,
}

pub fn estimate_gain(
    kind: GainEstimationType,
    signal: &[f32],
    noise: &[f32],
    alpha: &[f32],
    beta: &[f32],
    gain: &mut [f32],
) {
    let k_len = signal.len();
    debug_assert_eq!(noise.len(), k_len);
    debug_assert_eq!(alpha.len(), k_len);
    debug_assert_eq!(beta.len(), k_len);
    debug_assert!(gain.len() >= k_len);

    match kind {
        GainEstimationType::Wiener => {
            for k in 0..k_len {
                let g = (signal[k] - alpha[k] * noise[k]).max(0.0) / (signal[k] + SPECTRAL_EPS);
                gain[k] = g.clamp(beta[k], 1.0);
            }
        }
        GainEstimationType::Gates => {
            for k in 0..k_len {
                gain[k] = if signal[k] > alpha[k] * noise[k] {
                    1.0
                } else {
                    beta[k]
                };
            }
        }
        GainEstimationType::GeneralizedSpectralSubtraction => {
            for k in 0..k_len {
                let x2 = signal[k] * signal[k];
                if x2 <= SPECTRAL_EPS {
                    gain[k] = beta[k].min(1.0);
                    continue;
                }
                let n2 = alpha[k] * noise[k] * noise[k];
                let g = ((x2 - n2) / x2).max(0.0).sqrt();
                gain[k] = g.clamp(beta[k], 1.0);
            }
        }
    }
}
