//! User-visible parameter block.
//!
//! Accepted at any time through `load_parameters`; values outside their
//! documented ranges are clipped internally rather than rejected. Fields
//! that only apply to one variant are ignored by the others.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DenoiseParameters {
    /// 0 = reduce, >= 1 = learn all three profile modes simultaneously.
    pub learn_noise: i32,
    /// Profile used while reducing: 1 = rolling mean, 2 = median, 3 = max.
    pub noise_reduction_mode: i32,
    /// Output the suppressed component instead of the cleaned one.
    pub residual_listen: bool,
    /// Attenuation ceiling in dB, 0..40.
    pub reduction_amount: f32,
    /// Percent, 0..100. Time smoothing for the profile/adaptive variants,
    /// NLM h parameter for the 2D variant.
    pub smoothing_factor: f32,
    /// Residual whitening intensity in percent, 0..100. 0 disables.
    pub whitening_factor: f32,
    /// 0 = a-posteriori SNR, 1 = critical-band SNR, 2 = masking thresholds.
    pub noise_scaling_type: i32,
    /// dB added to the default oversubtraction.
    pub noise_rescale: f32,
    /// Post-filter engagement threshold in dB.
    pub post_filter_threshold: f32,
    /// Adaptive tracker: 0 = SPP-MMSE, 1 = Brandt, 2 = Martin. Any other
    /// value keeps the construction default (Louizou).
    pub noise_estimation_method: i32,
    /// 2D only: run the adaptive tracker on top of the manual profile.
    pub adaptive_noise: bool,
    /// Transient-aware time smoothing.
    pub transient_protection: bool,
}

impl Default for DenoiseParameters {
    fn default() -> Self {
        Self {
            learn_noise: 0,
            noise_reduction_mode: 1,
            residual_listen: false,
            reduction_amount: 10.0,
            smoothing_factor: 0.0,
            whitening_factor: 0.0,
            noise_scaling_type: 0,
            noise_rescale: 0.0,
            post_filter_threshold: -10.0,
            noise_estimation_method: 3,
            adaptive_noise: true,
            transient_protection: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_describe_reduce_mode() {
        let p = DenoiseParameters::default();
        assert_eq!(p.learn_noise, 0);
        assert_eq!(p.noise_reduction_mode, 1);
        assert!(!p.residual_listen);
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut p = DenoiseParameters::default();
        p.reduction_amount = 24.0;
        p.noise_estimation_method = 2;
        let json = serde_json::to_string(&p).unwrap();
        let back: DenoiseParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
