//! Per-bin oversubtraction / undersubtraction scaling criteria.
//!
//! Maps an SNR-like measurement to the (alpha, beta) pair the gain
//! estimators consume. Three strategies: one global a-posteriori SNR,
//! the same mapping per critical band, and a psychoacoustic variant that
//! compares noise against masking thresholds so inaudible noise is
//! spared full subtraction.

use crate::dsp::critical_bands::{BandScale, CriticalBands};
use crate::dsp::masking::MaskingEstimator;
use crate::dsp::utils::{power_to_db, SPECTRAL_EPS};

pub const ALPHA_MIN: f32 = 1.0;
pub const ALPHA_MAX: f32 = 6.0;
pub const BETA_MIN: f32 = 0.0;
pub const BETA_MAX: f32 = 0.01;

const LOWER_SNR_DB: f32 = 0.0;
const HIGHER_SNR_DB: f32 = 20.0;

/// Fraction of the oversubtraction range still applied to fully masked
/// noise.
const ELASTIC_PROTECTION_FACTOR: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseScalingType {
    APosterioriSnr,
    CriticalBandsSnr,
    MaskingThresholds,
}

impl NoiseScalingType {
    /// Parameter-block encoding: 0, 1, 2. Out-of-range clips to 0.
    pub fn from_int(v: i32) -> Self {
        match v {
            1 => Self::CriticalBandsSnr,
            2 => Self::MaskingThresholds,
            _ => Self::APosterioriSnr,
        }
    }
}

/// SNR-driven interpolation between full subtraction at low SNR and
/// minimal subtraction at high SNR.
fn scaling_from_snr(snr_db: f32, over: f32, under: f32) -> (f32, f32) {
    if snr_db <= LOWER_SNR_DB {
        (over, under)
    } else if snr_db >= HIGHER_SNR_DB {
        (ALPHA_MIN, BETA_MIN)
    } else {
        let t = (snr_db - LOWER_SNR_DB) / (HIGHER_SNR_DB - LOWER_SNR_DB);
        (
            over + t * (ALPHA_MIN - over),
            under + t * (BETA_MIN - under),
        )
    }
}

/// Noise-to-mask-ratio mapping: masked noise mostly bypasses
/// oversubtraction, audible noise receives it in full.
fn scaling_from_nmr(nmr_db: f32, over: f32, under: f32) -> (f32, f32) {
    let masked_alpha = ALPHA_MIN + (over - ALPHA_MIN) * ELASTIC_PROTECTION_FACTOR;
    if nmr_db <= LOWER_SNR_DB {
        (masked_alpha, BETA_MIN)
    } else if nmr_db >= HIGHER_SNR_DB {
        (over, under)
    } else {
        let t = (nmr_db - LOWER_SNR_DB) / (HIGHER_SNR_DB - LOWER_SNR_DB);
        (
            masked_alpha + t * (over - masked_alpha),
            BETA_MIN + t * (under - BETA_MIN),
        )
    }
}

pub struct NoiseScalingCriteria {
    bands: CriticalBands,
    masking: MaskingEstimator,

    band_signal: Vec<f32>,
    band_noise: Vec<f32>,
    clean_scratch: Vec<f32>,
    thresholds: Vec<f32>,

    alpha: Vec<f32>,
    beta: Vec<f32>,
}

impl NoiseScalingCriteria {
    pub fn new(
        sample_rate: u32,
        fft_size: usize,
        band_scale: BandScale,
        masking_absolute_floor: bool,
    ) -> Self {
        let real_size = fft_size / 2 + 1;
        let bands = CriticalBands::new(band_scale, sample_rate, fft_size);
        let band_count = bands.number_of_bands();
        Self {
            bands,
            masking: MaskingEstimator::new(sample_rate, fft_size, masking_absolute_floor),
            band_signal: vec![0.0; band_count],
            band_noise: vec![0.0; band_count],
            clean_scratch: vec![0.0; real_size],
            thresholds: vec![0.0; real_size],
            alpha: vec![ALPHA_MIN; real_size],
            beta: vec![BETA_MIN; real_size],
        }
    }

    /// Fills the per-bin alpha/beta vectors for one frame.
    pub fn compute(
        &mut self,
        signal: &[f32],
        noise: &[f32],
        over: f32,
        under: f32,
        kind: NoiseScalingType,
    ) {
        debug_assert_eq!(signal.len(), self.alpha.len());
        debug_assert_eq!(noise.len(), self.alpha.len());

        let over = over.clamp(ALPHA_MIN, ALPHA_MAX);
        let under = under.clamp(BETA_MIN, BETA_MAX);

        match kind {
            NoiseScalingType::APosterioriSnr => {
                let sig: f32 = signal.iter().sum();
                let noi: f32 = noise.iter().sum();
                let snr_db = power_to_db(sig / (noi + SPECTRAL_EPS));
                let (a, b) = scaling_from_snr(snr_db, over, under);
                self.alpha.fill(a);
                self.beta.fill(b);
            }
            NoiseScalingType::CriticalBandsSnr => {
                self.bands
                    .compute_critical_bands_spectrum(signal, &mut self.band_signal);
                self.bands
                    .compute_critical_bands_spectrum(noise, &mut self.band_noise);
                for band in 0..self.bands.number_of_bands() {
                    let snr_db = power_to_db(
                        self.band_signal[band] / (self.band_noise[band] + SPECTRAL_EPS),
                    );
                    let (a, b) = scaling_from_snr(snr_db, over, under);
                    let idx = self.bands.band_indexes(band);
                    for k in idx.start..idx.end {
                        self.alpha[k] = a;
                        self.beta[k] = b;
                    }
                }
            }
            NoiseScalingType::MaskingThresholds => {
                for k in 0..signal.len() {
                    self.clean_scratch[k] = (signal[k] - noise[k]).max(0.0);
                }
                self.masking
                    .compute(&self.clean_scratch, &mut self.thresholds);
                for k in 0..signal.len() {
                    let nmr_db = power_to_db(noise[k] / (self.thresholds[k] + SPECTRAL_EPS));
                    let (a, b) = scaling_from_nmr(nmr_db, over, under);
                    self.alpha[k] = a;
                    self.beta[k] = b;
                }
            }
        }
    }

    pub fn alpha(&self) -> &[f32] {
        &self.alpha
    }

    pub fn beta(&self) -> &[f32] {
        &self.beta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snr_mapping_endpoints() {
        assert_eq!(scaling_from_snr(-5.0, 4.0, 0.01), (4.0, 0.01));
        assert_eq!(scaling_from_snr(25.0, 4.0, 0.01), (ALPHA_MIN, BETA_MIN));
        let (a, b) = scaling_from_snr(10.0, 4.0, 0.01);
        assert!((a - 2.5).abs() < 1e-5);
        assert!((b - 0.005).abs() < 1e-6);
    }

    #[test]
    fn test_nmr_mapping_protects_masked_noise() {
        let over = 5.0;
        let (masked_alpha, masked_beta) = scaling_from_nmr(-10.0, over, 0.01);
        let (audible_alpha, _) = scaling_from_nmr(30.0, over, 0.01);
        assert!(masked_alpha < audible_alpha);
        assert!(masked_alpha >= ALPHA_MIN);
        assert_eq!(masked_beta, BETA_MIN);
        assert_eq!(audible_alpha, over);
    }

    #[test]
    fn test_global_strategy_is_uniform() {
        let mut c = NoiseScalingCriteria::new(44100, 256, BandScale::Bark, true);
        let signal = vec![1.0f32; 129];
        let noise = vec![1.0f32; 129];
        c.compute(&signal, &noise, 4.0, 0.01, NoiseScalingType::APosterioriSnr);
        assert!(c.alpha().iter().all(|&a| (a - c.alpha()[0]).abs() < 1e-7));
        // Equal energies -> 0 dB -> maximum oversubtraction.
        assert!((c.alpha()[0] - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_band_strategy_varies_per_band() {
        let mut c = NoiseScalingCriteria::new(44100, 512, BandScale::Bark, true);
        let real = 257;
        // Clean low band, noisy high band.
        let signal: Vec<f32> = (0..real).map(|k| if k < 20 { 10.0 } else { 0.1 }).collect();
        let noise = vec![0.1f32; real];
        c.compute(&signal, &noise, 6.0, 0.01, NoiseScalingType::CriticalBandsSnr);
        assert!(c.alpha()[5] < c.alpha()[200], "high-SNR band should get less alpha");
    }

    #[test]
    fn test_alpha_beta_stay_in_range() {
        let mut c = NoiseScalingCriteria::new(44100, 256, BandScale::Opus, false);
        let signal: Vec<f32> = (0..129).map(|k| (k % 9) as f32 * 0.3).collect();
        let noise: Vec<f32> = (0..129).map(|k| ((k + 3) % 5) as f32 * 0.2).collect();
        for kind in [
            NoiseScalingType::APosterioriSnr,
            NoiseScalingType::CriticalBandsSnr,
            NoiseScalingType::MaskingThresholds,
        ] {
            c.compute(&signal, &noise, 9.0, 0.5, kind);
            for (&a, &b) in c.alpha().iter().zip(c.beta().iter()) {
                assert!((ALPHA_MIN..=ALPHA_MAX).contains(&a));
                assert!((BETA_MIN..=BETA_MAX).contains(&b));
            }
        }
    }
}
