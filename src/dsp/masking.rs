//! Psychoacoustic masking threshold estimation.
//!
//! Johnston-style model over Bark critical bands: band energies of the
//! clean-signal estimate are convolved with the Schroeder spreading
//! function, offset by a tonality-dependent amount (spectral flatness
//! measure), renormalized and broadcast back to bins. An absolute
//! threshold of hearing (Terhardt) floors the result; the floor can be
//! disabled so that only real signal content masks (2D variant veto).

use crate::dsp::critical_bands::{BandScale, CriticalBands};
use crate::dsp::utils::SPECTRAL_EPS;

// Tonality offset bounds, dB.
const TONAL_OFFSET_BASE: f32 = 14.5;
const NOISE_OFFSET: f32 = 5.5;

// SFM below which the frame counts as fully tonal, dB.
const SFM_FLOOR_DB: f32 = -60.0;

// 0 dBFS playback level assumed when mapping SPL to linear power.
const REFERENCE_LEVEL_DB: f32 = 96.0;

pub struct MaskingEstimator {
    bands: CriticalBands,
    /// Dense `B x B` spreading matrix, linear power domain.
    spreading: Vec<f32>,
    /// Row sums of the spreading matrix, for renormalization.
    spreading_gain: Vec<f32>,
    /// Terhardt absolute threshold per bin, linear power domain.
    absolute_thresholds: Vec<f32>,
    use_absolute_floor: bool,

    band_energy: Vec<f32>,
    spread_energy: Vec<f32>,
    band_threshold: Vec<f32>,
    band_width: Vec<f32>,
}

impl MaskingEstimator {
    pub fn new(sample_rate: u32, fft_size: usize, use_absolute_floor: bool) -> Self {
        let bands = CriticalBands::new(BandScale::Bark, sample_rate, fft_size);
        let b = bands.number_of_bands();
        let real_size = fft_size / 2 + 1;

        let mut spreading = vec![0.0f32; b * b];
        let mut spreading_gain = vec![0.0f32; b];
        for i in 0..b {
            for j in 0..b {
                let d = i as f32 - j as f32;
                let db = 15.81 + 7.5 * (d + 0.474) - 17.5 * (1.0 + (d + 0.474).powi(2)).sqrt();
                let lin = 10.0f32.powf(db / 10.0);
                spreading[i * b + j] = lin;
                spreading_gain[i] += lin;
            }
        }

        let hz_per_bin = sample_rate as f32 / fft_size as f32;
        let absolute_thresholds = (0..real_size)
            .map(|k| {
                let f_khz = (k.max(1) as f32 * hz_per_bin / 1000.0).max(0.02);
                let spl = 3.64 * f_khz.powf(-0.8) - 6.5 * (-0.6 * (f_khz - 3.3).powi(2)).exp()
                    + 1e-3 * f_khz.powi(4);
                10.0f32.powf((spl - REFERENCE_LEVEL_DB) / 10.0)
            })
            .collect();

        let band_width = (0..b)
            .map(|i| {
                let idx = bands.band_indexes(i);
                (idx.end - idx.start).max(1) as f32
            })
            .collect();

        Self {
            bands,
            spreading,
            spreading_gain,
            absolute_thresholds,
            use_absolute_floor,
            band_energy: vec![0.0; b],
            spread_energy: vec![0.0; b],
            band_threshold: vec![0.0; b],
            band_width,
        }
    }

    /// Masking thresholds for a clean-signal estimate, per bin, same
    /// units as the input spectrum.
    pub fn compute(&mut self, clean: &[f32], thresholds: &mut [f32]) {
        debug_assert_eq!(clean.len(), thresholds.len());
        let b = self.band_energy.len();

        self.bands
            .compute_critical_bands_spectrum(clean, &mut self.band_energy);

        for i in 0..b {
            let mut acc = 0.0;
            for j in 0..b {
                acc += self.spreading[i * b + j] * self.band_energy[j];
            }
            self.spread_energy[i] = acc;
        }

        // Spectral flatness of the band energies decides how tonal the
        // frame is; tonal content masks less than noise-like content.
        let mut log_sum = 0.0;
        let mut lin_sum = 0.0;
        for &e in self.band_energy.iter() {
            let e = e.max(SPECTRAL_EPS);
            log_sum += e.ln();
            lin_sum += e;
        }
        let geo = (log_sum / b as f32).exp();
        let arith = lin_sum / b as f32;
        let sfm_db = 10.0 * (geo / arith.max(SPECTRAL_EPS)).max(SPECTRAL_EPS).log10();
        let tonality = (sfm_db / SFM_FLOOR_DB).clamp(0.0, 1.0);

        for i in 0..b {
            let offset_db = tonality * (TONAL_OFFSET_BASE + (i + 1) as f32)
                + (1.0 - tonality) * NOISE_OFFSET;
            let t = self.spread_energy[i] / 10.0f32.powf(offset_db / 10.0);
            // Undo the energy gain the spreading convolution introduced.
            self.band_threshold[i] = t / self.spreading_gain[i].max(SPECTRAL_EPS);
        }

        for (k, out) in thresholds.iter_mut().enumerate() {
            let band = self.bands.band_of_bin(k);
            let mut t = self.band_threshold[band] / self.band_width[band];
            if self.use_absolute_floor {
                t = t.max(self.absolute_thresholds[k]);
            }
            *out = t.max(SPECTRAL_EPS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_positive_and_finite() {
        let mut me = MaskingEstimator::new(44100, 1024, true);
        let clean: Vec<f32> = (0..513).map(|i| ((i % 11) as f32) * 1e-3).collect();
        let mut t = vec![0.0f32; 513];
        me.compute(&clean, &mut t);
        assert!(t.iter().all(|&v| v.is_finite() && v > 0.0));
    }

    #[test]
    fn test_louder_signal_raises_thresholds() {
        let mut me = MaskingEstimator::new(44100, 1024, false);
        let quiet = vec![1e-6f32; 513];
        let loud = vec![1e-2f32; 513];
        let mut t_quiet = vec![0.0f32; 513];
        let mut t_loud = vec![0.0f32; 513];
        me.compute(&quiet, &mut t_quiet);
        me.compute(&loud, &mut t_loud);
        assert!(t_loud[100] > t_quiet[100]);
    }

    #[test]
    fn test_absolute_floor_toggle() {
        let mut with_floor = MaskingEstimator::new(44100, 1024, true);
        let mut without = MaskingEstimator::new(44100, 1024, false);
        let silence = vec![0.0f32; 513];
        let mut t_a = vec![0.0f32; 513];
        let mut t_b = vec![0.0f32; 513];
        with_floor.compute(&silence, &mut t_a);
        without.compute(&silence, &mut t_b);
        // With no signal at all, only the absolute threshold can mask.
        assert!(t_a[200] > t_b[200]);
    }
}
