//! SPP-MMSE noise tracker.
//!
//! Fixed-prior speech presence probability with MMSE smoothing of the
//! noise periodogram. The smoothed SPP is capped so the tracker cannot
//! lock into permanent speech-presence (stagnation guard).

const XI_H1: f32 = 31.62; // 15 dB prior SNR, linear
const ALPHA_POW: f32 = 0.8;
const ALPHA_SPP: f32 = 0.9;
const SPP_STAGNATION_CAP: f32 = 0.99;

pub struct SppMmseEstimator {
    noise_prev: Vec<f32>,
    spp_smoothed: Vec<f32>,
    primed: bool,
}

impl SppMmseEstimator {
    pub fn new(real_spectrum_size: usize) -> Self {
        Self {
            noise_prev: vec![0.0; real_spectrum_size],
            spp_smoothed: vec![0.0; real_spectrum_size],
            primed: false,
        }
    }

    pub fn run(&mut self, spectrum: &[f32], noise: &mut [f32]) {
        debug_assert_eq!(spectrum.len(), noise.len());
        debug_assert_eq!(spectrum.len(), self.noise_prev.len());

        if !self.primed {
            self.noise_prev.copy_from_slice(spectrum);
            noise.copy_from_slice(spectrum);
            self.primed = true;
            return;
        }

        let prior_gain = XI_H1 / (1.0 + XI_H1);
        for k in 0..spectrum.len() {
            let x = spectrum[k];
            let n_prev = self.noise_prev[k].max(f32::MIN_POSITIVE);

            let exp_term = (-(x / n_prev) * prior_gain).exp();
            let exp_term = if exp_term.is_finite() { exp_term } else { 0.0 };

            let mut spp = (1.0 / (1.0 + (1.0 + XI_H1) * exp_term)).clamp(0.0, 1.0);
            if self.spp_smoothed[k] > SPP_STAGNATION_CAP {
                spp = spp.min(SPP_STAGNATION_CAP);
            }

            let mmse = (1.0 - spp) * x + spp * n_prev;
            let n = ALPHA_POW * n_prev + (1.0 - ALPHA_POW) * mmse;

            self.spp_smoothed[k] = ALPHA_SPP * self.spp_smoothed[k] + (1.0 - ALPHA_SPP) * spp;
            self.noise_prev[k] = n;
            noise[k] = n;
        }
    }

    pub fn set_state(&mut self, profile: &[f32]) {
        self.noise_prev.copy_from_slice(profile);
        self.spp_smoothed.fill(0.0);
        self.primed = true;
    }

    pub fn update_seed(&mut self, profile: &[f32]) {
        self.set_state(profile);
    }

    pub fn apply_floor(&mut self, floor: &[f32]) {
        for (n, &f) in self.noise_prev.iter_mut().zip(floor.iter()) {
            *n = n.max(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_stationary_noise() {
        let mut est = SppMmseEstimator::new(65);
        let x = vec![0.1f32; 65];
        let mut n = vec![0.0f32; 65];
        for _ in 0..100 {
            est.run(&x, &mut n);
        }
        for &v in n.iter() {
            assert!((v - 0.1).abs() < 0.02);
        }
    }

    #[test]
    fn test_high_snr_freezes_update() {
        let mut est = SppMmseEstimator::new(65);
        let quiet = vec![0.001f32; 65];
        let mut n = vec![0.0f32; 65];
        for _ in 0..50 {
            est.run(&quiet, &mut n);
        }
        let before = n[7];

        // 1000x jump: spp saturates, noise estimate barely moves.
        let loud = vec![1.0f32; 65];
        est.run(&loud, &mut n);
        assert!(n[7] < before * 2.0, "noise chased speech: {}", n[7]);
    }

    #[test]
    fn test_stagnation_cap_allows_recovery() {
        let mut est = SppMmseEstimator::new(5);
        let mut n = vec![0.0f32; 5];
        est.run(&vec![0.001f32; 5], &mut n);

        // Hold very high SNR long enough to saturate smoothed spp.
        for _ in 0..400 {
            est.run(&vec![1.0f32; 5], &mut n);
        }
        // Capped spp keeps (1 - spp) > 0, so the estimate keeps creeping
        // toward the observed level instead of freezing forever.
        let mid = n[2];
        for _ in 0..400 {
            est.run(&vec![1.0f32; 5], &mut n);
        }
        assert!(n[2] > mid, "estimator locked: {} vs {}", n[2], mid);
    }

    #[test]
    fn test_output_is_finite_for_extreme_input() {
        let mut est = SppMmseEstimator::new(3);
        let mut n = vec![0.0f32; 3];
        est.run(&[1e30, 0.0, 1e-30], &mut n);
        est.run(&[1e30, 0.0, 1e-30], &mut n);
        assert!(n.iter().all(|v| v.is_finite()));
    }
}
