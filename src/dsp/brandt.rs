//! Brandt trimmed-mean noise tracker.
//!
//! Keeps a per-bin history window and, each frame, sweeps a fixed set of
//! trim percentiles. For each candidate the truncated mean of the lowest
//! `q` sorted values is bias-corrected for an exponential model, and an
//! Anderson-Darling style statistic scores how well the truncated
//! exponential fits. The best-fitting candidate wins; a weak fit retains
//! the previous estimate.

use crate::dsp::utils::deterministic_jitter;

const PERCENTILES: [f32; 5] = [0.10, 0.25, 0.5, 0.75, 1.0];
const BRANDT_MIN_CONFIDENCE: f32 = 0.7;
const BRANDT_HISTORY_MS: f32 = 1000.0;
const MIN_TRUNCATION_COUNT: usize = 10;
const SEED_JITTER: f32 = 0.01;

/// Bias correction for the truncated mean of an exponential distribution
/// trimmed at percentile `p`.
fn bias_correction(p: f32) -> f32 {
    if p >= 1.0 {
        return 1.0;
    }
    1.0 / (1.0 + ((1.0 - p) / p) * (1.0 - p).ln())
}

/// Anderson-Darling statistic of `sorted[..q]` against an exponential
/// model with mean `mu` truncated at `b`. Lower is better.
fn anderson_darling(sorted: &[f32], q: usize, mu: f32, b: f32) -> f32 {
    if mu <= f32::MIN_POSITIVE || b <= f32::MIN_POSITIVE || q == 0 {
        return f32::MAX;
    }
    let denom = 1.0 - (-b / mu).exp();
    if denom <= f32::MIN_POSITIVE {
        return f32::MAX;
    }

    let cdf = |x: f32| ((1.0 - (-x / mu).exp()) / denom).clamp(1e-6, 1.0 - 1e-6);

    let mut acc = 0.0f64;
    for i in 0..q {
        let lo = cdf(sorted[i]);
        let hi = cdf(sorted[q - 1 - i]);
        acc += (2 * i + 1) as f64 * (lo.ln() as f64 + (1.0 - hi).ln() as f64);
    }
    let ad = -(q as f64) - acc / q as f64;
    // Normalize so the accept test is sample-size independent.
    (ad / q as f64) as f32
}

pub struct BrandtEstimator {
    /// Bin-major history: `history[bin * history_size + t]`.
    history: Vec<f32>,
    head: usize,
    sorted_scratch: Vec<f32>,
    noise_prev: Vec<f32>,
    history_size: usize,
    size: usize,
    tick: u64,
    primed: bool,
}

impl BrandtEstimator {
    pub fn new(real_spectrum_size: usize, sample_rate: u32, hop: usize) -> Self {
        let frames_per_second = sample_rate as f32 / hop.max(1) as f32;
        let history_size = ((BRANDT_HISTORY_MS / 1000.0) * frames_per_second).round() as usize;
        let history_size = history_size.clamp(MIN_TRUNCATION_COUNT, 512);

        Self {
            history: vec![0.0; real_spectrum_size * history_size],
            head: 0,
            sorted_scratch: vec![0.0; history_size],
            noise_prev: vec![0.0; real_spectrum_size],
            history_size,
            size: real_spectrum_size,
            tick: 0,
            primed: false,
        }
    }

    pub fn history_size(&self) -> usize {
        self.history_size
    }

    pub fn run(&mut self, spectrum: &[f32], noise: &mut [f32]) {
        debug_assert_eq!(spectrum.len(), self.size);
        debug_assert_eq!(noise.len(), self.size);

        if !self.primed {
            self.seed_history(spectrum);
            self.noise_prev.copy_from_slice(spectrum);
            noise.copy_from_slice(spectrum);
            self.primed = true;
            self.tick += 1;
            return;
        }

        for k in 0..self.size {
            self.history[k * self.history_size + self.head] = spectrum[k];
        }
        self.head = (self.head + 1) % self.history_size;
        self.tick += 1;

        // The history is fully populated from the seeding frame onward.
        let len = self.history_size;
        for k in 0..self.size {
            let row = &self.history[k * self.history_size..(k + 1) * self.history_size];
            self.sorted_scratch[..len].copy_from_slice(row);
            self.sorted_scratch[..len].sort_unstable_by(f32::total_cmp);
            let sorted = &self.sorted_scratch[..len];

            let mut best_mu = self.noise_prev[k];
            let mut best_ad = f32::MAX;
            for &p in PERCENTILES.iter() {
                let q = ((p * len as f32) as usize)
                    .max(MIN_TRUNCATION_COUNT)
                    .min(len);
                let mut sum = 0.0;
                for &v in &sorted[..q] {
                    sum += v;
                }
                let mu = (sum / q as f32) * bias_correction(p);
                let b = sorted[q - 1];
                let ad = anderson_darling(sorted, q, mu, b);
                if ad < best_ad {
                    best_ad = ad;
                    best_mu = mu;
                }
            }

            if (1.0 - best_ad) >= BRANDT_MIN_CONFIDENCE {
                self.noise_prev[k] = best_mu;
            }
            noise[k] = self.noise_prev[k];
        }
    }

    /// Seeds every history slot from the first observed spectrum with a
    /// small deterministic jitter so per-bin sorts have no ties.
    fn seed_history(&mut self, spectrum: &[f32]) {
        let c = bias_correction(0.5);
        for k in 0..self.size {
            let base = spectrum[k] / c;
            for t in 0..self.history_size {
                let j = 1.0 + SEED_JITTER * deterministic_jitter(k, self.tick + t as u64);
                self.history[k * self.history_size + t] = (base * j).max(0.0);
            }
        }
    }

    pub fn set_state(&mut self, profile: &[f32]) {
        self.seed_history(profile);
        self.noise_prev.copy_from_slice(profile);
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
    fn test_bias_correction_shape() {
        // Correction grows as the trim gets more aggressive.
        assert!(bias_correction(0.10) > bias_correction(0.5));
        assert!(bias_correction(0.5) > bias_correction(0.75));
        assert!((bias_correction(1.0) - 1.0).abs() < 1e-6);
        // A half trim of an exponential needs roughly a 2.5x correction.
        assert!((bias_correction(0.5) - 3.26).abs() < 0.2);
    }

    #[test]
    fn test_anderson_darling_prefers_exponential_data() {
        // Inverse-CDF sampled exponential with mean 1.
        let n = 40;
        let exp_data: Vec<f32> = (0..n)
            .map(|i| -(1.0 - (i as f32 + 0.5) / n as f32).ln())
            .collect();
        let b = exp_data[n - 1];
        let good = anderson_darling(&exp_data, n, 1.0, b);
        let bad = anderson_darling(&exp_data, n, 20.0, b);
        assert!(good < bad, "{} vs {}", good, bad);
    }

    #[test]
    fn test_estimator_tracks_constant_noise() {
        let mut est = BrandtEstimator::new(9, 44100, 512);
        let x = vec![0.25f32; 9];
        let mut n = vec![0.0f32; 9];
        for _ in 0..120 {
            est.run(&x, &mut n);
        }
        for &v in n.iter() {
            assert!(v > 0.01 && v < 2.5, "implausible estimate {}", v);
        }
    }

    #[test]
    fn test_first_frame_seeds_and_passes_through() {
        let mut est = BrandtEstimator::new(5, 48000, 480);
        let x = vec![0.3f32; 5];
        let mut n = vec![0.0f32; 5];
        est.run(&x, &mut n);
        assert_eq!(n, x);
        // History is fully populated and jittered.
        let h = est.history_size();
        let row = &est.history[0..h];
        assert!(row.iter().any(|&v| (v - row[0]).abs() > 1e-6));
    }

    #[test]
    fn test_two_instances_stay_identical() {
        let mut a = BrandtEstimator::new(7, 44100, 512);
        let mut b = BrandtEstimator::new(7, 44100, 512);
        let mut na = vec![0.0f32; 7];
        let mut nb = vec![0.0f32; 7];
        for i in 0..60 {
            let x: Vec<f32> = (0..7).map(|k| 0.1 + ((i * k) % 5) as f32 * 0.01).collect();
            a.run(&x, &mut na);
            b.run(&x, &mut nb);
            assert_eq!(na, nb, "divergence at frame {}", i);
        }
    }
}
