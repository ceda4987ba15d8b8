//! Louizou VAD-based noise tracker.
//!
//! Continuous minima tracking with a per-bin speech presence probability
//! that slows the noise update while speech is likely. Detection ratio
//! thresholds are frequency dependent: two crossovers split the spectrum
//! into three bands with hard-coded minimum detection levels.

use crate::dsp::utils::SPECTRAL_EPS;

const N_SMOOTH: f32 = 0.7;
const GAMMA: f32 = 0.998;
const BETA: f32 = 0.8;
const ALPHA_P: f32 = 0.2;
const ALPHA_D: f32 = 0.85;

const CROSSOVER_LOW_HZ: f32 = 1000.0;
const CROSSOVER_HIGH_HZ: f32 = 3000.0;

const DELTA_LOW: f32 = 2.0;
const DELTA_MID: f32 = 2.0;
const DELTA_HIGH: f32 = 5.0;

pub struct LouizouEstimator {
    smoothed: Vec<f32>,
    local_min: Vec<f32>,
    speech_presence: Vec<f32>,
    noise_prev: Vec<f32>,
    delta: Vec<f32>,
    primed: bool,
}

impl LouizouEstimator {
    pub fn new(sample_rate: u32, fft_size: usize) -> Self {
        let size = fft_size / 2 + 1;
        let hz_per_bin = sample_rate as f32 / fft_size as f32;
        let delta = (0..size)
            .map(|k| {
                let f = k as f32 * hz_per_bin;
                if f < CROSSOVER_LOW_HZ {
                    DELTA_LOW
                } else if f < CROSSOVER_HIGH_HZ {
                    DELTA_MID
                } else {
                    DELTA_HIGH
                }
            })
            .collect();

        Self {
            smoothed: vec![0.0; size],
            local_min: vec![0.0; size],
            speech_presence: vec![0.0; size],
            noise_prev: vec![0.0; size],
            delta,
            primed: false,
        }
    }

    pub fn run(&mut self, spectrum: &[f32], noise: &mut [f32]) {
        debug_assert_eq!(spectrum.len(), noise.len());
        debug_assert_eq!(spectrum.len(), self.smoothed.len());

        if !self.primed {
            self.smoothed.copy_from_slice(spectrum);
            self.local_min.copy_from_slice(spectrum);
            self.noise_prev.copy_from_slice(spectrum);
            noise.copy_from_slice(spectrum);
            self.primed = true;
            return;
        }

        for k in 0..spectrum.len() {
            let x = spectrum[k];
            let s_prev = self.smoothed[k];
            let s = N_SMOOTH * s_prev + (1.0 - N_SMOOTH) * x;

            let min_prev = self.local_min[k];
            let s_min = if min_prev < s {
                GAMMA * min_prev + ((1.0 - GAMMA) / (1.0 - BETA)) * (s - BETA * s_prev)
            } else {
                s
            };

            let ratio = s / s_min.max(SPECTRAL_EPS);
            let indicator = if ratio > self.delta[k] { 1.0 } else { 0.0 };
            let p = ALPHA_P * self.speech_presence[k] + (1.0 - ALPHA_P) * indicator;

            let tau = ALPHA_D + (1.0 - ALPHA_D) * p;
            let n = tau * self.noise_prev[k] + (1.0 - tau) * x;

            self.smoothed[k] = s;
            self.local_min[k] = s_min;
            self.speech_presence[k] = p;
            self.noise_prev[k] = n;
            noise[k] = n;
        }
    }

    pub fn set_state(&mut self, profile: &[f32]) {
        self.smoothed.copy_from_slice(profile);
        self.local_min.copy_from_slice(profile);
        self.noise_prev.copy_from_slice(profile);
        self.speech_presence.fill(0.0);
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
    fn test_first_frame_passes_input() {
        let mut est = LouizouEstimator::new(44100, 128);
        let x = vec![0.5f32; 65];
        let mut n = vec![0.0f32; 65];
        est.run(&x, &mut n);
        assert_eq!(n, x);
    }

    #[test]
    fn test_stationary_input_converges_to_input_level() {
        let mut est = LouizouEstimator::new(44100, 128);
        let x = vec![0.2f32; 65];
        let mut n = vec![0.0f32; 65];
        for _ in 0..200 {
            est.run(&x, &mut n);
        }
        for &v in n.iter() {
            assert!((v - 0.2).abs() < 0.02, "did not converge: {}", v);
        }
    }

    #[test]
    fn test_sudden_burst_is_mostly_ignored() {
        let mut est = LouizouEstimator::new(44100, 128);
        let quiet = vec![0.01f32; 65];
        let mut n = vec![0.0f32; 65];
        for _ in 0..100 {
            est.run(&quiet, &mut n);
        }
        let before = n[10];

        // A 100x burst should barely move the estimate on one frame.
        let burst = vec![1.0f32; 65];
        est.run(&burst, &mut n);
        assert!(n[10] < before * 20.0, "burst leaked into noise: {}", n[10]);
    }

    #[test]
    fn test_apply_floor_clamps_state() {
        let mut est = LouizouEstimator::new(44100, 128);
        let x = vec![0.01f32; 65];
        let mut n = vec![0.0f32; 65];
        est.run(&x, &mut n);
        let floor = vec![0.5f32; 65];
        est.apply_floor(&floor);
        est.run(&x, &mut n);
        // Noise recursion starts from the clamped state.
        assert!(n[5] > 0.05);
    }
}
