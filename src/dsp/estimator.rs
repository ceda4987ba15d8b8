//! Adaptive noise estimator dispatcher.
//!
//! A sum type over the four trackers with a shared silence gate: frames
//! whose mean energy sits below the silence threshold repeat the previous
//! estimate instead of driving any update (zeros before the first real
//! frame). Switching methods rebuilds the inner state and is therefore
//! not real-time safe; the per-variant processors only do it from
//! `load_parameters`.

use crate::dsp::brandt::BrandtEstimator;
use crate::dsp::louizou::LouizouEstimator;
use crate::dsp::martin::MartinEstimator;
use crate::dsp::spp_mmse::SppMmseEstimator;
use crate::dsp::utils::{frame_mean_power, SILENCE_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorMethod {
    SppMmse,
    Brandt,
    Martin,
    Louizou,
}

impl EstimatorMethod {
    /// Parameter-block encoding: 0 = SPP-MMSE, 1 = Brandt, 2 = Martin.
    /// Anything else keeps the construction default (Louizou).
    pub fn from_int(v: i32) -> Self {
        match v {
            0 => Self::SppMmse,
            1 => Self::Brandt,
            2 => Self::Martin,
            _ => Self::Louizou,
        }
    }
}

enum EstimatorKind {
    SppMmse(SppMmseEstimator),
    Louizou(LouizouEstimator),
    Martin(MartinEstimator),
    Brandt(BrandtEstimator),
}

pub struct NoiseEstimator {
    kind: EstimatorKind,
    method: EstimatorMethod,
    prev_noise: Vec<f32>,
    seen_signal: bool,

    sample_rate: u32,
    fft_size: usize,
    hop: usize,
}

impl NoiseEstimator {
    pub fn new(method: EstimatorMethod, sample_rate: u32, fft_size: usize, hop: usize) -> Self {
        let real_size = fft_size / 2 + 1;
        Self {
            kind: Self::build(method, sample_rate, fft_size, hop),
            method,
            prev_noise: vec![0.0; real_size],
            seen_signal: false,
            sample_rate,
            fft_size,
            hop,
        }
    }

    fn build(
        method: EstimatorMethod,
        sample_rate: u32,
        fft_size: usize,
        hop: usize,
    ) -> EstimatorKind {
        let real_size = fft_size / 2 + 1;
        match method {
            EstimatorMethod::SppMmse => EstimatorKind::SppMmse(SppMmseEstimator::new(real_size)),
            EstimatorMethod::Louizou => {
                EstimatorKind::Louizou(LouizouEstimator::new(sample_rate, fft_size))
            }
            EstimatorMethod::Martin => EstimatorKind::Martin(MartinEstimator::new(real_size)),
            EstimatorMethod::Brandt => {
                EstimatorKind::Brandt(BrandtEstimator::new(real_size, sample_rate, hop))
            }
        }
    }

    pub fn method(&self) -> EstimatorMethod {
        self.method
    }

    /// Rebuilds the tracker for a new method, re-seeding it from the last
    /// emitted noise spectrum so the estimate does not collapse across
    /// the switch. Allocates; not real-time safe.
    pub fn switch_method(&mut self, method: EstimatorMethod) {
        if method == self.method {
            return;
        }
        log::debug!("noise estimator switch: {:?} -> {:?}", self.method, method);
        self.kind = Self::build(method, self.sample_rate, self.fft_size, self.hop);
        self.method = method;
        if self.seen_signal {
            self.update_seed_inner();
        }
    }

    pub fn run(&mut self, spectrum: &[f32], noise: &mut [f32]) {
        debug_assert_eq!(noise.len(), self.prev_noise.len());

        if frame_mean_power(spectrum) < SILENCE_THRESHOLD {
            if self.seen_signal {
                noise.copy_from_slice(&self.prev_noise);
            } else {
                noise.fill(0.0);
            }
            return;
        }
        self.seen_signal = true;

        match &mut self.kind {
            EstimatorKind::SppMmse(e) => e.run(spectrum, noise),
            EstimatorKind::Louizou(e) => e.run(spectrum, noise),
            EstimatorKind::Martin(e) => e.run(spectrum, noise),
            EstimatorKind::Brandt(e) => e.run(spectrum, noise),
        }
        self.prev_noise.copy_from_slice(noise);
    }

    pub fn set_state(&mut self, profile: &[f32]) {
        match &mut self.kind {
            EstimatorKind::SppMmse(e) => e.set_state(profile),
            EstimatorKind::Louizou(e) => e.set_state(profile),
            EstimatorKind::Martin(e) => e.set_state(profile),
            EstimatorKind::Brandt(e) => e.set_state(profile),
        }
        self.prev_noise.copy_from_slice(profile);
        self.seen_signal = true;
    }

    fn update_seed_inner(&mut self) {
        let seed = &self.prev_noise;
        match &mut self.kind {
            EstimatorKind::SppMmse(e) => e.update_seed(seed),
            EstimatorKind::Louizou(e) => e.update_seed(seed),
            EstimatorKind::Martin(e) => e.update_seed(seed),
            EstimatorKind::Brandt(e) => e.update_seed(seed),
        }
    }

    /// Element-wise clamp of tracker state and the held previous output
    /// to a minimum noise floor.
    pub fn apply_floor(&mut self, floor: &[f32]) {
        match &mut self.kind {
            EstimatorKind::SppMmse(e) => e.apply_floor(floor),
            EstimatorKind::Louizou(e) => e.apply_floor(floor),
            EstimatorKind::Martin(e) => e.apply_floor(floor),
            EstimatorKind::Brandt(e) => e.apply_floor(floor),
        }
        for (n, &f) in self.prev_noise.iter_mut().zip(floor.iter()) {
            *n = n.max(f);
        }
    }

    pub fn last_noise(&self) -> &[f32] {
        &self.prev_noise
    }
}
