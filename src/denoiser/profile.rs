//! Profile-based denoiser.
//!
//! Two phases driven by `learn_noise`: while learning, every frame feeds
//! all three profile estimator modes and the audio passes through
//! untouched (delayed by the engine latency); while reducing, the
//! selected mode's profile becomes the fixed noise estimate for the
//! reduction pipeline. Reducing without a usable profile is a silent
//! pass-through, not an error.

use anyhow::Result;

use crate::denoiser::{ReductionPipeline, ResolvedParameters, PROFILE_VARIANT};
use crate::dsp::noise_profile::{NoiseProfileSnapshot, NoiseProfileStore, ProfileMode};
use crate::dsp::stft::StftEngine;
use crate::params::DenoiseParameters;

pub struct ProfileDenoiser {
    stft: StftEngine,
    pipeline: ReductionPipeline,
    profile: NoiseProfileStore,
    params: ResolvedParameters,
    noise_scratch: Vec<f32>,
}

impl ProfileDenoiser {
    pub fn new(sample_rate: u32, frame_size_ms: f32) -> Result<Self> {
        let config = PROFILE_VARIANT;
        let stft = StftEngine::new(
            sample_rate,
            frame_size_ms,
            config.overlap_factor,
            config.analysis_window,
            config.synthesis_window,
        )?;
        let fft_size = stft.fft_size();
        let real_size = stft.real_spectrum_size();

        Ok(Self {
            pipeline: ReductionPipeline::new(sample_rate, fft_size, &config),
            profile: NoiseProfileStore::new(real_size),
            params: ResolvedParameters::default(),
            noise_scratch: vec![0.0; real_size],
            stft,
        })
    }

    /// Input-to-output latency in samples.
    pub fn latency(&self) -> usize {
        self.stft.latency()
    }

    pub fn load_parameters(&mut self, params: &DenoiseParameters) -> bool {
        self.params = ResolvedParameters::from_block(params);
        true
    }

    /// Streams one block. Returns false on empty or mismatched buffers;
    /// the output buffer is untouched in that case.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> bool {
        let Self {
            stft,
            pipeline,
            profile,
            params,
            noise_scratch,
        } = self;

        stft.process(input, output, |spectrum| {
            if params.learn_noise {
                let reference = pipeline.reference(spectrum);
                profile.learn(reference);
                return;
            }
            if !profile.available(params.mode) {
                return;
            }
            noise_scratch.copy_from_slice(profile.profile(params.mode));
            pipeline.reduce(spectrum, noise_scratch, noise_scratch, params);
        })
    }

    /// Clears streaming state while keeping learned profiles.
    pub fn reset(&mut self) {
        self.stft.reset();
        self.pipeline.reset();
    }

    // ---------------------------------------------------------------------
    // Noise profile management
    // ---------------------------------------------------------------------

    pub fn noise_profile_size(&self) -> usize {
        self.profile.size()
    }

    /// Profile for the currently selected reduction mode.
    pub fn noise_profile(&self) -> Option<&[f32]> {
        self.noise_profile_for_mode(mode_to_int(self.params.mode))
    }

    pub fn noise_profile_for_mode(&self, mode: i32) -> Option<&[f32]> {
        ProfileMode::from_int(mode).map(|m| self.profile.profile(m))
    }

    pub fn noise_profile_blocks_averaged(&self) -> u32 {
        self.profile.blocks_averaged(self.params.mode)
    }

    pub fn noise_profile_blocks_averaged_for_mode(&self, mode: i32) -> u32 {
        ProfileMode::from_int(mode)
            .map(|m| self.profile.blocks_averaged(m))
            .unwrap_or(0)
    }

    pub fn load_noise_profile(&mut self, values: &[f32], blocks_averaged: u32) -> bool {
        self.profile
            .load(self.params.mode, values, blocks_averaged)
    }

    pub fn load_noise_profile_for_mode(
        &mut self,
        values: &[f32],
        blocks_averaged: u32,
        mode: i32,
    ) -> bool {
        match ProfileMode::from_int(mode) {
            Some(m) => self.profile.load(m, values, blocks_averaged),
            None => false,
        }
    }

    /// Clears all three modes and their availability.
    pub fn reset_noise_profile(&mut self) -> bool {
        self.profile.reset();
        true
    }

    pub fn noise_profile_available(&self) -> bool {
        self.profile.available(self.params.mode)
    }

    pub fn noise_profile_available_for_mode(&self, mode: i32) -> bool {
        ProfileMode::from_int(mode)
            .map(|m| self.profile.available(m))
            .unwrap_or(false)
    }

    pub fn noise_profile_snapshot(&self) -> NoiseProfileSnapshot {
        self.profile.snapshot()
    }

    pub fn restore_noise_profile_snapshot(&mut self, snapshot: &NoiseProfileSnapshot) -> bool {
        self.profile.restore(snapshot)
    }
}

fn mode_to_int(mode: ProfileMode) -> i32 {
    match mode {
        ProfileMode::RollingMean => 1,
        ProfileMode::Median => 2,
        ProfileMode::Max => 3,
    }
}
