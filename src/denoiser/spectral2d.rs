//! 2D denoiser: adaptive estimation plus Non-Local-Means smoothing of
//! the time-frequency SNR map.
//!
//! Identical to the adaptive variant up through noise estimation, then
//! the per-frame SNR is pushed into the NLM ring and the gain is
//! computed against the delayed spectrum that lines up with the NLM's
//! look-ahead. A paired delay ring keeps full half-complex frames and
//! their raw noise estimates so whitening still sees the unsmoothed
//! noise. The extra `future` frames of delay are reported through the
//! latency accessor.
//!
//! The manual profile (modes 1/2/3) acts as a minimum noise floor for
//! the tracker when `adaptive_noise` is on, and as the fixed noise
//! estimate when it is off.

use anyhow::Result;

use crate::denoiser::{AdaptiveSection, ReductionPipeline, ResolvedParameters, TWO_DIM_VARIANT};
use crate::dsp::nlm::NlmSmoother;
use crate::dsp::noise_profile::{NoiseProfileSnapshot, NoiseProfileStore, ProfileMode};
use crate::dsp::spectrum::snr_spectrum;
use crate::dsp::stft::StftEngine;
use crate::dsp::utils::SPECTRAL_EPS;
use crate::params::DenoiseParameters;

const DELAY_BUFFER_FRAMES: usize = 8;

pub struct TwoDimDenoiser {
    stft: StftEngine,
    pipeline: ReductionPipeline,
    profile: NoiseProfileStore,
    adaptive: AdaptiveSection,
    nlm: NlmSmoother,
    params: ResolvedParameters,

    delay_spectra: Vec<f32>,
    delay_noise: Vec<f32>,
    delay_head: usize,
    frames_pushed: u64,

    ref_spec: Vec<f32>,
    noise_cur: Vec<f32>,
    snr: Vec<f32>,
    snr_smoothed: Vec<f32>,
    noise_eff: Vec<f32>,
    delayed_spectrum: Vec<f32>,
    delayed_noise: Vec<f32>,
}

impl TwoDimDenoiser {
    pub fn new(sample_rate: u32, frame_size_ms: f32) -> Result<Self> {
        let config = TWO_DIM_VARIANT;
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
            adaptive: AdaptiveSection::new(sample_rate, fft_size, stft.hop()),
            nlm: NlmSmoother::new(real_size),
            params: ResolvedParameters::default(),
            delay_spectra: vec![0.0; DELAY_BUFFER_FRAMES * fft_size],
            delay_noise: vec![0.0; DELAY_BUFFER_FRAMES * real_size],
            delay_head: 0,
            frames_pushed: 0,
            ref_spec: vec![0.0; real_size],
            noise_cur: vec![0.0; real_size],
            snr: vec![0.0; real_size],
            snr_smoothed: vec![0.0; real_size],
            noise_eff: vec![0.0; real_size],
            delayed_spectrum: vec![0.0; fft_size],
            delayed_noise: vec![0.0; real_size],
            stft,
        })
    }

    /// Engine latency plus the NLM look-ahead.
    pub fn latency(&self) -> usize {
        self.stft.latency() + self.nlm.future_frames() * self.stft.hop()
    }

    pub fn load_parameters(&mut self, params: &DenoiseParameters) -> bool {
        self.params = ResolvedParameters::from_block(params);
        self.adaptive.set_method(self.params.method);
        true
    }

    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> bool {
        let Self {
            stft,
            pipeline,
            profile,
            adaptive,
            nlm,
            params,
            delay_spectra,
            delay_noise,
            delay_head,
            frames_pushed,
            ref_spec,
            noise_cur,
            snr,
            snr_smoothed,
            noise_eff,
            delayed_spectrum,
            delayed_noise,
        } = self;

        let fft_size = stft.fft_size();
        let real_size = stft.real_spectrum_size();
        let future = nlm.future_frames();

        stft.process(input, output, |spectrum| {
            pipeline.reference_into(spectrum, ref_spec);

            // Per-frame noise estimate: tracker over manual floor, plain
            // manual profile, or nothing.
            if params.learn_noise {
                profile.learn(ref_spec);
                noise_cur.fill(0.0);
            } else if params.adaptive_noise {
                let floor = if profile.available(params.mode) {
                    Some(profile.profile(params.mode))
                } else {
                    None
                };
                let estimated = adaptive.estimate(ref_spec, floor);
                noise_cur.copy_from_slice(estimated);
            } else if profile.available(params.mode) {
                noise_cur.copy_from_slice(profile.profile(params.mode));
            } else {
                noise_cur.fill(0.0);
            }

            // Delay ring: spectrum + raw noise, aligned with the NLM.
            let base = *delay_head * fft_size;
            delay_spectra[base..base + fft_size].copy_from_slice(spectrum);
            let base = *delay_head * real_size;
            delay_noise[base..base + real_size].copy_from_slice(noise_cur);
            *delay_head = (*delay_head + 1) % DELAY_BUFFER_FRAMES;

            if params.learn_noise {
                // Neutral SNR keeps the ring well conditioned while the
                // audio is passed through untouched.
                snr.fill(1.0);
            } else {
                snr_spectrum(ref_spec, noise_cur, snr);
            }
            nlm.push(snr);

            *frames_pushed += 1;
            if *frames_pushed <= future as u64 {
                // Look-ahead not filled yet: this is the advertised extra
                // latency, delivered as silence.
                spectrum.fill(0.0);
                return;
            }

            let t = (*delay_head + DELAY_BUFFER_FRAMES - 1 - future) % DELAY_BUFFER_FRAMES;
            delayed_spectrum.copy_from_slice(&delay_spectra[t * fft_size..(t + 1) * fft_size]);
            delayed_noise.copy_from_slice(&delay_noise[t * real_size..(t + 1) * real_size]);

            if params.learn_noise {
                spectrum.copy_from_slice(delayed_spectrum);
                return;
            }

            nlm.smooth(params.nlm_h, snr_smoothed);

            // Recover the effective noise the smoothed SNR implies for
            // the delayed frame.
            pipeline.reference_into(delayed_spectrum, ref_spec);
            for k in 0..real_size {
                noise_eff[k] = ref_spec[k] / snr_smoothed[k].max(SPECTRAL_EPS);
            }

            pipeline.reduce(delayed_spectrum, noise_eff, delayed_noise, params);
            spectrum.copy_from_slice(delayed_spectrum);
        })
    }

    /// Clears streaming and smoothing state; learned profiles survive.
    pub fn reset(&mut self) {
        self.stft.reset();
        self.pipeline.reset();
        self.nlm.reset();
        self.delay_spectra.fill(0.0);
        self.delay_noise.fill(0.0);
        self.delay_head = 0;
        self.frames_pushed = 0;
    }

    // ---------------------------------------------------------------------
    // Noise profile management
    // ---------------------------------------------------------------------

    pub fn noise_profile_size(&self) -> usize {
        self.profile.size()
    }

    pub fn noise_profile_for_mode(&self, mode: i32) -> Option<&[f32]> {
        ProfileMode::from_int(mode).map(|m| self.profile.profile(m))
    }

    pub fn noise_profile_blocks_averaged_for_mode(&self, mode: i32) -> u32 {
        ProfileMode::from_int(mode)
            .map(|m| self.profile.blocks_averaged(m))
            .unwrap_or(0)
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

    pub fn reset_noise_profile(&mut self) -> bool {
        self.profile.reset();
        true
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
