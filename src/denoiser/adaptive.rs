//! Adaptive denoiser.
//!
//! No capture phase: the selected tracker follows the noise continuously
//! and the reduction pipeline runs on every frame. Switching the tracking
//! algorithm through the parameter block rebuilds the tracker (the one
//! non-real-time-safe parameter change) and re-seeds it from the previous
//! estimate so the floor does not collapse across the switch.

use anyhow::Result;

use crate::denoiser::{AdaptiveSection, ReductionPipeline, ResolvedParameters, ADAPTIVE_VARIANT};
use crate::dsp::spectrum::SpectralFeatures;
use crate::dsp::stft::StftEngine;
use crate::params::DenoiseParameters;

pub struct AdaptiveDenoiser {
    stft: StftEngine,
    pipeline: ReductionPipeline,
    adaptive: AdaptiveSection,
    features: SpectralFeatures,
    params: ResolvedParameters,
    ref_spec: Vec<f32>,
}

impl AdaptiveDenoiser {
    pub fn new(sample_rate: u32, frame_size_ms: f32) -> Result<Self> {
        let config = ADAPTIVE_VARIANT;
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
            adaptive: AdaptiveSection::new(sample_rate, fft_size, stft.hop()),
            features: SpectralFeatures::new(config.spectrum_type, fft_size),
            params: ResolvedParameters::default(),
            ref_spec: vec![0.0; real_size],
            stft,
        })
    }

    pub fn latency(&self) -> usize {
        self.stft.latency()
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
            adaptive,
            features,
            params,
            ref_spec,
        } = self;

        stft.process(input, output, |spectrum| {
            features.compute_into(spectrum, ref_spec);
            let noise = adaptive.estimate(ref_spec, None);
            pipeline.reduce(spectrum, noise, noise, params);
        })
    }

    /// Clears streaming state; the tracker keeps its learned statistics.
    pub fn reset(&mut self) {
        self.stft.reset();
        self.pipeline.reset();
    }
}
