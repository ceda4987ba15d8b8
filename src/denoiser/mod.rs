//! Per-variant denoiser orchestration.
//!
//! The three public processors share a frame-level reduction pipeline
//! (scaling criteria -> time smoothing -> gain estimation -> gain floor ->
//! post-filter -> mix) and differ only in where their noise estimate
//! comes from and whether the NLM stage sits in front of the gain
//! computation. Each variant owns a streaming STFT engine and every
//! scratch buffer it needs; nothing allocates after construction.

pub mod adaptive;
pub mod profile;
pub mod spectral2d;

pub use adaptive::AdaptiveDenoiser;
pub use profile::ProfileDenoiser;
pub use spectral2d::TwoDimDenoiser;

use crate::dsp::critical_bands::BandScale;
use crate::dsp::estimator::{EstimatorMethod, NoiseEstimator};
use crate::dsp::gain::{estimate_gain, GainEstimationType};
use crate::dsp::mixer::mix_spectrum;
use crate::dsp::noise_floor::NoiseFloorManager;
use crate::dsp::noise_scaling::{NoiseScalingCriteria, NoiseScalingType};
use crate::dsp::postfilter::PostFilter;
use crate::dsp::smoother::SpectrumSmoother;
use crate::dsp::spectrum::{SpectralFeatures, SpectrumType};
use crate::dsp::windows::WindowType;
use crate::dsp::noise_profile::ProfileMode;
use crate::dsp::utils::{db_to_gain, db_to_power};
use crate::params::DenoiseParameters;

const DEFAULT_OVERSUBTRACTION: f32 = 2.0;
const DEFAULT_UNDERSUBTRACTION: f32 = 0.005;

/// Maps the smoothing percentage onto the NLM `h` parameter
/// (linear-SNR distance units).
const NLM_H_SCALE: f32 = 10.0;

/// Immutable per-variant configuration built at construction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VariantConfig {
    pub analysis_window: WindowType,
    pub synthesis_window: WindowType,
    pub overlap_factor: usize,
    pub spectrum_type: SpectrumType,
    pub gain_type: GainEstimationType,
    pub band_scale: BandScale,
    pub masking_absolute_floor: bool,
}

pub(crate) const PROFILE_VARIANT: VariantConfig = VariantConfig {
    analysis_window: WindowType::Hann,
    synthesis_window: WindowType::Hann,
    overlap_factor: 4,
    spectrum_type: SpectrumType::Power,
    gain_type: GainEstimationType::GeneralizedSpectralSubtraction,
    band_scale: BandScale::Bark,
    masking_absolute_floor: true,
};

pub(crate) const ADAPTIVE_VARIANT: VariantConfig = VariantConfig {
    analysis_window: WindowType::Hann,
    synthesis_window: WindowType::Hann,
    overlap_factor: 4,
    spectrum_type: SpectrumType::Power,
    gain_type: GainEstimationType::Wiener,
    band_scale: BandScale::Bark,
    masking_absolute_floor: true,
};

pub(crate) const TWO_DIM_VARIANT: VariantConfig = VariantConfig {
    analysis_window: WindowType::Vorbis,
    synthesis_window: WindowType::Vorbis,
    overlap_factor: 4,
    spectrum_type: SpectrumType::Power,
    gain_type: GainEstimationType::Wiener,
    band_scale: BandScale::Bark,
    // Only real signal content may mask noise in the 2D veto.
    masking_absolute_floor: false,
};

/// Parameter block resolved to the linear coefficients the frame loop
/// consumes. Recomputed whole on every `load_parameters`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedParameters {
    pub learn_noise: bool,
    pub mode: ProfileMode,
    pub residual_listen: bool,
    /// Attenuation ceiling as a linear gain floor coefficient.
    pub reduction: f32,
    /// Time smoothing factor in [0, 1].
    pub smoothing: f32,
    /// NLM h parameter (2D variant reading of the smoothing knob).
    pub nlm_h: f32,
    /// Whitening intensity in [0, 1].
    pub whitening: f32,
    pub scaling_type: NoiseScalingType,
    pub over: f32,
    pub under: f32,
    /// Post-filter zeta threshold, linear power ratio.
    pub postfilter_threshold: f32,
    pub method: EstimatorMethod,
    pub adaptive_noise: bool,
    pub transient_protection: bool,
}

impl ResolvedParameters {
    pub fn from_block(p: &DenoiseParameters) -> Self {
        let reduction_db = p.reduction_amount.clamp(0.0, 40.0);
        let smoothing = p.smoothing_factor.clamp(0.0, 100.0) / 100.0;
        Self {
            learn_noise: p.learn_noise > 0,
            mode: ProfileMode::from_int(p.noise_reduction_mode).unwrap_or(ProfileMode::RollingMean),
            residual_listen: p.residual_listen,
            reduction: db_to_gain(-reduction_db),
            smoothing,
            nlm_h: smoothing * NLM_H_SCALE,
            whitening: p.whitening_factor.clamp(0.0, 100.0) / 100.0,
            scaling_type: NoiseScalingType::from_int(p.noise_scaling_type),
            over: DEFAULT_OVERSUBTRACTION + (db_to_gain(p.noise_rescale) - 1.0),
            under: DEFAULT_UNDERSUBTRACTION,
            postfilter_threshold: db_to_power(p.post_filter_threshold.clamp(-40.0, 0.0)),
            method: EstimatorMethod::from_int(p.noise_estimation_method),
            adaptive_noise: p.adaptive_noise,
            transient_protection: p.transient_protection,
        }
    }
}

impl Default for ResolvedParameters {
    fn default() -> Self {
        Self::from_block(&DenoiseParameters::default())
    }
}

/// The frame-level reduction chain shared by all variants.
pub(crate) struct ReductionPipeline {
    features: SpectralFeatures,
    scaling: NoiseScalingCriteria,
    smoother: SpectrumSmoother,
    floor: NoiseFloorManager,
    postfilter: PostFilter,
    gain_type: GainEstimationType,

    ref_spec: Vec<f32>,
    gain: Vec<f32>,
}

impl ReductionPipeline {
    pub fn new(sample_rate: u32, fft_size: usize, config: &VariantConfig) -> Self {
        let real_size = fft_size / 2 + 1;
        Self {
            features: SpectralFeatures::new(config.spectrum_type, fft_size),
            scaling: NoiseScalingCriteria::new(
                sample_rate,
                fft_size,
                config.band_scale,
                config.masking_absolute_floor,
            ),
            smoother: SpectrumSmoother::new(real_size),
            floor: NoiseFloorManager::new(real_size),
            postfilter: PostFilter::new(real_size),
            gain_type: config.gain_type,
            ref_spec: vec![0.0; real_size],
            gain: vec![1.0; fft_size],
        }
    }

    /// Reference spectrum of a half-complex frame, for learn paths and
    /// noise estimation.
    pub fn reference<'a>(&'a mut self, spectrum: &[f32]) -> &'a [f32] {
        self.features.compute(spectrum)
    }

    pub fn reference_into(&self, spectrum: &[f32], out: &mut [f32]) {
        self.features.compute_into(spectrum, out);
    }

    /// Runs the full reduction chain on one frame, mixing the result back
    /// into `spectrum`. `noise` drives scaling and gain estimation;
    /// `floor_noise` shapes the whitening weights (the 2D variant hands
    /// in the raw delayed estimate there).
    pub fn reduce(
        &mut self,
        spectrum: &mut [f32],
        noise: &[f32],
        floor_noise: &[f32],
        p: &ResolvedParameters,
    ) {
        self.features.compute_into(spectrum, &mut self.ref_spec);

        self.scaling
            .compute(&self.ref_spec, noise, p.over, p.under, p.scaling_type);

        self.smoother
            .smooth(&mut self.ref_spec, p.smoothing, p.transient_protection);

        estimate_gain(
            self.gain_type,
            &self.ref_spec,
            noise,
            self.scaling.alpha(),
            self.scaling.beta(),
            &mut self.gain,
        );

        self.floor
            .apply_floor(&mut self.gain, floor_noise, p.reduction, p.whitening);

        self.postfilter.apply(
            &mut self.gain,
            &self.ref_spec,
            p.postfilter_threshold,
            p.reduction,
        );

        NoiseFloorManager::mirror(&mut self.gain);

        mix_spectrum(spectrum, &self.gain, p.residual_listen);
    }

    pub fn reset(&mut self) {
        self.smoother.reset();
        self.gain.fill(1.0);
    }
}

/// Adaptive estimation stage shared by the adaptive and 2D variants. The
/// optional floor realizes the manual-profile-as-minimum behavior: both
/// the tracker state and its per-frame output are clamped to it.
pub(crate) struct AdaptiveSection {
    estimator: NoiseEstimator,
    noise: Vec<f32>,
}

impl AdaptiveSection {
    pub fn new(sample_rate: u32, fft_size: usize, hop: usize) -> Self {
        Self {
            estimator: NoiseEstimator::new(EstimatorMethod::Louizou, sample_rate, fft_size, hop),
            noise: vec![0.0; fft_size / 2 + 1],
        }
    }

    /// Switches the tracking algorithm. Reallocates; only callable from
    /// `load_parameters`.
    pub fn set_method(&mut self, method: EstimatorMethod) {
        self.estimator.switch_method(method);
    }

    pub fn estimate(&mut self, ref_spec: &[f32], floor: Option<&[f32]>) -> &[f32] {
        if let Some(f) = floor {
            self.estimator.apply_floor(f);
        }
        self.estimator.run(ref_spec, &mut self.noise);
        if let Some(f) = floor {
            for (n, &fv) in self.noise.iter_mut().zip(f.iter()) {
                *n = n.max(fv);
            }
        }
        &self.noise
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_parameters_clip_and_convert() {
        let mut p = DenoiseParameters::default();
        p.reduction_amount = 20.0;
        p.smoothing_factor = 250.0;
        p.whitening_factor = -5.0;
        p.noise_reduction_mode = 9;
        let r = ResolvedParameters::from_block(&p);

        assert!((r.reduction - 0.1).abs() < 1e-6);
        assert_eq!(r.smoothing, 1.0);
        assert_eq!(r.whitening, 0.0);
        assert_eq!(r.mode, ProfileMode::RollingMean);
    }

    #[test]
    fn test_zero_reduction_resolves_to_unity_floor() {
        let mut p = DenoiseParameters::default();
        p.reduction_amount = 0.0;
        let r = ResolvedParameters::from_block(&p);
        assert!((r.reduction - 1.0).abs() < 1e-7);
    }

    #[test]
    fn test_noise_rescale_raises_oversubtraction() {
        let mut p = DenoiseParameters::default();
        p.noise_rescale = 0.0;
        let base = ResolvedParameters::from_block(&p).over;
        p.noise_rescale = 6.0;
        let raised = ResolvedParameters::from_block(&p).over;
        assert!(raised > base);
    }

    #[test]
    fn test_unity_reduction_pipeline_is_passthrough() {
        let fft_size = 512;
        let mut pipeline = ReductionPipeline::new(44100, fft_size, &ADAPTIVE_VARIANT);
        let mut p = DenoiseParameters::default();
        p.reduction_amount = 0.0;
        p.smoothing_factor = 0.0;
        p.whitening_factor = 0.0;
        let r = ResolvedParameters::from_block(&p);

        let mut spectrum: Vec<f32> = (0..fft_size).map(|i| ((i % 17) as f32 - 8.0) * 0.1).collect();
        let original = spectrum.clone();
        let noise = vec![0.5f32; fft_size / 2 + 1];
        pipeline.reduce(&mut spectrum, &noise, &noise, &r);

        for (a, b) in spectrum.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-5, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_reduction_attenuates_noisy_spectrum() {
        let fft_size = 512;
        let mut pipeline = ReductionPipeline::new(44100, fft_size, &ADAPTIVE_VARIANT);
        let mut p = DenoiseParameters::default();
        p.reduction_amount = 40.0;
        let r = ResolvedParameters::from_block(&p);

        let mut spectrum = vec![0.1f32; fft_size];
        let noise = vec![0.1f32 * 0.1; fft_size / 2 + 1];
        pipeline.reduce(&mut spectrum, &noise, &noise, &r);

        let energy: f32 = spectrum.iter().map(|v| v * v).sum();
        assert!(energy < 0.1 * 0.1 * fft_size as f32 * 0.9);
    }

    #[test]
    fn test_adaptive_section_floor_clamps_output() {
        let mut s = AdaptiveSection::new(44100, 256, 64);
        let ref_spec = vec![0.001f32; 129];
        let floor = vec![0.4f32; 129];
        let n = s.estimate(&ref_spec, Some(&floor)).to_vec();
        assert!(n.iter().all(|&v| v >= 0.4));
    }
}
