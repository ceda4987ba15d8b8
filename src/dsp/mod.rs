//! Spectral DSP components, one module per pipeline stage.
//!
//! ## Streaming front end
//! - [`stft`] - overlap-add streaming engine
//! - [`fft`] - half-complex FFT adapter
//! - [`windows`] - window functions + overlap-add normalization
//! - [`spectrum`] - reference spectrum extraction
//!
//! ## Noise estimation
//! - [`noise_profile`] - learned profile store (rolling mean / median / max)
//! - [`louizou`], [`spp_mmse`], [`martin`], [`brandt`] - adaptive trackers
//! - [`estimator`] - tracker dispatcher with the shared silence gate
//!
//! ## Gain computation
//! - [`critical_bands`], [`masking`] - psychoacoustic groundwork
//! - [`noise_scaling`] - per-bin oversubtraction criteria
//! - [`smoother`] - time smoothing with transient protection
//! - [`gain`] - Wiener / Gates / generalized spectral subtraction
//! - [`noise_floor`] - gain floor + whitening weights
//! - [`postfilter`] - musical-noise moving average
//! - [`nlm`] - 2D Non-Local-Means SNR smoother
//! - [`mixer`] - gain application / residual listen
//!
//! ## Utilities
//! - [`utils`] - shared scalar helpers and epsilons

pub mod brandt;
pub mod critical_bands;
pub mod estimator;
pub mod fft;
pub mod gain;
pub mod louizou;
pub mod martin;
pub mod masking;
pub mod mixer;
pub mod nlm;
pub mod noise_floor;
pub mod noise_profile;
pub mod noise_scaling;
pub mod postfilter;
pub mod smoother;
pub mod spectrum;
pub mod spp_mmse;
pub mod stft;
pub mod utils;
pub mod windows;

pub use estimator::{EstimatorMethod, NoiseEstimator};
pub use gain::GainEstimationType;
pub use noise_profile::{NoiseProfileSnapshot, NoiseProfileStore, ProfileMode};
pub use noise_scaling::NoiseScalingType;
pub use spectrum::SpectrumType;
pub use stft::StftEngine;
pub use windows::WindowType;
