//! Real-time single-channel spectral noise reduction.
//!
//! Three processors share an STFT-based spectral core and differ in
//! where the noise estimate comes from:
//!
//! - [`ProfileDenoiser`] - capture a noise profile first (learn mode),
//!   then subtract it.
//! - [`AdaptiveDenoiser`] - track the noise continuously with one of four
//!   per-bin estimators.
//! - [`TwoDimDenoiser`] - adaptive tracking plus a Non-Local-Means
//!   smoothing stage over the time-frequency SNR map, at the cost of a
//!   little look-ahead latency.
//!
//! All processors consume mono `f32` samples in blocks of any size and
//! emit the denoised stream delayed by [`ProfileDenoiser::latency`] (or
//! the 2D equivalent) samples. The hot path performs no allocation, no
//! locking and no system calls; instances are independent and may run on
//! separate threads.
//!
//! ```no_run
//! use specscrub::{DenoiseParameters, ProfileDenoiser};
//!
//! let mut denoiser = ProfileDenoiser::new(44100, 46.0).expect("supported configuration");
//!
//! // Capture a second of room tone.
//! let mut params = DenoiseParameters::default();
//! params.learn_noise = 1;
//! denoiser.load_parameters(&params);
//! # let room_tone = vec![0.0f32; 44100];
//! let mut scratch = vec![0.0f32; room_tone.len()];
//! denoiser.process(&room_tone, &mut scratch);
//!
//! // Then reduce.
//! params.learn_noise = 0;
//! params.reduction_amount = 20.0;
//! denoiser.load_parameters(&params);
//! # let recording = vec![0.0f32; 44100];
//! let mut cleaned = vec![0.0f32; recording.len()];
//! denoiser.process(&recording, &mut cleaned);
//! ```

pub mod dsp;

mod denoiser;
mod params;

pub use denoiser::{AdaptiveDenoiser, ProfileDenoiser, TwoDimDenoiser};
pub use dsp::noise_profile::{NoiseProfileSnapshot, ProfileMode};
pub use params::DenoiseParameters;
