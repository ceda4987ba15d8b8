//! Reference spectrum extraction from the half-complex layout.

use crate::dsp::utils::SPECTRAL_EPS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumType {
    Power,
    Magnitude,
}

/// Derives the length-`K` reference spectrum the estimators and gain
/// computation run on. Output buffer is owned here so the hot path never
/// allocates.
pub struct SpectralFeatures {
    kind: SpectrumType,
    spectrum: Vec<f32>,
    fft_size: usize,
}

impl SpectralFeatures {
    pub fn new(kind: SpectrumType, fft_size: usize) -> Self {
        Self {
            kind,
            spectrum: vec![0.0; fft_size / 2 + 1],
            fft_size,
        }
    }

    pub fn real_spectrum_size(&self) -> usize {
        self.spectrum.len()
    }

    /// Computes the reference spectrum from an R2HC buffer and returns it.
    pub fn compute<'a>(&'a mut self, half_complex: &[f32]) -> &'a [f32] {
        debug_assert_eq!(half_complex.len(), self.fft_size);
        let n = self.fft_size;
        let half = n / 2;

        self.spectrum[0] = half_complex[0] * half_complex[0];
        self.spectrum[half] = half_complex[half] * half_complex[half];
        for k in 1..half {
            let re = half_complex[k];
            let im = half_complex[n - k];
            self.spectrum[k] = re * re + im * im;
        }

        if self.kind == SpectrumType::Magnitude {
            for v in self.spectrum.iter_mut() {
                *v = v.sqrt();
            }
        }

        &self.spectrum
    }

    /// Compute into a caller-provided buffer, leaving the internal one
    /// untouched. Used where two frames are in flight at once (2D delay).
    pub fn compute_into(&self, half_complex: &[f32], out: &mut [f32]) {
        debug_assert_eq!(half_complex.len(), self.fft_size);
        debug_assert_eq!(out.len(), self.spectrum.len());
        let n = self.fft_size;
        let half = n / 2;

        out[0] = half_complex[0] * half_complex[0];
        out[half] = half_complex[half] * half_complex[half];
        for k in 1..half {
            let re = half_complex[k];
            let im = half_complex[n - k];
            out[k] = re * re + im * im;
        }
        if self.kind == SpectrumType::Magnitude {
            for v in out.iter_mut() {
                *v = v.sqrt();
            }
        }
    }

    pub fn last(&self) -> &[f32] {
        &self.spectrum
    }
}

/// Per-bin a-posteriori SNR `x / max(n, eps)` into `out`.
pub fn snr_spectrum(signal: &[f32], noise: &[f32], out: &mut [f32]) {
    debug_assert_eq!(signal.len(), noise.len());
    debug_assert_eq!(signal.len(), out.len());
    for ((o, &x), &n) in out.iter_mut().zip(signal.iter()).zip(noise.iter()) {
        *o = x / n.max(SPECTRAL_EPS);
    }
}
