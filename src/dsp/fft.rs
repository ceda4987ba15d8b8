//! FFT adapter producing the half-complex (R2HC) spectral layout.
//!
//! Every in-place spectral operation in this crate reads a length-`N` real
//! buffer laid out FFTW-style: index 0 is the DC real part, `1..N/2-1` are
//! the real parts of the positive bins, `N/2` is the Nyquist real part and
//! `N/2+1..N-1` are the imaginary parts of bins `N/2-1..1`. rustfft works
//! on complex buffers, so this adapter packs and unpacks around the
//! preplanned transforms. Plans and scratch are created once per instance.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

pub struct FftAdapter {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,

    complex_buf: Vec<Complex<f32>>,
    fft_scratch: Vec<Complex<f32>>,
    ifft_scratch: Vec<Complex<f32>>,

    size: usize,
}

impl FftAdapter {
    pub fn new(size: usize) -> Self {
        assert!(size >= 4 && size % 2 == 0, "fft size must be even");

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);
        let fft_scratch_len = fft.get_inplace_scratch_len();
        let ifft_scratch_len = ifft.get_inplace_scratch_len();

        Self {
            fft,
            ifft,
            complex_buf: vec![Complex::default(); size],
            fft_scratch: vec![Complex::default(); fft_scratch_len],
            ifft_scratch: vec![Complex::default(); ifft_scratch_len],
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Real spectrum size `K = N/2 + 1`.
    pub fn real_spectrum_size(&self) -> usize {
        self.size / 2 + 1
    }

    /// Forward transform: `buf` holds `N` time samples on entry and the
    /// R2HC packed spectrum on exit.
    pub fn forward(&mut self, buf: &mut [f32]) {
        debug_assert_eq!(buf.len(), self.size);
        let n = self.size;
        let half = n / 2;

        for (c, &x) in self.complex_buf.iter_mut().zip(buf.iter()) {
            *c = Complex::new(x, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.complex_buf, &mut self.fft_scratch);

        buf[0] = self.complex_buf[0].re;
        buf[half] = self.complex_buf[half].re;
        for k in 1..half {
            buf[k] = self.complex_buf[k].re;
            buf[n - k] = self.complex_buf[k].im;
        }
    }

    /// Inverse transform: `buf` holds an R2HC packed spectrum on entry and
    /// `N` time samples on exit. Includes the `1/N` normalization.
    pub fn backward(&mut self, buf: &mut [f32]) {
        debug_assert_eq!(buf.len(), self.size);
        let n = self.size;
        let half = n / 2;

        self.complex_buf[0] = Complex::new(buf[0], 0.0);
        self.complex_buf[half] = Complex::new(buf[half], 0.0);
        for k in 1..half {
            let c = Complex::new(buf[k], buf[n - k]);
            self.complex_buf[k] = c;
            self.complex_buf[n - k] = c.conj();
        }

        self.ifft
            .process_with_scratch(&mut self.complex_buf, &mut self.ifft_scratch);

        let norm = 1.0 / n as f32;
        for (x, c) in buf.iter_mut().zip(self.complex_buf.iter()) {
            *x = c.re * norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_recovers_signal() {
        let n = 64;
        let mut fft = FftAdapter::new(n);
        let original: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 3.0 * i as f32 / n as f32).sin() * 0.7)
            .collect();

        let mut buf = original.clone();
        fft.forward(&mut buf);
        fft.backward(&mut buf);

        for (a, b) in original.iter().zip(buf.iter()) {
            assert!((a - b).abs() < 1e-5, "roundtrip error {} vs {}", a, b);
        }
    }

    #[test]
    fn test_dc_signal_lands_in_bin_zero() {
        let n = 32;
        let mut fft = FftAdapter::new(n);
        let mut buf = vec![1.0f32; n];
        fft.forward(&mut buf);

        assert!((buf[0] - n as f32).abs() < 1e-4);
        for k in 1..n {
            assert!(buf[k].abs() < 1e-4, "leakage at {}: {}", k, buf[k]);
        }
    }

    #[test]
    fn test_pure_tone_layout() {
        // cos(2*pi*5*t) should produce a real component at bin 5 and its
        // mirrored imaginary slot should stay ~0.
        let n = 64;
        let mut fft = FftAdapter::new(n);
        let mut buf: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 5.0 * i as f32 / n as f32).cos())
            .collect();
        fft.forward(&mut buf);

        assert!((buf[5] - n as f32 / 2.0).abs() < 1e-3);
        assert!(buf[n - 5].abs() < 1e-3);
    }
}
