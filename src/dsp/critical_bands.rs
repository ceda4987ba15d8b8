//! Psychoacoustic critical-band partitioning of the real spectrum.
//!
//! Two compiled band layouts: the classic Bark scale and the 5 ms band
//! layout used by Opus. Band boundaries are mapped to FFT bins once at
//! construction; bands above Nyquist are dropped.

/// Bark scale band edges in Hz.
const BARK_EDGES_HZ: [f32; 26] = [
    0.0, 100.0, 200.0, 300.0, 400.0, 510.0, 630.0, 770.0, 920.0, 1080.0, 1270.0, 1480.0, 1720.0,
    2000.0, 2320.0, 2700.0, 3150.0, 3700.0, 4400.0, 5300.0, 6400.0, 7700.0, 9500.0, 12000.0,
    15500.0, 20500.0,
];

/// Opus 5 ms band edges in Hz.
const OPUS_EDGES_HZ: [f32; 22] = [
    0.0, 200.0, 400.0, 600.0, 800.0, 1000.0, 1200.0, 1400.0, 1600.0, 2000.0, 2400.0, 2800.0,
    3200.0, 4000.0, 4800.0, 5600.0, 6800.0, 8000.0, 9600.0, 12000.0, 15600.0, 20000.0,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandScale {
    Bark,
    Opus,
}

#[derive(Debug, Clone, Copy)]
pub struct BandIndexes {
    pub start: usize,
    pub end: usize,
}

pub struct CriticalBands {
    bands: Vec<BandIndexes>,
    /// Band index for every spectrum bin, for broadcast operations.
    bin_to_band: Vec<usize>,
}

impl CriticalBands {
    pub fn new(scale: BandScale, sample_rate: u32, fft_size: usize) -> Self {
        let edges: &[f32] = match scale {
            BandScale::Bark => &BARK_EDGES_HZ,
            BandScale::Opus => &OPUS_EDGES_HZ,
        };

        let real_size = fft_size / 2 + 1;
        let nyquist = sample_rate as f32 / 2.0;
        let hz_per_bin = sample_rate as f32 / fft_size as f32;

        // Bands partition the spectrum: each starts where the previous
        // one ended, the last one reaches Nyquist.
        let mut bands: Vec<BandIndexes> = Vec::new();
        let mut cursor = 0usize;
        for w in edges.windows(2) {
            let (lo, hi) = (w[0], w[1]);
            if lo >= nyquist || cursor >= real_size {
                break;
            }
            let start = cursor;
            let end = ((hi / hz_per_bin).floor() as usize)
                .clamp(start + 1, real_size);
            bands.push(BandIndexes { start, end });
            cursor = end;
        }
        if let Some(last) = bands.last_mut() {
            last.end = real_size;
        }

        let mut bin_to_band = vec![0usize; real_size];
        for (b, idx) in bands.iter().enumerate() {
            for bin in idx.start..idx.end {
                bin_to_band[bin] = b;
            }
        }

        Self { bands, bin_to_band }
    }

    pub fn number_of_bands(&self) -> usize {
        self.bands.len()
    }

    pub fn band_indexes(&self, band: usize) -> BandIndexes {
        self.bands[band]
    }

    pub fn band_of_bin(&self, bin: usize) -> usize {
        self.bin_to_band[bin]
    }

    /// Sums per-bin energies into their bands. `out` must hold
    /// `number_of_bands()` entries.
    pub fn compute_critical_bands_spectrum(&self, spectrum: &[f32], out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.bands.len());
        debug_assert_eq!(spectrum.len(), self.bin_to_band.len());
        out.fill(0.0);
        for (bin, &v) in spectrum.iter().enumerate() {
            out[self.bin_to_band[bin]] += v;
        }
    }
}
