//! Non-Local-Means smoothing over the time-frequency SNR map.
//!
//! A ring of `past + future + 1` SNR frames forms a small 2D image. For
//! every paste block along the frequency axis, candidate patches at
//! nearby time/frequency offsets are compared against the patch around
//! the target position; similar patches contribute their bins weighted by
//! `exp(-distance / h^2)`. Working on SNR rather than raw spectra makes
//! the similarity measure level independent, which is what lets the
//! smoother erase isolated musical-noise peaks without dulling real
//! structure. The target frame sits `future` frames behind the newest
//! push, so the caller carries that much extra latency.

pub const NLM_PAST_FRAMES: usize = 4;
pub const NLM_FUTURE_FRAMES: usize = 1;
const NLM_PATCH_SIZE: usize = 4;
const NLM_PASTE_SIZE: usize = 2;
const NLM_FREQ_SEARCH: isize = 4;

pub struct NlmSmoother {
    /// Time-ordered ring, `frame_count * spectrum_size`, oldest first
    /// relative to `head`.
    frames: Vec<f32>,
    head: usize,
    filled: usize,

    weights: Vec<f32>,
    output: Vec<f32>,

    frame_count: usize,
    spectrum_size: usize,
    past: usize,
    future: usize,
}

impl NlmSmoother {
    pub fn new(spectrum_size: usize) -> Self {
        let frame_count = NLM_PAST_FRAMES + NLM_FUTURE_FRAMES + 1;
        Self {
            frames: vec![0.0; frame_count * spectrum_size],
            head: 0,
            filled: 0,
            weights: vec![0.0; spectrum_size],
            output: vec![0.0; spectrum_size],
            frame_count,
            spectrum_size,
            past: NLM_PAST_FRAMES,
            future: NLM_FUTURE_FRAMES,
        }
    }

    pub fn future_frames(&self) -> usize {
        self.future
    }

    pub fn push(&mut self, snr_frame: &[f32]) {
        debug_assert_eq!(snr_frame.len(), self.spectrum_size);
        let base = self.head * self.spectrum_size;
        self.frames[base..base + self.spectrum_size].copy_from_slice(snr_frame);
        self.head = (self.head + 1) % self.frame_count;
        self.filled = (self.filled + 1).min(self.frame_count);
    }

    pub fn ready(&self) -> bool {
        self.filled == self.frame_count
    }

    /// Number of frames pushed so far, saturating at the ring size.
    pub fn frames_available(&self) -> usize {
        self.filled
    }

    /// Logical index (0 = oldest available) of the target frame.
    fn target_index(&self) -> usize {
        self.filled.saturating_sub(1 + self.future)
    }

    #[inline]
    fn at(&self, logical_t: usize, bin: usize) -> f32 {
        // logical 0 is the oldest of the `filled` frames.
        let physical =
            (self.head + self.frame_count - self.filled + logical_t) % self.frame_count;
        self.frames[physical * self.spectrum_size + bin]
    }

    #[inline]
    fn at_clamped(&self, t: isize, k: isize) -> f32 {
        let t = t.clamp(0, self.filled as isize - 1) as usize;
        let k = k.clamp(0, self.spectrum_size as isize - 1) as usize;
        self.at(t, k)
    }

    /// Smooths the target frame into `out`. Requires at least
    /// `future + 1` pushed frames; the time search clamps to whatever
    /// history exists.
    pub fn smooth(&mut self, h: f32, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.spectrum_size);
        let target = self.target_index() as isize;
        let h2 = (h * h).max(f32::MIN_POSITIVE);
        let distance_cap = 4.0 * h2;
        let patch_lo = -(NLM_PATCH_SIZE as isize / 2);
        let patch_hi = NLM_PATCH_SIZE as isize / 2;

        self.output.fill(0.0);
        self.weights.fill(0.0);

        let mut k0 = 0isize;
        while (k0 as usize) < self.spectrum_size {
            for df in -NLM_FREQ_SEARCH..=NLM_FREQ_SEARCH {
                for dt in -(self.past as isize)..=(self.future as isize) {
                    // Patch distance between the target position and the
                    // shifted candidate.
                    let mut distance = 0.0f32;
                    for a in patch_lo..patch_hi {
                        for b in patch_lo..patch_hi {
                            let r = self.at_clamped(target + a, k0 + b);
                            let c = self.at_clamped(target + dt + a, k0 + df + b);
                            let d = r - c;
                            distance += d * d;
                        }
                    }
                    if distance > distance_cap {
                        continue;
                    }
                    let weight = (-distance / h2).exp();

                    for j in 0..NLM_PASTE_SIZE as isize {
                        let k = k0 + j;
                        if (k as usize) >= self.spectrum_size {
                            break;
                        }
                        let candidate = self.at_clamped(target + dt, k + df);
                        self.output[k as usize] += weight * candidate;
                        self.weights[k as usize] += weight;
                    }
                }
            }
            k0 += NLM_PASTE_SIZE as isize;
        }

        for k in 0..self.spectrum_size {
            out[k] = if self.weights[k] > 0.0 {
                self.output[k] / self.weights[k]
            } else {
                self.at(target as usize, k)
            };
        }
    }

    pub fn reset(&mut self) {
        self.frames.fill(0.0);
        self.head = 0;
        self.filled = 0;
    }
}
