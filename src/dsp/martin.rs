//! Martin minimum-statistics noise tracker.
//!
//! Smoothed periodogram minima over a sliding window realized as
//! sub-window minima plus a ring of historical sub-window minima. The
//! bias of taking a minimum of a smoothed PSD is compensated with a fixed
//! correction factor.

pub const MARTIN_SUBWIN_COUNT: usize = 8;
pub const MARTIN_SUBWIN_LEN: usize = 12;
const MARTIN_SMOOTH_ALPHA: f32 = 0.85;
const MARTIN_BIAS_CORR: f32 = 1.5;

pub struct MartinEstimator {
    psd: Vec<f32>,
    current_min: Vec<f32>,
    /// `MARTIN_SUBWIN_COUNT` rows of historical sub-window minima.
    min_history: Vec<f32>,
    history_head: usize,
    history_filled: usize,
    subwin_counter: usize,
    primed: bool,
    size: usize,
}

impl MartinEstimator {
    pub fn new(real_spectrum_size: usize) -> Self {
        Self {
            psd: vec![0.0; real_spectrum_size],
            current_min: vec![0.0; real_spectrum_size],
            min_history: vec![f32::MAX; MARTIN_SUBWIN_COUNT * real_spectrum_size],
            history_head: 0,
            history_filled: 0,
            subwin_counter: 0,
            primed: false,
            size: real_spectrum_size,
        }
    }

    pub fn run(&mut self, spectrum: &[f32], noise: &mut [f32]) {
        debug_assert_eq!(spectrum.len(), self.size);
        debug_assert_eq!(noise.len(), self.size);

        if !self.primed {
            self.psd.copy_from_slice(spectrum);
            self.current_min.copy_from_slice(spectrum);
            noise.copy_from_slice(spectrum);
            self.primed = true;
            return;
        }

        for k in 0..self.size {
            let p = MARTIN_SMOOTH_ALPHA * self.psd[k] + (1.0 - MARTIN_SMOOTH_ALPHA) * spectrum[k];
            self.psd[k] = p;
            if p < self.current_min[k] {
                self.current_min[k] = p;
            }
        }

        self.subwin_counter += 1;
        if self.subwin_counter >= MARTIN_SUBWIN_LEN {
            let base = self.history_head * self.size;
            self.min_history[base..base + self.size].copy_from_slice(&self.current_min);
            self.history_head = (self.history_head + 1) % MARTIN_SUBWIN_COUNT;
            self.history_filled = (self.history_filled + 1).min(MARTIN_SUBWIN_COUNT);
            self.current_min.copy_from_slice(&self.psd);
            self.subwin_counter = 0;
        }

        for k in 0..self.size {
            let mut m = self.current_min[k];
            for row in 0..self.history_filled {
                let v = self.min_history[row * self.size + k];
                if v < m {
                    m = v;
                }
            }
            noise[k] = MARTIN_BIAS_CORR * m;
        }
    }

    pub fn set_state(&mut self, profile: &[f32]) {
        self.psd.copy_from_slice(profile);
        self.current_min.copy_from_slice(profile);
        self.min_history.fill(f32::MAX);
        self.history_head = 0;
        self.history_filled = 0;
        self.subwin_counter = 0;
        self.primed = true;
    }

    pub fn update_seed(&mut self, profile: &[f32]) {
        self.set_state(profile);
    }

    pub fn apply_floor(&mut self, floor: &[f32]) {
        for k in 0..self.size {
            self.psd[k] = self.psd[k].max(floor[k]);
            self.current_min[k] = self.current_min[k].max(floor[k]);
        }
        for row in 0..self.history_filled {
            for k in 0..self.size {
                let v = &mut self.min_history[row * self.size + k];
                *v = v.max(floor[k]);
            }
        }
    }
}
