//! Noise profile storage and the learn-mode profile estimator.
//!
//! Three independent profiles are learned simultaneously from successive
//! reference spectra: a rolling mean, a per-bin median over a short
//! trailing buffer, and an element-wise maximum. Which one is used during
//! reduction is a parameter. Profiles can be exported/imported as a serde
//! snapshot so callers can persist a learned room tone between sessions.
//!
//! Bin 0 (DC) is never written by the learn rules.

use crate::dsp::utils::SPECTRAL_EPS;
use serde::{Deserialize, Serialize};

/// Blocks after which the rolling-mean profile counts as usable.
pub const MIN_WINDOWS_NOISE_AVERAGED: u32 = 5;

/// Depth of the trailing buffer backing the median profile.
pub const MEDIAN_SPECTRUM_DEPTH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileMode {
    RollingMean,
    Median,
    Max,
}

impl ProfileMode {
    /// Parameter-block encoding: 1 = rolling mean, 2 = median, 3 = max.
    pub fn from_int(v: i32) -> Option<Self> {
        match v {
            1 => Some(Self::RollingMean),
            2 => Some(Self::Median),
            3 => Some(Self::Max),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::RollingMean => 0,
            Self::Median => 1,
            Self::Max => 2,
        }
    }
}

struct ModeProfile {
    values: Vec<f32>,
    blocks_averaged: u32,
    available: bool,
}

impl ModeProfile {
    fn new(size: usize) -> Self {
        Self {
            values: vec![0.0; size],
            blocks_averaged: 0,
            available: false,
        }
    }

    fn clear(&mut self) {
        self.values.fill(0.0);
        self.blocks_averaged = 0;
        self.available = false;
    }
}

pub struct NoiseProfileStore {
    modes: [ModeProfile; 3],

    median_history: Vec<f32>, // MEDIAN_SPECTRUM_DEPTH * size, ring
    median_head: usize,
    median_filled: usize,
    median_scratch: [f32; MEDIAN_SPECTRUM_DEPTH],

    size: usize,
}

impl NoiseProfileStore {
    pub fn new(size: usize) -> Self {
        Self {
            modes: [
                ModeProfile::new(size),
                ModeProfile::new(size),
                ModeProfile::new(size),
            ],
            median_history: vec![0.0; MEDIAN_SPECTRUM_DEPTH * size],
            median_head: 0,
            median_filled: 0,
            median_scratch: [0.0; MEDIAN_SPECTRUM_DEPTH],
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs all three learn rules against one reference spectrum.
    pub fn learn(&mut self, spectrum: &[f32]) {
        debug_assert_eq!(spectrum.len(), self.size);

        // Rolling mean, bin 0 untouched.
        {
            let p = &mut self.modes[ProfileMode::RollingMean.index()];
            p.blocks_averaged += 1;
            let inv = 1.0 / p.blocks_averaged as f32;
            for k in 1..self.size {
                p.values[k] += (spectrum[k] - p.values[k]) * inv;
                p.values[k] = p.values[k].max(0.0);
            }
            if p.blocks_averaged > MIN_WINDOWS_NOISE_AVERAGED {
                p.available = true;
            }
        }

        // Median over the trailing ring.
        {
            let base = self.median_head * self.size;
            self.median_history[base..base + self.size].copy_from_slice(spectrum);
            self.median_head = (self.median_head + 1) % MEDIAN_SPECTRUM_DEPTH;
            self.median_filled = (self.median_filled + 1).min(MEDIAN_SPECTRUM_DEPTH);

            let depth = self.median_filled;
            let p = &mut self.modes[ProfileMode::Median.index()];
            for k in 1..self.size {
                for d in 0..depth {
                    self.median_scratch[d] = self.median_history[d * self.size + k];
                }
                let slot = &mut self.median_scratch[..depth];
                slot.sort_unstable_by(f32::total_cmp);
                let median = slot[depth / 2];
                if median > p.values[k] {
                    p.values[k] = median;
                }
            }
            p.blocks_averaged += 1;
            if self.median_filled == MEDIAN_SPECTRUM_DEPTH {
                p.available = true;
            }
        }

        // Element-wise max, available immediately.
        {
            let p = &mut self.modes[ProfileMode::Max.index()];
            for k in 1..self.size {
                if spectrum[k] > p.values[k] {
                    p.values[k] = spectrum[k];
                }
            }
            p.blocks_averaged += 1;
            p.available = true;
        }
    }

    pub fn profile(&self, mode: ProfileMode) -> &[f32] {
        &self.modes[mode.index()].values
    }

    pub fn blocks_averaged(&self, mode: ProfileMode) -> u32 {
        self.modes[mode.index()].blocks_averaged
    }

    pub fn available(&self, mode: ProfileMode) -> bool {
        self.modes[mode.index()].available
    }

    /// Replaces one mode's profile with caller data. Fails on size
    /// mismatch without side effects.
    pub fn load(&mut self, mode: ProfileMode, values: &[f32], blocks_averaged: u32) -> bool {
        if values.len() != self.size {
            log::warn!(
                "noise profile load rejected: got {} bins, expected {}",
                values.len(),
                self.size
            );
            return false;
        }
        let p = &mut self.modes[mode.index()];
        p.values.copy_from_slice(values);
        for v in p.values.iter_mut() {
            *v = v.max(0.0);
        }
        p.values[0] = 0.0;
        p.blocks_averaged = blocks_averaged;
        p.available = true;
        true
    }

    /// Clears all three modes and the median history.
    pub fn reset(&mut self) {
        for p in self.modes.iter_mut() {
            p.clear();
        }
        self.median_history.fill(0.0);
        self.median_head = 0;
        self.median_filled = 0;
    }

    /// True when any mode holds a usable, non-trivial profile.
    pub fn any_available(&self) -> bool {
        self.modes.iter().any(|p| {
            p.available && p.values.iter().any(|&v| v > SPECTRAL_EPS)
        })
    }

    pub fn snapshot(&self) -> NoiseProfileSnapshot {
        NoiseProfileSnapshot {
            size: self.size,
            rolling_mean: self.modes[0].values.clone(),
            median: self.modes[1].values.clone(),
            max: self.modes[2].values.clone(),
            blocks_averaged: [
                self.modes[0].blocks_averaged,
                self.modes[1].blocks_averaged,
                self.modes[2].blocks_averaged,
            ],
            available: [
                self.modes[0].available,
                self.modes[1].available,
                self.modes[2].available,
            ],
        }
    }

    pub fn restore(&mut self, snapshot: &NoiseProfileSnapshot) -> bool {
        if snapshot.size != self.size
            || snapshot.rolling_mean.len() != self.size
            || snapshot.median.len() != self.size
            || snapshot.max.len() != self.size
        {
            return false;
        }
        for (i, src) in [&snapshot.rolling_mean, &snapshot.median, &snapshot.max]
            .into_iter()
            .enumerate()
        {
            self.modes[i].values.copy_from_slice(src);
            self.modes[i].blocks_averaged = snapshot.blocks_averaged[i];
            self.modes[i].available = snapshot.available[i];
        }
        true
    }
}

/// Persistable capture of all three learned profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseProfileSnapshot {
    pub size: usize,
    pub rolling_mean: Vec<f32>,
    pub median: Vec<f32>,
    pub max: Vec<f32>,
    pub blocks_averaged: [u32; 3],
    pub available: [bool; 3],
}

impl NoiseProfileSnapshot {
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum(seed: f32, size: usize) -> Vec<f32> {
        (0..size)
            .map(|k| seed * (1.0 + (k % 5) as f32 * 0.1))
            .collect()
    }

    #[test]
    fn test_availability_progression() {
        let mut store = NoiseProfileStore::new(65);
        let s = spectrum(0.5, 65);

        store.learn(&s);
        assert!(store.available(ProfileMode::Max));
        assert!(!store.available(ProfileMode::RollingMean));
        assert!(!store.available(ProfileMode::Median));

        for _ in 0..5 {
            store.learn(&s);
        }
        assert!(store.available(ProfileMode::RollingMean));
        assert!(store.available(ProfileMode::Median));
        assert_eq!(store.blocks_averaged(ProfileMode::RollingMean), 6);
    }

    #[test]
    fn test_max_dominates_mean() {
        let mut store = NoiseProfileStore::new(33);
        for i in 0..10 {
            store.learn(&spectrum(0.1 + 0.05 * i as f32, 33));
        }
        let mean = store.profile(ProfileMode::RollingMean).to_vec();
        let max = store.profile(ProfileMode::Max).to_vec();
        for k in 1..33 {
            assert!(max[k] >= mean[k], "max < mean at bin {}", k);
        }
    }

    #[test]
    fn test_bin_zero_is_never_touched() {
        let mut store = NoiseProfileStore::new(17);
        let mut s = spectrum(1.0, 17);
        s[0] = 123.0;
        for _ in 0..8 {
            store.learn(&s);
        }
        for mode in [ProfileMode::RollingMean, ProfileMode::Median, ProfileMode::Max] {
            assert_eq!(store.profile(mode)[0], 0.0);
        }
    }

    #[test]
    fn test_load_rejects_size_mismatch() {
        let mut store = NoiseProfileStore::new(17);
        assert!(!store.load(ProfileMode::Max, &[1.0; 16], 3));
        assert!(!store.available(ProfileMode::Max));
        assert!(store.load(ProfileMode::Max, &[1.0; 17], 3));
        assert!(store.available(ProfileMode::Max));
        assert_eq!(store.blocks_averaged(ProfileMode::Max), 3);
    }

    #[test]
    fn test_snapshot_roundtrip_through_json() {
        let mut store = NoiseProfileStore::new(9);
        for _ in 0..6 {
            store.learn(&spectrum(0.3, 9));
        }
        let json = store.snapshot().to_json().unwrap();
        let snap = NoiseProfileSnapshot::from_json(&json).unwrap();

        let mut restored = NoiseProfileStore::new(9);
        assert!(restored.restore(&snap));
        assert_eq!(
            restored.profile(ProfileMode::Median),
            store.profile(ProfileMode::Median)
        );
        assert_eq!(
            restored.blocks_averaged(ProfileMode::RollingMean),
            store.blocks_averaged(ProfileMode::RollingMean)
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = NoiseProfileStore::new(9);
        for _ in 0..6 {
            store.learn(&spectrum(0.3, 9));
        }
        store.reset();
        assert!(!store.any_available());
        for mode in [ProfileMode::RollingMean, ProfileMode::Median, ProfileMode::Max] {
            assert_eq!(store.blocks_averaged(mode), 0);
            assert!(store.profile(mode).iter().all(|&v| v == 0.0));
        }
    }
}
