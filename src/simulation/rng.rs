//! Seed-stable pseudo-random source
//!
//! Reproducibility across platforms and implementations is part of the
//! contract: the same seed must yield the same return sequences everywhere.
//! That rules out library generators whose streams may change between
//! versions, so the algorithm is pinned here: SplitMix64 for uniform
//! 64-bit output, Box-Muller for standard normal variates.

/// SplitMix64 generator with a Box-Muller normal step
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
    /// Box-Muller produces variates in pairs; the spare is served next
    spare_normal: Option<f64>,
}

/// One SplitMix64 state advance
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed,
            spare_normal: None,
        }
    }

    /// Sub-seed for run `index` of an ensemble: decorrelates runs while
    /// keeping them fully determined by the master seed
    pub fn for_run(master_seed: u64, index: usize) -> Self {
        let mut state = master_seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let derived = splitmix64(&mut state);
        Self::new(derived)
    }

    pub fn next_u64(&mut self) -> u64 {
        splitmix64(&mut self.state)
    }

    /// Uniform in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        // 53 mantissa bits
        (self.next_u64() >> 11) as f64 * (1.0 / 9_007_199_254_740_992.0)
    }

    /// Uniform integer in [0, n)
    pub fn next_below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n.max(1)
    }

    /// Standard normal variate via Box-Muller
    pub fn next_normal(&mut self) -> f64 {
        if let Some(z) = self.spare_normal.take() {
            return z;
        }
        // Reject u1 == 0 so the log is finite
        let mut u1 = self.next_f64();
        while u1 <= f64::MIN_POSITIVE {
            u1 = self.next_f64();
        }
        let u2 = self.next_f64();
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;
        self.spare_normal = Some(radius * theta.sin());
        radius * theta.cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = SeededRng::new(1);
        let mut b = SeededRng::new(2);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn test_known_splitmix_values() {
        // Reference values for seed 0 from the published SplitMix64
        let mut rng = SeededRng::new(0);
        assert_eq!(rng.next_u64(), 0xE220_A839_7B1D_CDAF);
        assert_eq!(rng.next_u64(), 0x6E78_9E6A_A1B9_65F4);
    }

    #[test]
    fn test_uniform_range() {
        let mut rng = SeededRng::new(7);
        for _ in 0..1_000 {
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_normal_moments() {
        let mut rng = SeededRng::new(12345);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| rng.next_normal()).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.03, "mean {mean}");
        assert!((var - 1.0).abs() < 0.05, "variance {var}");
    }

    #[test]
    fn test_run_subseeds_differ() {
        let a = SeededRng::for_run(99, 0).next_u64();
        let b = SeededRng::for_run(99, 1).next_u64();
        assert_ne!(a, b);
        // But are reproducible
        assert_eq!(a, SeededRng::for_run(99, 0).next_u64());
    }
}
