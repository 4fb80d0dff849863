//! Stable hashing for per-subject variance and state fingerprints.

/// FNV-1a (64-bit). Deterministic across runs and platforms, unlike
/// `std::collections::hash_map::DefaultHasher`. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StableHash(pub u64);

impl StableHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Feed an f64 by its bit pattern.
    pub fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    pub fn write_str(&mut self, s: &str) {
        self.write(s.as_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StableHash {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a subject's identity to a bias in `[1 - variance, 1 + variance]`.
/// The same name always yields the same bias.
pub fn subject_variance(name: &str, variance: f64) -> f64 {
    let mut h = StableHash::new();
    h.write_str(name);
    let unit = h.finish() as f64 / u64::MAX as f64;
    1.0 + variance * (unit * 2.0 - 1.0)
}
