use xxhash_rust::xxh3::Xxh3;

use crate::foundation::core::FrameIndex;

const XXH3_SEED: u64 = 0x6d6f_7469_6f6e_7265;

/// Running hash over the ordered `(frame index, frame bytes)` capture sequence of one run.
pub struct CaptureDigest {
    inner: Xxh3,
    frames: u64,
}

impl std::fmt::Debug for CaptureDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureDigest")
            .field("frames", &self.frames)
            .field("digest", &self.digest())
            .finish()
    }
}

impl Default for CaptureDigest {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDigest {
    pub fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
            frames: 0,
        }
    }

    pub fn record(&mut self, idx: FrameIndex, bytes: &[u8]) {
        self.inner.update(&idx.0.to_le_bytes());
        self.inner.update(&(bytes.len() as u64).to_le_bytes());
        self.inner.update(bytes);
        self.frames += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn digest(&self) -> u64 {
        self.inner.digest()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/digest.rs"]
mod tests;
