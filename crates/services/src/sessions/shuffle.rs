use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};

/// Randomizes question order once per load.
///
/// A Fisher-Yates pass over the injected source: every permutation is
/// equally likely given a uniform source.
pub struct QuestionSetShuffler {
    rng: Box<dyn RngCore + Send>,
}

impl QuestionSetShuffler {
    /// Shuffler seeded from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Reproducible shuffler for tests and replays.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    #[must_use]
    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self { rng: Box::new(rng) }
    }

    /// Returns the same elements in a random order.
    pub fn shuffle<T>(&mut self, mut items: Vec<T>) -> Vec<T> {
        items.shuffle(&mut self.rng);
        items
    }
}

impl Default for QuestionSetShuffler {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl fmt::Debug for QuestionSetShuffler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestionSetShuffler").finish_non_exhaustive()
    }
}
