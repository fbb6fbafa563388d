use rand::distributions::{Distribution, Uniform, WeightedIndex};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::ExtractorConfig;
use crate::detection::{Classification, Detection, VehicleKind};
use crate::error::{Error, Result};

/// Assigns a label to an extracted region.
///
/// Returning `None` leaves the region unlabeled.
pub trait Classifier {
    fn classify(&mut self, region: &Detection) -> Option<Classification>;
}

impl<F> Classifier for F
where
    F: FnMut(&Detection) -> Option<Classification>,
{
    #[inline]
    fn classify(&mut self, region: &Detection) -> Option<Classification> {
        self(region)
    }
}

/// Labels regions at random, ignoring their content.
///
/// The type is drawn from [`VehicleKind::CATEGORIES`] with the configured weights
/// and the confidence uniformly from the configured range.
#[derive(Debug, Clone)]
pub struct StochasticClassifier {
    rng: ChaCha8Rng,
    kinds: WeightedIndex<f64>,
    confidence: Uniform<f32>,
}

impl StochasticClassifier {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: &ExtractorConfig, rng: ChaCha8Rng) -> Result<Self> {
        let kinds = WeightedIndex::new(config.category_weights.iter().copied())
            .map_err(|err| Error::invalid_config(format!("category_weights: {}", err)))?;

        if config.min_confidence > config.max_confidence {
            return Err(Error::invalid_config("confidence range is inverted"));
        }

        Ok(Self {
            rng,
            kinds,
            confidence: Uniform::new_inclusive(config.min_confidence, config.max_confidence),
        })
    }
}

impl Classifier for StochasticClassifier {
    fn classify(&mut self, _region: &Detection) -> Option<Classification> {
        let confidence = self.confidence.sample(&mut self.rng);
        let kind = VehicleKind::CATEGORIES[self.kinds.sample(&mut self.rng)];

        Some(Classification::new(kind, confidence))
    }
}
