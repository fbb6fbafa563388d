use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

use crate::config::ViolationConfig;
use crate::error::Result;
use crate::track::Track;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Speeding,
    WrongLane,
    RedLight,
    IllegalTurn,
}

impl ViolationKind {
    /// Kinds raised at random rather than by a measured rule.
    pub const SOFT: [ViolationKind; 3] = [
        ViolationKind::WrongLane,
        ViolationKind::RedLight,
        ViolationKind::IllegalTurn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::Speeding => "speeding",
            ViolationKind::WrongLane => "wrong_lane",
            ViolationKind::RedLight => "red_light",
            ViolationKind::IllegalTurn => "illegal_turn",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Violation {
    pub track_id: u64,
    pub kind: ViolationKind,
    pub frame_id: u64,
    pub confidence: f32,
    pub detail: Option<String>,
}

/// Flags rule breaches on the live track set.
///
/// Speeding is measured against `speed_limit`. Every track additionally rolls
/// once per frame for a soft violation of a random kind.
#[derive(Debug, Clone)]
pub struct ViolationFlagger {
    config: ViolationConfig,
    rng: ChaCha8Rng,
}

impl ViolationFlagger {
    pub fn new(config: ViolationConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: ViolationConfig, rng: ChaCha8Rng) -> Result<Self> {
        config.validate()?;

        Ok(Self { config, rng })
    }

    /// Tracks are visited in the given order; feed them in a stable order
    /// for reproducible draws.
    pub fn check<'a, I>(&mut self, tracks: I, frame_id: u64) -> Vec<Violation>
    where
        I: IntoIterator<Item = &'a Track>,
    {
        let mut violations = Vec::new();

        for track in tracks {
            if track.speed > self.config.speed_limit {
                let jitter: f32 = self.rng.gen::<f32>() * self.config.speeding_jitter;

                violations.push(Violation {
                    track_id: track.track_id,
                    kind: ViolationKind::Speeding,
                    frame_id,
                    confidence: self.config.speeding_confidence + jitter,
                    detail: Some(format!("Speed: {:.1} px/frame", track.speed)),
                });
            }

            if self.rng.gen_bool(self.config.soft_violation_probability) {
                let kind = ViolationKind::SOFT[self.rng.gen_range(0..ViolationKind::SOFT.len())];
                let jitter: f32 = self.rng.gen::<f32>() * self.config.soft_jitter;

                violations.push(Violation {
                    track_id: track.track_id,
                    kind,
                    frame_id,
                    confidence: self.config.soft_confidence + jitter,
                    detail: None,
                });
            }
        }

        if !violations.is_empty() {
            tracing::debug!("frame {}: {} violations", frame_id, violations.len());
        }

        violations
    }
}
