//! The paid resource: one fortune per settled payment.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use x402_paygate::{ResourceError, ResourceHandler};

pub static FORTUNES: &[&str] = &[
    "A fresh start will put you on your way.",
    "A golden egg of opportunity falls into your lap this month.",
    "Adventure can be real happiness.",
    "All your hard work will soon pay off.",
    "Curiosity kills boredom. Nothing kills curiosity.",
    "Every block you sign brings you closer to finality.",
    "Fortune favors the brave, and the well-funded.",
    "Good news will come to you by mail.",
    "Patience is a virtue, unless the transaction has expired.",
    "The best time to plant a tree was 20 years ago. The second best time is now.",
    "You will pay for this fortune. It was worth it.",
    "Your ability to juggle many tasks will take you far.",
];

/// Artifact returned to a paying client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fortune {
    pub fortune: String,
}

/// Picks a fortune uniformly at random from [`FORTUNES`].
#[derive(Debug)]
pub struct FortuneTeller {
    fortunes: &'static [&'static str],
    rng: Mutex<StdRng>,
}

impl FortuneTeller {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Deterministic teller, for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            fortunes: FORTUNES,
            rng: Mutex::new(rng),
        }
    }

    pub fn tell(&self) -> Option<&'static str> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.fortunes.choose(&mut *rng).copied()
    }
}

impl Default for FortuneTeller {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceHandler for FortuneTeller {
    type Artifact = Fortune;

    fn deliver(&self) -> Result<Self::Artifact, ResourceError> {
        let fortune = self
            .tell()
            .ok_or_else(|| ResourceError::Unavailable("no fortunes to tell".to_string()))?;
        Ok(Fortune {
            fortune: fortune.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deliver_picks_known_fortune() {
        let teller = FortuneTeller::new();
        for _ in 0..32 {
            let artifact = teller.deliver().unwrap();
            assert!(FORTUNES.contains(&artifact.fortune.as_str()));
        }
    }

    #[test]
    fn test_seeded_teller_is_deterministic() {
        let a = FortuneTeller::with_seed(42);
        let b = FortuneTeller::with_seed(42);
        for _ in 0..8 {
            assert_eq!(a.tell(), b.tell());
        }
    }

    #[test]
    fn test_empty_list_is_unavailable() {
        let teller = FortuneTeller {
            fortunes: &[],
            rng: Mutex::new(StdRng::seed_from_u64(0)),
        };
        assert!(matches!(
            teller.deliver(),
            Err(ResourceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_artifact_serialization() {
        let artifact = Fortune {
            fortune: "Adventure can be real happiness.".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&artifact).unwrap(),
            serde_json::json!({ "fortune": "Adventure can be real happiness." })
        );
    }
}
