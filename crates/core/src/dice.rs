//! Die-roll sources injected into turn resolution.

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Lowest face of the die.
pub const DICE_MIN: u8 = 1;
/// Highest face of the die.
pub const DICE_MAX: u8 = 6;

/// Anything that can produce a six-sided die roll.
pub trait DiceSource: Send + Sync {
    /// Roll once, returning a value in `DICE_MIN..=DICE_MAX`.
    fn roll(&mut self) -> u8;
}

/// Fair die backed by a seedable PRNG.
#[derive(Debug, Clone)]
pub struct RandomDice {
    inner: StdRng,
}

impl RandomDice {
    /// Entropy-seeded die.
    pub fn new() -> Self {
        Self {
            inner: StdRng::from_entropy(),
        }
    }

    /// Deterministic die; the same seed replays the same rolls.
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded when `seed` is present, entropy-seeded otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_default()
    }
}

impl Default for RandomDice {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceSource for RandomDice {
    fn roll(&mut self) -> u8 {
        self.inner.gen_range(DICE_MIN..=DICE_MAX)
    }
}

/// Replays a fixed sequence of rolls, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    rolls: Vec<u8>,
    cursor: usize,
}

impl ScriptedDice {
    /// Values outside the die's faces are clamped into range; an empty
    /// script always rolls `DICE_MIN`.
    pub fn new(rolls: impl Into<Vec<u8>>) -> Self {
        let rolls = rolls
            .into()
            .into_iter()
            .map(|value| value.clamp(DICE_MIN, DICE_MAX))
            .collect();
        Self { rolls, cursor: 0 }
    }
}

impl DiceSource for ScriptedDice {
    fn roll(&mut self) -> u8 {
        if self.rolls.is_empty() {
            return DICE_MIN;
        }
        let value = self.rolls[self.cursor % self.rolls.len()];
        self.cursor += 1;
        value
    }
}
