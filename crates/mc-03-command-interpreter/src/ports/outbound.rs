//! # Outbound Ports
//!
//! Randomness used by the minigames.

use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;

use crate::domain::hand::Hand;

/// Source of die rolls and house hands.
pub trait DiceSource: Send + Sync {
    /// Uniform value in `1..=6`.
    fn roll_d6(&self) -> u8;

    /// Uniform rock-paper-scissors hand.
    fn throw_hand(&self) -> Hand;
}

/// Production dice backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomDice;

impl DiceSource for RandomDice {
    fn roll_d6(&self) -> u8 {
        rand::thread_rng().gen_range(1..=6)
    }

    fn throw_hand(&self) -> Hand {
        Hand::ALL[rand::thread_rng().gen_range(0..Hand::ALL.len())]
    }
}

// =============================================================================
// Testing: deterministic implementation below
// =============================================================================

/// Dice that replay a fixed script, then fall back to `1` and rock.
#[derive(Debug, Default)]
pub struct ScriptedDice {
    rolls: Mutex<VecDeque<u8>>,
    hands: Mutex<VecDeque<Hand>>,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = u8>) -> Self {
        Self {
            rolls: Mutex::new(rolls.into_iter().collect()),
            hands: Mutex::default(),
        }
    }

    /// Append more rolls to the script.
    pub fn push(&self, rolls: impl IntoIterator<Item = u8>) {
        self.rolls.lock().extend(rolls);
    }

    /// Append house hands to the script.
    pub fn push_hands(&self, hands: impl IntoIterator<Item = Hand>) {
        self.hands.lock().extend(hands);
    }
}

impl DiceSource for ScriptedDice {
    fn roll_d6(&self) -> u8 {
        self.rolls.lock().pop_front().unwrap_or(1)
    }

    fn throw_hand(&self) -> Hand {
        self.hands.lock().pop_front().unwrap_or(Hand::Rock)
    }
}

impl<T: DiceSource + ?Sized> DiceSource for std::sync::Arc<T> {
    fn roll_d6(&self) -> u8 {
        (**self).roll_d6()
    }

    fn throw_hand(&self) -> Hand {
        (**self).throw_hand()
    }
}
