//! Players and races.

use serde::{Deserialize, Serialize};

use crate::math::Vec2Fixed;

/// Index of a player slot in a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerIndex(pub u8);

/// Playable races. Each race has its own player initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Race {
    /// Mechanized race with liftable buildings.
    Terran,
    /// Organic swarm race.
    Zerg,
    /// Psionic race.
    Protoss,
}

/// Per-player economy state consulted by production commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Slot index.
    pub index: PlayerIndex,
    /// Race of the player.
    pub race: Race,
    /// Available minerals.
    pub minerals: u32,
    /// Supply currently used.
    pub supply_used: u32,
    /// Supply cap.
    pub supply_limit: u32,
    /// Where the player's starting base is placed.
    pub start_location: Vec2Fixed,
}

impl Player {
    /// Create a player with no resources.
    #[must_use]
    pub const fn new(index: PlayerIndex, race: Race) -> Self {
        Self {
            index,
            race,
            minerals: 0,
            supply_used: 0,
            supply_limit: 0,
            start_location: Vec2Fixed::ZERO,
        }
    }

    /// Whether the player can pay `minerals` and fit `supply` more.
    #[must_use]
    pub const fn can_afford(&self, minerals: u32, supply: u32) -> bool {
        self.minerals >= minerals && self.supply_used + supply <= self.supply_limit
    }

    /// Deduct a production cost. Returns `false` (and changes nothing) when unaffordable.
    pub fn pay(&mut self, minerals: u32, supply: u32) -> bool {
        if !self.can_afford(minerals, supply) {
            return false;
        }
        self.minerals -= minerals;
        self.supply_used += supply;
        true
    }

    /// Give back a production cost.
    pub fn refund(&mut self, minerals: u32, supply: u32) {
        self.minerals += minerals;
        self.supply_used = self.supply_used.saturating_sub(supply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pay_and_refund() {
        let mut player = Player::new(PlayerIndex(0), Race::Terran);
        player.minerals = 100;
        player.supply_limit = 10;

        assert!(player.pay(50, 1));
        assert_eq!(player.minerals, 50);
        assert_eq!(player.supply_used, 1);

        assert!(!player.pay(60, 1));
        assert_eq!(player.minerals, 50);

        player.refund(50, 1);
        assert_eq!(player.minerals, 100);
        assert_eq!(player.supply_used, 0);
    }

    #[test]
    fn test_supply_cap_blocks_payment() {
        let mut player = Player::new(PlayerIndex(1), Race::Zerg);
        player.minerals = 1000;
        player.supply_limit = 1;
        player.supply_used = 1;
        assert!(!player.can_afford(50, 1));
        assert!(player.can_afford(50, 0));
    }
}
