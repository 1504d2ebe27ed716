//! Two-player Goofspiel.
//!
//! One suit is the prize suit; each player holds one of the other suits as
//! a hand. Every trick a prize card is turned over, both players bid by
//! secretly committing a card from their hand, and the higher bid takes the
//! prize's value; tied bids award it to nobody.
//!
//! The game exercises the engine paths the m-n-k game cannot: every
//! decision point is a simultaneous move, the order of undrawn prizes is
//! hidden from both players, and while the second bidder is thinking the
//! first bidder's card is already committed but concealed. Prize turning is
//! modelled as a third, chance player.

use std::fmt;

use rand::seq::SliceRandom;

use ismcts::{util, Game, Player, PomGame};

/// The pseudo-player that turns prize cards.
pub const CHANCE: Player = 2;

const HAND_SIZE: u8 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

/// A playing card; the rank doubles as the bid and prize value (Ace low:
/// 1 through 13).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card {
    pub rank: u8,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: u8, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// The point value of the card.
    pub fn value(&self) -> u32 {
        u32::from(self.rank)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = match self.rank {
            1 => "A".to_string(),
            11 => "J".to_string(),
            12 => "Q".to_string(),
            13 => "K".to_string(),
            n => n.to_string(),
        };
        let suit = match self.suit {
            Suit::Clubs => "♣",
            Suit::Diamonds => "♦",
            Suit::Hearts => "♥",
            Suit::Spades => "♠",
        };
        write!(f, "{rank}{suit}")
    }
}

fn full_suit(suit: Suit) -> Vec<Card> {
    (1..=HAND_SIZE).map(|rank| Card::new(rank, suit)).collect()
}

#[derive(Debug, Clone)]
pub struct Goofspiel {
    /// Undrawn prizes; the next one is drawn from the back.
    prizes: Vec<Card>,
    current_prize: Option<Card>,
    hands: [Vec<Card>; 2],
    /// Bids committed this trick; resolved once both are in.
    bids: [Option<Card>; 2],
    scores: [u32; 2],
    player: Player,
}

impl Goofspiel {
    pub fn new() -> Self {
        let mut game = Self {
            prizes: full_suit(Suit::Hearts),
            current_prize: None,
            hands: [full_suit(Suit::Spades), full_suit(Suit::Clubs)],
            bids: [None, None],
            scores: [0, 0],
            player: CHANCE,
        };
        game.shuffle_prizes();
        game
    }

    pub fn scores(&self) -> [u32; 2] {
        self.scores
    }

    fn shuffle_prizes(&mut self) {
        util::with_rng(|rng| self.prizes.shuffle(rng));
    }

    fn resolve_trick(&mut self) {
        let (Some(first), Some(second)) = (self.bids[0], self.bids[1]) else {
            return;
        };
        if first.rank != second.rank {
            let winner = if first.rank > second.rank { 0 } else { 1 };
            if let Some(prize) = self.current_prize {
                self.scores[winner] += prize.value();
            }
        }
        self.bids = [None, None];
        self.current_prize = None;
    }
}

impl Default for Goofspiel {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for Goofspiel {
    type Move = Card;

    fn clone_randomised(&self, observer: Player) -> Self {
        let mut clone = self.clone();
        // No player knows the order of the undrawn prizes
        if observer != CHANCE {
            clone.shuffle_prizes();
        }
        // The second bidder cannot see the first bidder's committed card;
        // put it back and commit a random replacement
        if observer == 1 && clone.player == 1 {
            if let Some(bid) = clone.bids[0].take() {
                clone.hands[0].push(bid);
                let replacement = *util::random_element(&clone.hands[0])
                    .expect("first bidder's hand cannot be empty mid-trick");
                clone.hands[0].retain(|&card| card != replacement);
                clone.bids[0] = Some(replacement);
            }
        }
        clone
    }

    fn current_player(&self) -> Player {
        self.player
    }

    fn valid_moves(&self) -> Vec<Card> {
        match self.player {
            CHANCE => self.prizes.last().copied().into_iter().collect(),
            player => self.hands[player as usize].clone(),
        }
    }

    fn do_move(&mut self, mv: Card) {
        match self.player {
            CHANCE => {
                self.current_prize = self.prizes.pop();
                self.player = 0;
            }
            player => {
                let hand = &mut self.hands[player as usize];
                let position = hand
                    .iter()
                    .position(|&card| card == mv)
                    .unwrap_or_else(|| panic!("bid {mv} is not in hand"));
                hand.remove(position);
                self.bids[player as usize] = Some(mv);
                if player == 0 {
                    self.player = 1;
                } else {
                    self.resolve_trick();
                    self.player = CHANCE;
                }
            }
        }
    }

    fn result(&self, player: Player) -> f64 {
        if player == CHANCE {
            return 1.0;
        }
        let (own, other) = (
            self.scores[player as usize],
            self.scores[1 - player as usize],
        );
        if own == other {
            0.5
        } else if own > other {
            1.0
        } else {
            0.0
        }
    }

    fn current_move_simultaneous(&self) -> bool {
        true
    }
}

impl PomGame for Goofspiel {
    fn players(&self) -> Vec<Player> {
        vec![0, 1, CHANCE]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play_one_trick(game: &mut Goofspiel) {
        let prize = game.valid_moves()[0];
        game.do_move(prize);
        let bid0 = game.valid_moves()[0];
        game.do_move(bid0);
        let bid1 = game.valid_moves()[0];
        game.do_move(bid1);
    }

    #[test]
    fn chance_opens_by_turning_a_prize() {
        let game = Goofspiel::new();
        assert_eq!(game.current_player(), CHANCE);
        assert_eq!(game.valid_moves().len(), 1);
        assert!(game.current_move_simultaneous());
    }

    #[test]
    fn a_trick_cycles_through_chance_and_both_players() {
        let mut game = Goofspiel::new();
        game.do_move(game.valid_moves()[0]);
        assert_eq!(game.current_player(), 0);
        assert_eq!(game.valid_moves().len(), 13);

        game.do_move(Card::new(5, Suit::Spades));
        assert_eq!(game.current_player(), 1);

        game.do_move(Card::new(9, Suit::Clubs));
        assert_eq!(game.current_player(), CHANCE);
        // 9 beats 5, so player 1 took the prize's value
        assert_eq!(game.scores()[0], 0);
        assert!(game.scores()[1] > 0);
    }

    #[test]
    fn tied_bids_award_nobody() {
        let mut game = Goofspiel::new();
        game.do_move(game.valid_moves()[0]);
        game.do_move(Card::new(7, Suit::Spades));
        game.do_move(Card::new(7, Suit::Clubs));
        assert_eq!(game.scores(), [0, 0]);
    }

    #[test]
    #[should_panic(expected = "is not in hand")]
    fn bidding_a_spent_card_is_rejected() {
        let mut game = Goofspiel::new();
        game.do_move(game.valid_moves()[0]);
        game.do_move(Card::new(7, Suit::Spades));
        game.do_move(Card::new(9, Suit::Clubs));
        game.do_move(game.valid_moves()[0]);
        game.do_move(Card::new(7, Suit::Spades));
    }

    #[test]
    fn thirteen_tricks_finish_the_game() {
        let mut game = Goofspiel::new();
        for _ in 0..13 {
            assert!(!game.valid_moves().is_empty());
            play_one_trick(&mut game);
        }
        assert!(game.valid_moves().is_empty());
        // Results are consistent with the final scores
        let [own, other] = game.scores();
        let expected = match own.cmp(&other) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Equal => 0.5,
            std::cmp::Ordering::Less => 0.0,
        };
        assert_eq!(game.result(0), expected);
        assert_eq!(game.result(0) + game.result(1), 1.0);
        assert_eq!(game.result(CHANCE), 1.0);
    }

    #[test]
    fn randomised_clone_hides_the_pending_bid_from_the_second_player() {
        let mut game = Goofspiel::new();
        game.do_move(game.valid_moves()[0]);
        game.do_move(Card::new(3, Suit::Spades));
        assert_eq!(game.current_player(), 1);

        let mut resampled = false;
        for _ in 0..100 {
            let clone = game.clone_randomised(1);
            // The clone must still have a committed bid and a 12-card hand
            let bid = clone.bids[0].expect("bid must stay committed");
            assert_eq!(clone.hands[0].len(), 12);
            assert!(!clone.hands[0].contains(&bid));
            if bid != Card::new(3, Suit::Spades) {
                resampled = true;
            }
        }
        assert!(resampled, "hidden bid was never resampled");
    }

    #[test]
    fn randomised_clone_reshuffles_only_undrawn_prizes() {
        let game = Goofspiel::new();
        let clone = game.clone_randomised(0);
        assert_eq!(clone.prizes.len(), game.prizes.len());

        let mut original: Vec<Card> = game.prizes.clone();
        let mut shuffled: Vec<Card> = clone.prizes.clone();
        original.sort();
        shuffled.sort();
        assert_eq!(original, shuffled);
    }

    #[test]
    fn cards_render_compactly() {
        assert_eq!(Card::new(1, Suit::Spades).to_string(), "A♠");
        assert_eq!(Card::new(12, Suit::Hearts).to_string(), "Q♥");
        assert_eq!(Card::new(10, Suit::Clubs).to_string(), "10♣");
    }
}
