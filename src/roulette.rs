use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of pockets on the wheel.
pub const WHEEL_SIZE: usize = 15;

/// Horizontal distance between two neighbouring pockets on the strip.
pub const POCKET_WIDTH: i32 = 100;

/// Physical placement of the pockets, left to right, with gold in the middle.
const WHEEL_ORDER: [Number; WHEEL_SIZE] = [
    Number(1),
    Number(14),
    Number(2),
    Number(13),
    Number(3),
    Number(12),
    Number(4),
    Number(0),
    Number(11),
    Number(5),
    Number(10),
    Number(6),
    Number(9),
    Number(7),
    Number(8),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
    Gold,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Red, Color::Black, Color::Gold];

    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Black => "black",
            Color::Gold => "gold",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Color::Red => "🟥",
            Color::Black => "⬛",
            Color::Gold => "🟨",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pocket on the wheel. Only values in `0..WHEEL_SIZE` can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Number(u8);

impl Number {
    pub fn new(value: u8) -> Option<Self> {
        ((value as usize) < WHEEL_SIZE).then_some(Number(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn color(self) -> Color {
        classify(self)
    }

    /// Every pocket in ascending numeric order.
    pub fn all() -> impl Iterator<Item = Number> {
        (0..WHEEL_SIZE as u8).map(Number)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 0 is gold, 1 through 7 are red, 8 through 14 are black.
pub fn classify(number: Number) -> Color {
    match number.0 {
        0 => Color::Gold,
        1..=7 => Color::Red,
        _ => Color::Black,
    }
}

pub fn canonical_order() -> &'static [Number; WHEEL_SIZE] {
    &WHEEL_ORDER
}

/// Offset the strip has to travel so that `number` sits under the pointer.
/// The gold pocket rests at 0.
pub fn position_offset(number: Number) -> i32 {
    let index = WHEEL_ORDER
        .iter()
        .position(|n| *n == number)
        .unwrap_or(WHEEL_SIZE / 2) as i32;
    (WHEEL_SIZE as i32 / 2 - index) * POCKET_WIDTH
}

/// `radius` pockets on each side of `number`, wrapping around the wheel.
/// The strip is located through the pocket's offset from the resting gold.
pub fn neighbourhood(number: Number, radius: usize) -> Vec<Number> {
    let center = (WHEEL_SIZE as i32 / 2 - position_offset(number) / POCKET_WIDTH) as usize;
    let radius = radius.min(WHEEL_SIZE / 2);
    (0..=radius * 2)
        .map(|i| WHEEL_ORDER[(center + WHEEL_SIZE + i - radius) % WHEEL_SIZE])
        .collect()
}

/// Source of drawn numbers. Draws are independent of each other.
pub trait Spinner {
    fn draw(&mut self) -> Number;
}

/// Wheel backed by a random generator, picking uniformly over all pockets.
pub struct Roulette<R = StdRng> {
    rng: R,
}

impl Roulette<StdRng> {
    pub fn new() -> Self {
        Roulette {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Roulette {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> Roulette<R> {
    pub fn with_rng(rng: R) -> Self {
        Roulette { rng }
    }
}

impl<R: Rng> Spinner for Roulette<R> {
    fn draw(&mut self) -> Number {
        Number(self.rng.gen_range(0..WHEEL_SIZE as u8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use std::collections::HashSet;

    #[test]
    fn color_counts_match_the_payout_table() {
        let count = |c: Color| Number::all().filter(|n| classify(*n) == c).count();
        assert_eq!(count(Color::Red), 7);
        assert_eq!(count(Color::Black), 7);
        assert_eq!(count(Color::Gold), 1);
        assert_eq!(classify(Number::new(0).unwrap()), Color::Gold);
    }

    #[test]
    fn number_rejects_values_off_the_wheel() {
        assert!(Number::new(14).is_some());
        assert!(Number::new(15).is_none());
        assert!(Number::new(255).is_none());
    }

    #[test]
    fn canonical_order_is_a_permutation() {
        let seen: HashSet<Number> = canonical_order().iter().copied().collect();
        assert_eq!(seen.len(), WHEEL_SIZE);
        assert_eq!(canonical_order()[7], Number(0));
    }

    #[test]
    fn canonical_order_alternates_red_and_black_around_gold() {
        let order = canonical_order();
        for pair in order.windows(2) {
            if pair.iter().all(|n| n.color() != Color::Gold) {
                assert_ne!(pair[0].color(), pair[1].color());
            }
        }
    }

    #[test]
    fn position_offsets_follow_the_strip() {
        assert_eq!(position_offset(Number(0)), 0);
        assert_eq!(position_offset(Number(1)), 700);
        assert_eq!(position_offset(Number(4)), 100);
        assert_eq!(position_offset(Number(11)), -100);
        assert_eq!(position_offset(Number(8)), -700);
    }

    #[test]
    fn neighbourhood_wraps_around() {
        let strip = neighbourhood(Number(8), 2);
        assert_eq!(strip, vec![Number(9), Number(7), Number(8), Number(1), Number(14)]);
        assert_eq!(neighbourhood(Number(0), 0), vec![Number(0)]);
    }

    #[test]
    fn seeded_wheels_repeat() {
        let mut a = Roulette::seeded(42);
        let mut b = Roulette::seeded(42);
        let left: Vec<Number> = (0..50).map(|_| a.draw()).collect();
        let right: Vec<Number> = (0..50).map(|_| b.draw()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn draws_come_from_the_injected_generator() {
        let mut wheel = Roulette::with_rng(StepRng::new(0, 0));
        for _ in 0..5 {
            assert_eq!(wheel.draw(), Number(0));
        }
    }

    #[test]
    fn draws_are_uniform() {
        const DRAWS: usize = 150_000;
        let mut wheel = Roulette::seeded(7);
        let mut counts = [0usize; WHEEL_SIZE];
        for _ in 0..DRAWS {
            counts[wheel.draw().value() as usize] += 1;
        }

        let expected = DRAWS as f64 / WHEEL_SIZE as f64;
        let chi_square: f64 = counts
            .iter()
            .map(|&c| {
                let diff = c as f64 - expected;
                diff * diff / expected
            })
            .sum();
        // 14 degrees of freedom, p = 0.001
        assert!(chi_square < 36.12, "chi-square too large: {chi_square}");
    }
}
