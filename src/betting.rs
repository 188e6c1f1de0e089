use log::{debug, info};
use thiserror::Error;

use crate::config::TableConfig;
use crate::roulette::{Color, Number, Roulette, Spinner, WHEEL_SIZE};

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("insufficient funds: staged {wager}, balance {balance}")]
    InsufficientFunds { wager: u64, balance: u64 },

    #[error("invalid bet amount: {0}")]
    InvalidAmount(i64),

    #[error("a spin is already in progress")]
    SpinInProgress,
}

/// Gross payout factor for a winning wager on `color`.
pub fn multiplier(color: Color) -> u64 {
    match color {
        Color::Red | Color::Black => 2,
        Color::Gold => 14,
    }
}

/// Share of pockets that pay out for `color`.
pub fn win_probability(color: Color) -> f64 {
    let pockets = match color {
        Color::Red | Color::Black => 7,
        Color::Gold => 1,
    };
    pockets as f64 / WHEEL_SIZE as f64
}

/// Validates a user supplied amount. Negative amounts are rejected.
pub fn wager_amount(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| EngineError::InvalidAmount(value))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BetState {
    pub red: u64,
    pub black: u64,
    pub gold: u64,
}

impl BetState {
    pub fn get(&self, color: Color) -> u64 {
        match color {
            Color::Red => self.red,
            Color::Black => self.black,
            Color::Gold => self.gold,
        }
    }

    fn slot(&mut self, color: Color) -> &mut u64 {
        match color {
            Color::Red => &mut self.red,
            Color::Black => &mut self.black,
            Color::Gold => &mut self.gold,
        }
    }

    pub fn total(&self) -> u64 {
        self.red
            .saturating_add(self.black)
            .saturating_add(self.gold)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Sum over classes of `wager * (multiplier * p - 1)`.
    pub fn expected_value(&self) -> f64 {
        Color::ALL
            .iter()
            .map(|&c| {
                let wager = self.get(c) as f64;
                wager * (multiplier(c) as f64 * win_probability(c) - 1.0)
            })
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerState {
    pub balance: u64,
    pub game_number: u64,
    /// Gross payout of the most recent spin.
    pub last_win: u64,
}

impl PlayerState {
    fn fresh(config: &TableConfig) -> Self {
        PlayerState {
            balance: config.starting_balance,
            game_number: 0,
            last_win: 0,
        }
    }
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub balance: u64,
    pub game_number: u64,
    pub last_win: u64,
    pub expected_value: f64,
    pub bets: BetState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinResult {
    pub number: Number,
    pub color: Color,
    pub total_wager: u64,
    pub gross_payout: u64,
    pub balance: u64,
    pub game_number: u64,
}

impl SpinResult {
    pub fn net(&self) -> i128 {
        self.gross_payout as i128 - self.total_wager as i128
    }
}

pub struct BettingEngine<S = Roulette> {
    config: TableConfig,
    spinner: S,
    player: PlayerState,
    bets: BetState,
    expected_value: f64,
}

impl BettingEngine<Roulette> {
    pub fn new(config: TableConfig) -> Self {
        Self::with_spinner(config, Roulette::new())
    }
}

impl<S: Spinner> BettingEngine<S> {
    pub fn with_spinner(config: TableConfig, spinner: S) -> Self {
        BettingEngine {
            player: PlayerState::fresh(&config),
            config,
            spinner,
            bets: BetState::default(),
            expected_value: 0.0,
        }
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn bets(&self) -> &BetState {
        &self.bets
    }

    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            balance: self.player.balance,
            game_number: self.player.game_number,
            last_win: self.player.last_win,
            expected_value: self.expected_value,
            bets: self.bets,
        }
    }

    /// Adds `amount` to whatever is already staged on `color`.
    /// Affordability is only checked when spinning.
    pub fn place_bet(&mut self, color: Color, amount: u64) {
        let slot = self.bets.slot(color);
        *slot = slot.saturating_add(amount);
        self.expected_value = self.bets.expected_value();
        debug!("staged {amount} on {color}, now {}", self.bets.get(color));
    }

    pub fn clear_bets(&mut self) {
        self.bets = BetState::default();
        self.expected_value = 0.0;
    }

    /// Draws a number and settles the staged wagers against it. Staged
    /// wagers stay in place afterwards. Nothing changes on failure.
    pub fn resolve_spin(&mut self) -> Result<SpinResult> {
        let total_wager = self.bets.total();
        if total_wager > self.player.balance {
            info!(
                "spin refused: staged {total_wager}, balance {}",
                self.player.balance
            );
            return Err(EngineError::InsufficientFunds {
                wager: total_wager,
                balance: self.player.balance,
            });
        }

        let number = self.spinner.draw();
        let color = number.color();
        let gross_payout = self.bets.get(color).saturating_mul(multiplier(color));

        // total_wager <= balance, so this cannot underflow
        self.player.balance = (self.player.balance - total_wager).saturating_add(gross_payout);
        self.player.last_win = gross_payout;
        self.player.game_number += 1;

        info!(
            "game {}: drew {number} ({color}), wagered {total_wager}, paid {gross_payout}, balance {}",
            self.player.game_number, self.player.balance
        );

        Ok(SpinResult {
            number,
            color,
            total_wager,
            gross_payout,
            balance: self.player.balance,
            game_number: self.player.game_number,
        })
    }

    /// Restores balance and stats. Staged wagers are left untouched.
    pub fn reset_game(&mut self) {
        self.player = PlayerState::fresh(&self.config);
        info!("game reset, balance {}", self.player.balance);
    }
}
