use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use log::debug;

use crate::betting::{wager_amount, BettingEngine, EngineError, Result, Snapshot, SpinResult};
use crate::config::TableConfig;
use crate::roulette::{Color, Roulette, Spinner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Idle,
    /// Result is computed but not yet shown.
    Resolving,
}

/// One player's table as seen from chat: the engine plus the bet amount
/// input and the FAST switch.
pub struct Session<S = Roulette> {
    engine: BettingEngine<S>,
    bet_amount: u64,
    fast: bool,
    state: TableState,
    greeted: bool,
    last_active: Instant,
}

impl Session<Roulette> {
    pub fn new(config: TableConfig) -> Self {
        Self::with_engine(BettingEngine::new(config))
    }
}

impl<S> Session<S> {
    /// True exactly once, for the first reply a new player gets.
    pub fn take_greeting(&mut self) -> bool {
        !std::mem::replace(&mut self.greeted, true)
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_active = now;
    }

    /// A table mid-reveal is never considered idle.
    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        self.state == TableState::Idle && now.saturating_duration_since(self.last_active) >= timeout
    }
}

impl<S: Spinner> Session<S> {
    pub fn with_engine(engine: BettingEngine<S>) -> Self {
        Session {
            engine,
            bet_amount: 0,
            fast: false,
            state: TableState::Idle,
            greeted: false,
            last_active: Instant::now(),
        }
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    pub fn bet_amount(&self) -> u64 {
        self.bet_amount
    }

    pub fn is_fast(&self) -> bool {
        self.fast
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.state {
            TableState::Idle => Ok(()),
            TableState::Resolving => Err(EngineError::SpinInProgress),
        }
    }

    /// Sets the amount that `bet` adds when called without one.
    pub fn set_bet_amount(&mut self, value: i64) -> Result<u64> {
        self.bet_amount = wager_amount(value)?;
        Ok(self.bet_amount)
    }

    /// Returns the amount that was added.
    pub fn bet(&mut self, color: Color, amount: Option<i64>) -> Result<u64> {
        self.ensure_idle()?;
        let amount = match amount {
            Some(value) => wager_amount(value)?,
            None => self.bet_amount,
        };
        self.engine.place_bet(color, amount);
        Ok(amount)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.engine.clear_bets();
        Ok(())
    }

    pub fn reset(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.engine.reset_game();
        Ok(())
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        self.ensure_idle()?;
        Ok(self.engine.snapshot())
    }

    pub fn toggle_fast(&mut self) -> bool {
        self.fast = !self.fast;
        self.fast
    }

    /// Settles the spin right away and locks the table until
    /// `finish_reveal`. A refused spin leaves the table idle.
    pub fn begin_spin(&mut self) -> Result<SpinResult> {
        self.ensure_idle()?;
        let result = self.engine.resolve_spin()?;
        self.state = TableState::Resolving;
        debug!("game {} resolving", result.game_number);
        Ok(result)
    }

    pub fn finish_reveal(&mut self) {
        self.state = TableState::Idle;
    }

    /// How long to hold the result back. FAST mode shows it at once.
    pub fn reveal_delay(&self, configured: Duration) -> Duration {
        if self.fast {
            Duration::ZERO
        } else {
            configured
        }
    }
}

/// Drops tables nobody has touched for `timeout`. Returns how many went.
pub fn prune_idle<K: Eq + Hash, S>(
    sessions: &mut HashMap<K, Session<S>>,
    now: Instant,
    timeout: Duration,
) -> usize {
    let before = sessions.len();
    sessions.retain(|_, session| !session.is_idle(now, timeout));
    let pruned = before - sessions.len();
    if pruned > 0 {
        debug!("pruned {pruned} idle tables");
    }
    pruned
}
