use anyhow::{Context as _, Result};
use log::{info, warn};
use poise::serenity_prelude as serenity;
use poise::CreateReply;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use crate::betting::{EngineError, Snapshot, SpinResult};
use crate::config::ConfigData;
use crate::roulette::{canonical_order, neighbourhood, Color, Number};
use crate::session::{prune_idle, Session};

type Context<'a> = poise::Context<'a, Data, anyhow::Error>;

/// Pockets shown on each side of the drawn number.
const STRIP_RADIUS: usize = 3;

/// Tables untouched this long are dropped on the next command.
const SESSION_IDLE: Duration = Duration::from_secs(60 * 60);

pub struct Data {
    pub config: Arc<RwLock<ConfigData>>,
    /// One table per Discord user, dropped after `SESSION_IDLE` without play.
    pub sessions: Mutex<HashMap<u64, Session>>,
}

impl Data {
    async fn new() -> Result<Self> {
        let config = ConfigData::load().await?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            sessions: Mutex::new(HashMap::new()),
        })
    }

    async fn save_config(&self) -> Result<()> {
        let config = self.config.read().await;
        config.save().await
    }
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum BetColor {
    #[name = "red (2x)"]
    Red,
    #[name = "black (2x)"]
    Black,
    #[name = "gold (14x)"]
    Gold,
}

impl From<BetColor> for Color {
    fn from(color: BetColor) -> Self {
        match color {
            BetColor::Red => Color::Red,
            BetColor::Black => Color::Black,
            BetColor::Gold => Color::Gold,
        }
    }
}

/// Runs `f` on the author's table, opening one if needed. A new player
/// gets the how-to-play text first.
async fn with_session<T>(ctx: Context<'_>, f: impl FnOnce(&mut Session) -> T) -> T {
    let table = ctx.data().config.read().await.table;
    let (value, greet) = {
        let now = Instant::now();
        let mut sessions = ctx.data().sessions.lock().await;
        prune_idle(&mut *sessions, now, SESSION_IDLE);
        let session = sessions
            .entry(ctx.author().id.get())
            .or_insert_with(|| Session::new(table));
        session.touch(now);
        let value = f(session);
        (value, session.take_greeting())
    };
    if greet {
        if let Err(why) = ctx.say(HOW_TO_PLAY).await {
            warn!("could not send how-to-play: {why:?}");
        }
    }
    value
}

fn money(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('$');
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn signed_money(value: i128) -> String {
    let sign = if value < 0 { "-" } else { "+" };
    format!("{sign}{}", money(value.unsigned_abs() as u64))
}

fn notice(err: &EngineError) -> String {
    match err {
        EngineError::InsufficientFunds { wager, balance } => format!(
            "Oops! You don't have enough money for this play. Staged {} with a balance of {}.",
            money(*wager),
            money(*balance)
        ),
        EngineError::InvalidAmount(value) => {
            format!("{value} is not a valid bet amount. Use zero or more.")
        }
        EngineError::SpinInProgress => "Hold on, the wheel is still spinning.".to_string(),
    }
}

fn pocket(number: Number) -> String {
    format!("{}{}", number.color().emoji(), number)
}

/// The strip around `number` with the drawn pocket bracketed.
fn wheel_strip(number: Number) -> String {
    neighbourhood(number, STRIP_RADIUS)
        .into_iter()
        .map(|n| {
            if n == number {
                format!("[{}]", pocket(n))
            } else {
                pocket(n)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Two decimals, flagged red when the staked bets lose on average.
fn format_ev(expected_value: f64) -> String {
    if expected_value < 0.0 {
        format!("{} {expected_value:.2}", Color::Red.emoji())
    } else {
        format!("{expected_value:.2}")
    }
}

fn format_bets(snapshot: &Snapshot) -> String {
    Color::ALL
        .iter()
        .map(|&c| format!("{} {}", c.emoji(), money(snapshot.bets.get(c))))
        .collect::<Vec<_>>()
        .join("  ")
}

fn format_stats(snapshot: &Snapshot, bet_amount: u64, fast: bool) -> String {
    format!(
        "**BALANCE:** {}\nEV: {}\nGAMES: {}\nLast win: {}\nBets: {}\nBet amount: {} | FAST: {}",
        money(snapshot.balance),
        format_ev(snapshot.expected_value),
        snapshot.game_number,
        money(snapshot.last_win),
        format_bets(snapshot),
        money(bet_amount),
        if fast { "on" } else { "off" },
    )
}

fn format_result(result: &SpinResult) -> String {
    format!(
        "{}\nGame {}: the ball landed on **{}** ({}).\nLast win: {} ({})\n**BALANCE:** {}",
        wheel_strip(result.number),
        result.game_number,
        result.number,
        result.color,
        money(result.gross_payout),
        signed_money(result.net()),
        money(result.balance),
    )
}

/// Sets the amount each /bet adds when no amount is given
#[poise::command(slash_command)]
async fn amount(
    ctx: Context<'_>,
    #[description = "Bet amount"] value: i64,
) -> Result<()> {
    let reply = match with_session(ctx, |s| s.set_bet_amount(value)).await {
        Ok(value) => format!("Bet amount set to {}.", money(value)),
        Err(err) => notice(&err),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Adds to your wager on a color
#[poise::command(slash_command)]
async fn bet(
    ctx: Context<'_>,
    #[description = "Color to bet on"] color: BetColor,
    #[description = "Amount to add, defaults to your bet amount"] amount: Option<i64>,
) -> Result<()> {
    let color = Color::from(color);
    let outcome = with_session(ctx, |s| {
        let added = s.bet(color, amount)?;
        Ok::<_, EngineError>((added, s.snapshot()?))
    })
    .await;
    let reply = match outcome {
        Ok((added, snapshot)) => format!(
            "Added {} on {color}.\nBets: {}\nEV: {}",
            money(added),
            format_bets(&snapshot),
            format_ev(snapshot.expected_value)
        ),
        Err(err) => notice(&err),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Clears all staged bets
#[poise::command(slash_command)]
async fn clear(ctx: Context<'_>) -> Result<()> {
    let reply = match with_session(ctx, |s| s.clear()).await {
        Ok(()) => "Bets cleared.".to_string(),
        Err(err) => notice(&err),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Spins the wheel with your staged bets
#[poise::command(slash_command)]
async fn spin(ctx: Context<'_>) -> Result<()> {
    let configured = ctx.data().config.read().await.reveal_delay();
    let (outcome, delay) =
        with_session(ctx, |s| (s.begin_spin(), s.reveal_delay(configured))).await;
    let result = match outcome {
        Ok(result) => result,
        Err(err) => {
            ctx.say(notice(&err)).await?;
            return Ok(());
        }
    };

    let revealed = reveal(ctx, &result, delay).await;
    with_session(ctx, |s| s.finish_reveal()).await;
    revealed
}

async fn reveal(ctx: Context<'_>, result: &SpinResult, delay: Duration) -> Result<()> {
    if delay.is_zero() {
        ctx.say(format_result(result)).await?;
        return Ok(());
    }

    let handle = ctx
        .say(format!("🎰 Spinning... (game {})", result.game_number))
        .await?;
    tokio::time::sleep(delay).await;
    handle
        .edit(ctx, CreateReply::default().content(format_result(result)))
        .await?;
    Ok(())
}

/// Starts over with a fresh balance. Staged bets are kept.
#[poise::command(slash_command)]
async fn reset(ctx: Context<'_>) -> Result<()> {
    let reply = match with_session(ctx, |s| {
        s.reset()?;
        s.snapshot()
    })
    .await
    {
        Ok(snapshot) => format!("New game. Balance is {}.", money(snapshot.balance)),
        Err(err) => notice(&err),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Shows balance, expected value and games played
#[poise::command(slash_command)]
async fn stats(ctx: Context<'_>) -> Result<()> {
    let reply = match with_session(ctx, |s| {
        s.snapshot()
            .map(|snapshot| format_stats(&snapshot, s.bet_amount(), s.is_fast()))
    })
    .await
    {
        Ok(text) => text,
        Err(err) => notice(&err),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Toggles FAST mode, which shows results without waiting
#[poise::command(slash_command)]
async fn fast(ctx: Context<'_>) -> Result<()> {
    let on = with_session(ctx, |s| s.toggle_fast()).await;
    ctx.say(format!("FAST mode {}.", if on { "on" } else { "off" }))
        .await?;
    Ok(())
}

/// Shows the layout of the wheel
#[poise::command(slash_command)]
async fn wheel(ctx: Context<'_>) -> Result<()> {
    let layout = canonical_order()
        .iter()
        .map(|&n| pocket(n))
        .collect::<Vec<_>>()
        .join(" ");
    ctx.say(layout).await?;
    Ok(())
}

const HOW_TO_PLAY: &str = "\
**How To Play**
**1** - /stats shows your balance, expected value (EV) and number of games.
**2** - /amount sets the amount you want to play.
**3** - /bet adds that amount to red (2x), black (2x) or gold (14x). You can play different values on each color.
**4** - /spin to play. Your bets stay on the table for the next spin.
**CLEAR:** /clear empties the betting area.
**FAST:** /fast toggles FAST mode, where spins are shown without waiting.
**RESET:** /reset restores the starting balance.";

/// Explains the game
#[poise::command(slash_command)]
async fn how_to_play(ctx: Context<'_>) -> Result<()> {
    ctx.say(HOW_TO_PLAY).await?;
    Ok(())
}

#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
async fn set_reveal_delay(
    ctx: poise::ApplicationContext<'_, Data, anyhow::Error>,
    #[description = "Milliseconds a spin waits before showing the result"] millis: u64,
) -> Result<()> {
    let mut config = ctx.data().config.write().await;
    config.reveal_delay_ms = millis;
    drop(config); // Release the lock before saving
    ctx.data().save_config().await?;
    ctx.say(format!("Spins now reveal after {millis} ms."))
        .await?;
    Ok(())
}

async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, anyhow::Error>,
    _data: &Data,
) -> Result<()> {
    if let serenity::FullEvent::Ready { data_about_bot, .. } = event {
        info!("Logged in as {}", data_about_bot.user.name);
    }
    Ok(())
}

async fn on_error(error: poise::FrameworkError<'_, Data, anyhow::Error>) {
    if let poise::FrameworkError::Command { error, ctx, .. } = error {
        warn!("command {} failed: {error:?}", ctx.command().name);
    } else if let Err(why) = poise::builtins::on_error(error).await {
        warn!("error while handling error: {why}");
    }
}

pub async fn start() -> Result<()> {
    let token = std::env::var("DISCORD_TOKEN").context("missing DISCORD_TOKEN")?;
    let intents = serenity::GatewayIntents::non_privileged();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                amount(),
                bet(),
                clear(),
                spin(),
                reset(),
                stats(),
                fast(),
                wheel(),
                how_to_play(),
                set_reveal_delay(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Data::new().await
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;
    client.start().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::betting::BetState;

    fn number(value: u8) -> Number {
        Number::new(value).unwrap()
    }

    #[test]
    fn money_groups_thousands() {
        assert_eq!(money(0), "$0");
        assert_eq!(money(999), "$999");
        assert_eq!(money(1_000), "$1,000");
        assert_eq!(money(100_000), "$100,000");
        assert_eq!(money(1_234_567), "$1,234,567");
        assert_eq!(signed_money(-20), "-$20");
        assert_eq!(signed_money(10), "+$10");
    }

    #[test]
    fn strip_brackets_the_drawn_pocket() {
        assert_eq!(wheel_strip(number(0)), "🟥3 ⬛12 🟥4 [🟨0] ⬛11 🟥5 ⬛10");
    }

    #[test]
    fn stats_show_two_decimal_ev() {
        let snapshot = Snapshot {
            balance: 100_000,
            game_number: 3,
            last_win: 20,
            expected_value: -100.0 / 15.0,
            bets: BetState {
                red: 100,
                black: 0,
                gold: 0,
            },
        };
        let text = format_stats(&snapshot, 100, true);
        assert!(text.contains("$100,000"));
        assert!(text.contains("EV: 🟥 -6.67"));
        assert!(text.contains("GAMES: 3"));
        assert!(text.contains("🟥 $100"));
        assert!(text.contains("FAST: on"));
    }

    #[test]
    fn only_negative_ev_is_flagged() {
        assert_eq!(format_ev(-100.0 / 15.0), "🟥 -6.67");
        assert_eq!(format_ev(0.0), "0.00");
        assert_eq!(format_ev(1.5), "1.50");
    }

    #[test]
    fn result_reports_gross_and_net() {
        let result = SpinResult {
            number: number(0),
            color: Color::Gold,
            total_wager: 20,
            gross_payout: 0,
            balance: 80,
            game_number: 1,
        };
        let text = format_result(&result);
        assert!(text.contains("**0** (gold)"));
        assert!(text.contains("Last win: $0 (-$20)"));
        assert!(text.contains("**BALANCE:** $80"));
    }

    #[test]
    fn insufficient_funds_notice() {
        let text = notice(&EngineError::InsufficientFunds {
            wager: 10,
            balance: 5,
        });
        assert!(text.contains("don't have enough money"));
        assert!(text.contains("$10"));
    }
}
