//! # Voxel Relay - Simulated Builders
//!
//! Spawns a crowd of bots against a running relay. Each bot reads its
//! `connect` message to learn its id and the world bounds, picks a random
//! color, then wanders around and places or breaks blocks until the
//! simulation ends. Every event the relay sends back is counted per action
//! so the totals can be compared across bots: with N bots connected, each
//! edit should show up N times.

use clap::Parser;
use futures::{Sink, SinkExt, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::{interval, sleep, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

type BotError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug, Clone)]
#[command(name = "simulate")]
#[command(about = "Voxel Relay - simulated builders")]
struct Args {
    /// Relay WebSocket URL
    #[arg(short, long, default_value = "ws://localhost:6745")]
    url: String,

    /// Number of simultaneous bots
    #[arg(short, long, default_value = "5")]
    bots: u32,

    /// Movement updates per second per bot
    #[arg(short, long, default_value = "10.0")]
    move_freq: f64,

    /// Block edits per second per bot
    #[arg(short = 'e', long, default_value = "1.0")]
    build_freq: f64,

    /// Simulation duration in seconds
    #[arg(short, long, default_value = "60")]
    duration: u64,

    /// Delay between bot connections in milliseconds
    #[arg(long, default_value = "100")]
    stagger_ms: u64,
}

/// The parts of the relay's `connect` message a bot needs.
#[derive(Debug, Deserialize)]
struct ConnectMessage {
    id: usize,
    x: f64,
    y: f64,
    z: f64,
    /// Nested `[x][z][y]`, null for empty voxels
    map: Vec<Vec<Vec<Option<u32>>>>,
    #[serde(default)]
    players: Vec<serde_json::Value>,
}

/// World extent as reported by the snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    width: usize,
    depth: usize,
    height: usize,
}

impl ConnectMessage {
    fn bounds(&self) -> Bounds {
        let width = self.map.len();
        let depth = self.map.first().map_or(0, Vec::len);
        let height = self
            .map
            .first()
            .and_then(|column| column.first())
            .map_or(0, Vec::len);
        Bounds {
            width,
            depth,
            height,
        }
    }
}

/// Messages a bot sends.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum BotAction {
    Color {
        color: u32,
    },
    Move {
        x: f64,
        y: f64,
        z: f64,
        pitch: f64,
        yaw: f64,
    },
    Place {
        x: usize,
        y: usize,
        z: usize,
    },
    Break {
        x: usize,
        y: usize,
        z: usize,
    },
}

/// What one bot did and saw.
#[derive(Debug, Default)]
struct BotReport {
    id: Option<usize>,
    moves_sent: u64,
    edits_sent: u64,
    received: BTreeMap<String, u64>,
}

impl BotReport {
    fn record(&mut self, text: &str) {
        let action = serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .and_then(|value| value.get("action").and_then(|a| a.as_str()).map(str::to_owned))
            .unwrap_or_else(|| "unparsed".to_string());
        *self.received.entry(action).or_insert(0) += 1;
    }
}

/// Timer period for a per-second frequency, or `None` unless the
/// frequency is positive, finite and yields a non-zero period.
fn tick_period(freq: f64) -> Option<Duration> {
    if !(freq > 0.0 && freq.is_finite()) {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / freq)
        .ok()
        .filter(|period| !period.is_zero())
}

/// Random block edit strictly above the protected floor.
fn random_edit(rng: &mut impl Rng, bounds: Bounds) -> Option<BotAction> {
    if bounds.width == 0 || bounds.depth == 0 || bounds.height < 2 {
        return None;
    }
    let x = rng.gen_range(0..bounds.width);
    let y = rng.gen_range(1..bounds.height);
    let z = rng.gen_range(0..bounds.depth);

    Some(if rng.gen_bool(0.7) {
        BotAction::Place { x, y, z }
    } else {
        BotAction::Break { x, y, z }
    })
}

async fn simulate_bot(
    index: u32,
    args: Args,
    move_period: Duration,
    build_period: Duration,
) -> Result<BotReport, BotError> {
    let (ws_stream, _) = connect_async(args.url.as_str()).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut report = BotReport::default();
    let mut rng = StdRng::from_entropy();

    // The relay always opens with the private connect message.
    let greeting: ConnectMessage = loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                report.record(text.as_str());
                break serde_json::from_str(text.as_str())?;
            }
            Some(Ok(Message::Close(frame))) => {
                return Err(format!("bot {index} refused by relay: {frame:?}").into());
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(format!("bot {index}: connection closed before connect").into()),
        }
    };

    let bounds = greeting.bounds();
    report.id = Some(greeting.id);
    info!(
        "🤖 Bot {} connected as session {} in a {}x{}x{} world with {} other player(s)",
        index,
        greeting.id,
        bounds.width,
        bounds.depth,
        bounds.height,
        greeting.players.len()
    );

    let color = rng.gen_range(0..=0xff_ff_ffu32);
    send(&mut ws_sender, &BotAction::Color { color }).await?;

    let (mut x, y, mut z) = (greeting.x, greeting.y, greeting.z);
    let mut yaw = 0.0f64;

    let mut move_timer = interval(move_period);
    let mut build_timer = interval(build_period);
    let deadline = sleep(Duration::from_secs(args.duration));
    tokio::pin!(deadline);
    let started = Instant::now();

    loop {
        tokio::select! {
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => report.record(text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    warn!("🔌 Bot {} closed by relay: {:?}", index, frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("❌ Bot {} connection error: {}", index, e);
                    break;
                }
                None => {
                    warn!("🔌 Bot {} connection ended", index);
                    break;
                }
            },
            _ = move_timer.tick() => {
                yaw += rng.gen_range(-0.3..0.3);
                x = (x + yaw.cos() * 0.2).clamp(0.0, bounds.width as f64);
                z = (z + yaw.sin() * 0.2).clamp(0.0, bounds.depth as f64);
                let pitch = rng.gen_range(-0.5..0.5);
                send(&mut ws_sender, &BotAction::Move { x, y, z, pitch, yaw }).await?;
                report.moves_sent += 1;
            }
            _ = build_timer.tick() => {
                if let Some(edit) = random_edit(&mut rng, bounds) {
                    debug!("🧱 Bot {} sends {:?}", index, edit);
                    send(&mut ws_sender, &edit).await?;
                    report.edits_sent += 1;
                }
            }
            _ = &mut deadline => {
                info!("⏰ Bot {} finished after {:.1}s", index, started.elapsed().as_secs_f64());
                break;
            }
        }
    }

    let _ = ws_sender.send(Message::Close(None)).await;
    Ok(report)
}

async fn send<S>(sink: &mut S, action: &BotAction) -> Result<(), BotError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let text = serde_json::to_string(action)?;
    sink.send(Message::Text(text.into())).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BotError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let move_period = tick_period(args.move_freq)
        .ok_or("--move-freq must be a positive, finite rate")?;
    let build_period = tick_period(args.build_freq)
        .ok_or("--build-freq must be a positive, finite rate")?;

    info!("🚀 Starting voxel relay simulation");
    info!("   • Bots: {}", args.bots);
    info!("   • Movement: {:.1} Hz", args.move_freq);
    info!("   • Edits: {:.1} Hz", args.build_freq);
    info!("   • Duration: {} seconds", args.duration);
    info!("   • Relay: {}", args.url);

    let mut handles = Vec::new();
    for index in 0..args.bots {
        let bot_args = args.clone();
        handles.push(tokio::spawn(async move {
            (index, simulate_bot(index, bot_args, move_period, build_period).await)
        }));

        // Stagger connections to avoid overwhelming the relay
        sleep(Duration::from_millis(args.stagger_ms)).await;
    }

    info!("🛸 All {} bots launched", args.bots);

    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    let mut failed = 0;
    for handle in handles {
        match handle.await {
            Ok((index, Ok(report))) => {
                info!(
                    "📊 Bot {} (session {:?}): sent {} moves, {} edits; received {:?}",
                    index, report.id, report.moves_sent, report.edits_sent, report.received
                );
                for (action, count) in report.received {
                    *totals.entry(action).or_insert(0) += count;
                }
            }
            Ok((index, Err(e))) => {
                error!("❌ Bot {} failed: {}", index, e);
                failed += 1;
            }
            Err(e) => {
                error!("❌ Bot task panicked: {}", e);
                failed += 1;
            }
        }
    }

    info!("✅ Simulation complete: {} bot(s) failed", failed);
    for (action, count) in &totals {
        info!("   • {}: {}", action, count);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connect_message_bounds() {
        let text = json!({
            "action": "connect", "id": 3, "color": 0xffffff,
            "x": 1.0, "y": 6.0, "z": 1.0, "pitch": 0.0, "yaw": 0.0,
            "map": [
                [[1, null, null], [1, null, null]],
                [[1, null, null], [1, 5, null]],
            ],
            "players": [{"id": 0}],
        })
        .to_string();

        let greeting: ConnectMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(greeting.id, 3);
        assert_eq!(greeting.players.len(), 1);
        assert_eq!(
            greeting.bounds(),
            Bounds {
                width: 2,
                depth: 2,
                height: 3
            }
        );
    }

    #[test]
    fn test_edits_stay_above_floor() {
        let mut rng = StdRng::seed_from_u64(7);
        let bounds = Bounds {
            width: 4,
            depth: 3,
            height: 5,
        };
        for _ in 0..200 {
            match random_edit(&mut rng, bounds) {
                Some(BotAction::Place { x, y, z }) | Some(BotAction::Break { x, y, z }) => {
                    assert!(x < 4 && z < 3);
                    assert!((1..5).contains(&y));
                }
                other => panic!("unexpected edit {:?}", other),
            }
        }
        assert!(random_edit(&mut rng, Bounds { width: 4, depth: 3, height: 1 }).is_none());
    }

    #[test]
    fn test_tick_period_rejects_unusable_rates() {
        assert_eq!(tick_period(10.0), Some(Duration::from_millis(100)));
        assert_eq!(tick_period(0.5), Some(Duration::from_secs(2)));

        assert_eq!(tick_period(0.0), None);
        assert_eq!(tick_period(-1.0), None);
        assert_eq!(tick_period(f64::NAN), None);
        assert_eq!(tick_period(f64::INFINITY), None);
        assert_eq!(tick_period(1e300), None);
    }

    #[test]
    fn test_actions_serialize_with_tag() {
        let value = serde_json::to_value(BotAction::Place { x: 1, y: 2, z: 3 }).unwrap();
        assert_eq!(value, json!({"action": "place", "x": 1, "y": 2, "z": 3}));

        let value = serde_json::to_value(BotAction::Color { color: 0xabcdef }).unwrap();
        assert_eq!(value, json!({"action": "color", "color": 0xabcdef}));
    }

    #[test]
    fn test_report_counts_by_action() {
        let mut report = BotReport::default();
        report.record(r#"{"action":"place","x":1,"y":2,"z":3,"color":1}"#);
        report.record(r#"{"action":"place","x":1,"y":2,"z":3,"color":1}"#);
        report.record(r#"{"action":"leave","id":2}"#);
        report.record("garbage");

        assert_eq!(report.received.get("place"), Some(&2));
        assert_eq!(report.received.get("leave"), Some(&1));
        assert_eq!(report.received.get("unparsed"), Some(&1));
    }
}
