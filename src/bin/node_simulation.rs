//! Field Node Simulation
//!
//! Emits the frames a set of field nodes would put on the shared link, one
//! per line on stdout, for exercising fieldlink without hardware:
//! - short-key (`n`,`t`,`u`) and long-key (`node`,`temperatura`,`umidade`) objects
//! - firmware chatter around the object (`Data sent: {...}`)
//! - occasional garbage lines
//! - temperature and humidity excursions past the default limits
//!
//! # Usage
//! ```bash
//! ./node-simulation --count 300 --interval-ms 100 | ./fieldlink --stdin
//! ```

use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use std::io::{self, Write};
use std::time::Duration;

// ============================================================================
// Environment Constants
// ============================================================================

/// Typical indoor temperature (°C)
const BASE_TEMPERATURE: f64 = 24.0;
/// Typical relative humidity (%)
const BASE_HUMIDITY: f64 = 55.0;
/// Temperature during an over-temperature excursion (°C)
const HOT_TEMPERATURE: f64 = 34.0;
/// Humidity during a damp excursion (%)
const DAMP_HUMIDITY: f64 = 80.0;

// ============================================================================
// CLI Arguments
// ============================================================================

/// Parse a probability in `0..=1`; NaN is rejected too.
fn probability(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("'{raw}' is not a number: {e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("'{raw}' is not a probability between 0 and 1"))
    }
}

#[derive(Parser, Debug)]
#[command(name = "node-simulation")]
#[command(about = "Synthetic field node frames for fieldlink testing")]
#[command(version = "1.0")]
struct Args {
    /// Number of nodes (Node1..NodeN)
    #[arg(short, long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=64))]
    nodes: u32,

    /// Frames to emit in total (0 = run until interrupted)
    #[arg(short, long, default_value = "300")]
    count: u64,

    /// Delay between frames in milliseconds
    #[arg(short, long, default_value = "200")]
    interval_ms: u64,

    /// Probability that a frame is replaced by garbage
    #[arg(long, default_value = "0.05", value_parser = probability)]
    garbage_rate: f64,

    /// Probability that a node starts an excursion on a given frame
    #[arg(long, default_value = "0.02", value_parser = probability)]
    excursion_rate: f64,

    /// Suppress the summary on stderr
    #[arg(short, long)]
    quiet: bool,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
}

// ============================================================================
// Node Model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Excursion {
    None,
    Hot,
    Damp,
}

/// Key naming used by a node's firmware revision
#[derive(Debug, Clone, Copy, PartialEq)]
enum KeyStyle {
    Short,
    Long,
}

#[derive(Debug)]
struct SimNode {
    id: String,
    key_style: KeyStyle,
    chatty: bool,
    temperature: f64,
    humidity: f64,
    excursion: Excursion,
    excursion_left: u32,
}

struct Simulation {
    rng: StdRng,
    nodes: Vec<SimNode>,
    noise: Normal<f64>,
    garbage_rate: f64,
    excursion_rate: f64,
    frames: u64,
    garbage_frames: u64,
    excursion_frames: u64,
}

const GARBAGE: &[&str] = &[
    "garbage",
    "{\"n\":\"Node1\",\"t\":",
    "Data sent: ",
    "\u{1}\u{2}~~~",
    "{\"n\":\"Node2\",\"t\":\"hot\",\"u\":50}",
    "rst:0x1 (POWERON_RESET),boot:0x13",
];

impl Simulation {
    fn new(args: &Args) -> Result<Self, rand_distr::NormalError> {
        let mut rng = match args.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let nodes = (1..=args.nodes)
            .map(|i| SimNode {
                id: format!("Node{i}"),
                key_style: if i % 2 == 0 { KeyStyle::Long } else { KeyStyle::Short },
                chatty: rng.gen_bool(0.5),
                temperature: BASE_TEMPERATURE + rng.gen_range(-2.0..2.0),
                humidity: BASE_HUMIDITY + rng.gen_range(-5.0..5.0),
                excursion: Excursion::None,
                excursion_left: 0,
            })
            .collect();

        Ok(Self {
            rng,
            nodes,
            noise: Normal::new(0.0, 0.3)?,
            garbage_rate: args.garbage_rate,
            excursion_rate: args.excursion_rate,
            frames: 0,
            garbage_frames: 0,
            excursion_frames: 0,
        })
    }

    fn next_frame(&mut self) -> String {
        self.frames += 1;

        if self.rng.gen_bool(self.garbage_rate) {
            self.garbage_frames += 1;
            return GARBAGE[self.rng.gen_range(0..GARBAGE.len())].to_string();
        }

        let index = self.rng.gen_range(0..self.nodes.len());
        let start_excursion = self.rng.gen_bool(self.excursion_rate);
        let hot = self.rng.gen_bool(0.5);
        let dt = self.noise.sample(&mut self.rng);
        let du = self.noise.sample(&mut self.rng) * 3.0;
        let node = &mut self.nodes[index];

        if node.excursion == Excursion::None && start_excursion {
            node.excursion = if hot { Excursion::Hot } else { Excursion::Damp };
            node.excursion_left = 5;
        }

        // Random walk around the baseline, pulled back towards it
        node.temperature += dt + (BASE_TEMPERATURE - node.temperature) * 0.05;
        node.humidity += du + (BASE_HUMIDITY - node.humidity) * 0.05;

        let (temperature, humidity) = match node.excursion {
            Excursion::None => (node.temperature, node.humidity),
            Excursion::Hot => (HOT_TEMPERATURE + dt, node.humidity),
            Excursion::Damp => (node.temperature, DAMP_HUMIDITY + du),
        };
        if node.excursion != Excursion::None {
            self.excursion_frames += 1;
            node.excursion_left -= 1;
            if node.excursion_left == 0 {
                node.excursion = Excursion::None;
            }
        }

        let object = match node.key_style {
            KeyStyle::Short => serde_json::json!({
                "n": node.id,
                "t": round1(temperature),
                "u": round1(humidity),
            }),
            KeyStyle::Long => serde_json::json!({
                "node": node.id,
                "temperatura": round1(temperature),
                "umidade": round1(humidity),
            }),
        };

        if node.chatty {
            format!("Data sent: {object}")
        } else {
            object.to_string()
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut sim = Simulation::new(&args)?;
    let interval = Duration::from_millis(args.interval_ms);

    if !args.quiet {
        eprintln!("{}", "=".repeat(60));
        eprintln!("FIELD NODE SIMULATION");
        eprintln!("  Nodes: {}", args.nodes);
        eprintln!("  Frames: {}", if args.count == 0 { "unbounded".to_string() } else { args.count.to_string() });
        eprintln!("  Interval: {} ms", args.interval_ms);
        if let Some(seed) = args.seed {
            eprintln!("  Random seed: {seed}");
        }
        eprintln!("{}", "=".repeat(60));
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    while args.count == 0 || sim.frames < args.count {
        let frame = sim.next_frame();
        if let Err(e) = writeln!(out, "{frame}").and_then(|()| out.flush()) {
            // Downstream closed the pipe
            if e.kind() == io::ErrorKind::BrokenPipe {
                break;
            }
            return Err(e.into());
        }
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    if !args.quiet {
        eprintln!(
            "Emitted {} frames ({} garbage, {} in excursions)",
            sim.frames, sim.garbage_frames, sim.excursion_frames
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_must_be_probabilities() {
        assert_eq!(probability("0.25"), Ok(0.25));
        assert_eq!(probability("1"), Ok(1.0));
        assert!(probability("NaN").is_err());
        assert!(probability("1.5").is_err());
        assert!(probability("-0.1").is_err());
        assert!(probability("often").is_err());
    }

    #[test]
    fn test_nan_garbage_rate_rejected_by_cli() {
        let parsed = Args::try_parse_from(["node-simulation", "--garbage-rate", "NaN"]);
        assert!(parsed.is_err());

        let args = Args::try_parse_from(["node-simulation", "--excursion-rate", "0.5"]).unwrap();
        assert_eq!(args.excursion_rate, 0.5);
    }
}
