//! Build a ring from generated peer addresses, print its finger tables and run traced
//! lookups, then show the distribution of hop counts.
//!
//! Run: `cargo run --example ring -- --bits 16 --peers 64 --lookups 1000`

use clap::{Parser, ValueEnum};
use histo::Histogram;
use tracing::{info, Level};

use chord::{Chord, Id, LookupTrace, RoutingStrategy};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    FingerJump,
    Direct,
}

impl From<Strategy> for RoutingStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::FingerJump => RoutingStrategy::FingerJump,
            Strategy::Direct => RoutingStrategy::DirectMembership,
        }
    }
}

#[derive(Parser)]
struct Cli {
    /// Bit width of the identifier space
    #[arg(short, long, default_value_t = 16)]
    bits: u32,
    /// Number of peers, addressed as 10.0.x.y:6881
    #[arg(short, long, default_value_t = 32)]
    peers: u16,
    /// Number of random keys to look up
    #[arg(short, long, default_value_t = 1000)]
    lookups: usize,
    /// Lookup strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::Direct)]
    strategy: Strategy,
    /// Print every finger table
    #[arg(short, long)]
    fingers: bool,
    /// Log every lookup
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .init();

    let addresses: Vec<String> = (0..cli.peers)
        .map(|i| format!("10.0.{}.{}:6881", i / 256, i % 256))
        .collect();

    let chord = match Chord::builder()
        .bits(cli.bits)
        .strategy(cli.strategy.into())
        .build(addresses)
    {
        Ok(chord) => chord,
        Err(error) => {
            eprintln!("Could not build ring: {}", error);
            std::process::exit(1);
        }
    };

    info!(
        peers = chord.ring().len(),
        bits = cli.bits,
        strategy = ?chord.config().strategy,
        "Ring built"
    );

    println!("Ring:");
    for peer in chord.ring().iter() {
        println!("  {:>12} {}", peer.id(), peer.address());
    }

    if cli.fingers {
        println!("\nFinger tables:");
        for table in chord.engine().fingers().iter() {
            let entries: Vec<String> = table.entries().iter().map(Id::to_string).collect();
            println!("  {:>12} [{}]", table.owner(), entries.join(", "));
        }
    }

    let space = chord.engine().space();
    let starts = chord.ring().ids();

    let mut histogram = Histogram::with_buckets(10);
    let mut failed = 0;

    for i in 0..cli.lookups {
        let key = space.random_id();
        let start = starts[i % starts.len()];
        let mut trace = LookupTrace::new();

        match chord.engine().query_id_traced(start, key, &mut trace) {
            Ok(responsible) => {
                if i < 5 {
                    println!(
                        "\n{} from {} -> {} via {:?}",
                        key,
                        start,
                        responsible,
                        trace.hops()
                    );
                }
                histogram.add(trace.len() as u64);
            }
            Err(error) => {
                info!(?key, ?start, %error, "Lookup failed");
                failed += 1;
            }
        }
    }

    println!("\nHops per lookup ({} failed):\n{}", failed, histogram);
}
