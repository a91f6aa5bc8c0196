//! Mesh Module Firmware Command-Line Interface
//!
//! This CLI provides tools for:
//! - Running a single node with an interactive terminal (`run`)
//! - Simulating a small mesh of nodes exchanging reports (`simulate`)
//!
//! The terminal accepts the same commands the firmware's UART console
//! would, e.g. `action this status get_status`, `rssistart`, or
//! `set_config beacon interval_ms 1000`.

use anyhow::Result;
use clap::{Parser, Subcommand};
use meshmod_core::modules::{BeaconModule, StatusModule};
use meshmod_core::node::Node;
use meshmod_core::packet::NodeId;
use meshmod_core::transport::{FrameQueue, LoopbackTransport, MemoryStore, NullRadio, RadioEvent};
use meshmod_core::LinkId;
use rand::Rng;
use std::io::BufRead;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "meshmod")]
#[command(author, version, about = "Mesh module firmware CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one node with an interactive terminal on stdin
    Run {
        /// Mesh address of the node
        #[arg(long, default_value = "1")]
        node_id: u16,
    },

    /// Simulate two connected nodes exchanging status reports
    Simulate {
        /// Number of timer ticks to run
        #[arg(long, default_value = "10")]
        ticks: u32,

        /// Milliseconds per tick
        #[arg(long, default_value = "5000")]
        tick_ms: u32,
    },
}

fn build_node(id: u16, queue: &FrameQueue) -> Node {
    let chip_id = [u32::from(id) << 16 | 0xBEEF, 0xCAFE];
    let mut node = Node::new(
        NodeId::new(id),
        chip_id,
        Box::new(LoopbackTransport::new(queue.clone())),
        Box::new(MemoryStore::new()),
        Box::new(NullRadio::new()),
    );
    node.register_module(Box::new(StatusModule::new()));
    node.register_module(Box::new(BeaconModule::new()));
    node.boot();
    node
}

/// Deliver queued frames until the mesh goes quiet
fn pump(queue: &FrameQueue, nodes: &mut [&mut Node]) {
    while let Some((target, frame)) = queue.pop() {
        for node in nodes.iter_mut() {
            if target.is_broadcast() || node.state().node_id == target {
                node.on_frame(&frame);
            }
        }
    }
}

fn run_terminal(node_id: u16) -> Result<()> {
    let queue = FrameQueue::new();
    let mut node = build_node(node_id, &queue);
    info!(node_id, "node up; type commands, ctrl-d to exit");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((name, args)) = tokens.split_first() else {
            continue;
        };
        if !node.command(name, args) {
            println!("unknown command: {line}");
        }
        // Self-addressed packets come back through the loopback
        pump(&queue, &mut [&mut node]);
        node.timer_tick(100);
        pump(&queue, &mut [&mut node]);
    }
    Ok(())
}

fn run_simulation(ticks: u32, tick_ms: u32) -> Result<()> {
    let queue = FrameQueue::new();
    let mut alice = build_node(1, &queue);
    let mut bob = build_node(2, &queue);
    let mut rng = rand::thread_rng();

    // Bring up the link between the two nodes, as the radio stack would
    for (node, partner) in [(&mut alice, 2u16), (&mut bob, 1u16)] {
        node.radio_event(RadioEvent::Connected {
            link: LinkId(1),
            partner: NodeId::new(partner),
        });
        node.radio_event(RadioEvent::HandshakeComplete { link: LinkId(1) });
    }

    for tick in 0..ticks {
        // Noisy signal samples around -60 dBm on both ends
        for node in [&mut alice, &mut bob] {
            for _ in 0..20 {
                let rssi = rng.gen_range(-70i8..=-50i8);
                node.radio_event(RadioEvent::SignalSample {
                    link: LinkId(1),
                    rssi,
                });
            }
        }

        alice.timer_tick(tick_ms);
        bob.timer_tick(tick_ms);
        pump(&queue, &mut [&mut alice, &mut bob]);

        if tick == ticks / 2 {
            debug!("midpoint status exchange");
            alice.command("action", &["2", "status", "get_status"]);
            bob.command("action", &["1", "status", "get_connections"]);
            pump(&queue, &mut [&mut alice, &mut bob]);
        }
    }

    for node in [&alice, &bob] {
        let summary = serde_json::json!({
            "node_id": node.state().node_id.to_u16(),
            "links": node.links().len(),
            "rssi": node
                .links()
                .iter()
                .map(|l| l.rssi.average())
                .collect::<Vec<_>>(),
        });
        println!("{summary}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { node_id } => run_terminal(node_id),
        Commands::Simulate { ticks, tick_ms } => run_simulation(ticks, tick_ms),
    }
}
