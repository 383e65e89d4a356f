//! CLI bootstrap: parses the interface list and routing table, wires up
//! a `Router`, spawns the ARP timer thread, and runs a receive loop.
//!
//! A real deployment plugs a raw-socket or TAP-backed `HostIo` into the
//! `Router`; that backend is an external collaborator per `spec.md` §1
//! and is not implemented here. This binary is a demonstration harness:
//! it drives the pipeline with `ChannelHostIo`, reading frames as hex
//! from stdin in the form `<iface> <hex bytes>` (one per line) and
//! printing what each frame caused the router to send.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use ipv4_router::config;
use ipv4_router::host_io::ChannelHostIo;
use ipv4_router::router::Router;

/// Forwarding plane of an IPv4 software router.
#[derive(Debug, Parser)]
#[command(name = "ipv4-router", about = "IPv4 software router forwarding plane")]
struct Args {
    /// Path to the interface list (lines of `name, MAC, IPv4`).
    #[arg(long)]
    interfaces: std::path::PathBuf,

    /// Path to the routing table (lines of `dest, gateway, netmask, iface`).
    #[arg(long)]
    routes: std::path::PathBuf,

    /// Raise the log verbosity. Repeatable: `-v` for debug, `-vv` for trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

/// Parses a line of the form `<iface> <hex bytes>` into an interface name
/// and a frame buffer. Whitespace inside the hex portion is ignored, so
/// `aa bb cc` and `aabbcc` are equivalent.
fn parse_demo_line(line: &str) -> Option<(String, Vec<u8>)> {
    let mut parts = line.trim().splitn(2, char::is_whitespace);
    let iface = parts.next()?.to_string();
    let hex: String = parts.next()?.chars().filter(|c| !c.is_whitespace()).collect();
    if hex.is_empty() || hex.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let byte = u8::from_str_radix(std::str::from_utf8(chunk).ok()?, 16).ok()?;
        bytes.push(byte);
    }
    Some((iface, bytes))
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let interfaces = config::load_interfaces(&args.interfaces).unwrap_or_else(|err| {
        eprintln!("failed to load interfaces from {}: {err}", args.interfaces.display());
        std::process::exit(1);
    });
    let routes = config::load_routes(&args.routes).unwrap_or_else(|err| {
        eprintln!("failed to load routes from {}: {err}", args.routes.display());
        std::process::exit(1);
    });

    let host_io: Arc<ChannelHostIo> = Arc::new(ChannelHostIo::new());
    let router = Arc::new(Router::new(interfaces, routes, host_io.clone()));

    if let Err(err) = signal_hook::flag::register(signal_hook::consts::SIGINT, router.shutdown_flag()) {
        eprintln!("failed to register SIGINT handler: {err}");
        std::process::exit(1);
    }

    let timer_handle = ipv4_router::timer::spawn(router.clone());

    tracing::info!("router ready, reading demonstration frames from stdin as `<iface> <hex bytes>`");

    let stdin = io::stdin();
    let stdout = io::stdout();
    for line in stdin.lock().lines() {
        if router.is_shutting_down() {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                eprintln!("error reading stdin: {err}");
                break;
            }
        };
        let Some((iface, frame)) = parse_demo_line(&line) else {
            if !line.trim().is_empty() {
                tracing::warn!(%line, "ignoring unparseable demo input line");
            }
            continue;
        };

        let action = router.handle_packet(&iface, &frame);
        let mut out = stdout.lock();
        let _ = writeln!(out, "{iface}: {action:?}");
        for other_iface in router.interfaces.iter() {
            for sent in host_io.drain(&other_iface.name) {
                let _ = writeln!(out, "  -> {}: {}", other_iface.name, hex::encode(&sent));
            }
        }
    }

    router.request_shutdown();
    timer_handle.join().expect("ARP timer thread panicked");
}

mod hex {
    /// Minimal hex encoding for the demo harness's stdout trace; avoids
    /// pulling in a dedicated crate for one debug-printing call site.
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}
