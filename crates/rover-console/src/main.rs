//! Terminal operator console for the rover link.
//!
//! Drives the connection manager from the command line: connect to the
//! rover or wait for it to call in, forward stdin lines over the link, and
//! print what comes back. Structured messages (`ROBOT`, `TARGET`) are
//! decoded; free-form status lines go through the noteworthy filter unless
//! `--verbose` shows everything.

use anyhow::Result;
use clap::{Parser, Subcommand};
use rover_link::{Link, LinkConfig, LinkEvent, PeerInfo, TcpTransport};
use rover_proto::{Inbound, ObstacleUpdate};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "rover-console", about = "Operator console for the rover link")]
struct Cli {
    /// Local endpoint for the accepting role.
    #[arg(long, default_value = "0.0.0.0:7200")]
    bind: String,

    /// Show every received line, not just noteworthy ones.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Dial the rover.
    Connect {
        /// Rover address (host:port).
        addr: String,
        /// Display name for log output.
        #[arg(long)]
        name: Option<String>,
    },

    /// Wait for the rover to connect to us.
    Listen {
        /// Expected rover address (host:port).
        addr: String,
        /// Display name for log output.
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rover_link=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let transport = TcpTransport::new(cli.bind.clone());
    let mut channels = Link::spawn(transport, LinkConfig::default());

    let (peer, accepting) = match &cli.command {
        Command::Connect { addr, name } => (peer_info(addr, name.as_deref()), false),
        Command::Listen { addr, name } => (peer_info(addr, name.as_deref()), true),
    };

    if accepting {
        channels.handle.listen(peer).await?;
    } else {
        channels.handle.connect(peer).await?;
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = channels.events.recv() => match event {
                Some(event) => print_event(event, cli.verbose),
                None => break,
            },
            line = stdin.next_line() => match line? {
                Some(line) if line.trim() == "/quit" => {
                    channels.handle.disconnect().await?;
                    channels.handle.cleanup().await;
                    break;
                }
                Some(line) if !line.trim().is_empty() => {
                    match outbound_line(line.trim()) {
                        Ok(framed) => channels.handle.send(framed).await?,
                        Err(e) => println!("! {e}"),
                    }
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    Ok(())
}

fn peer_info(addr: &str, name: Option<&str>) -> PeerInfo {
    match name {
        Some(name) => PeerInfo::named(addr, name),
        None => PeerInfo::new(addr),
    }
}

fn print_event(event: LinkEvent, verbose: bool) {
    match event {
        LinkEvent::Connected(peer) => println!("* connected to {peer}"),
        LinkEvent::Disconnected => println!("* disconnected"),
        LinkEvent::WaitingForConnection(peer) => println!("* waiting for {peer}"),
        LinkEvent::ConnectionTimeout => println!("* no connection before the deadline"),
        LinkEvent::ConnectionFailed(reason) => println!("* connection failed: {reason}"),
        LinkEvent::PeerDiscovered(peer) => println!("* discovered {peer}"),
        LinkEvent::DataReceived(line) => print_line(&line, verbose),
    }
}

fn print_line(line: &str, verbose: bool) {
    match Inbound::parse(line) {
        Ok(Inbound::Robot(update)) => {
            println!(
                "< rover at ({}, {}) facing {}",
                update.x, update.y, update.direction
            );
        }
        Ok(Inbound::Target(update)) => {
            println!(
                "< obstacle {} is target {}",
                update.obstacle, update.target_id
            );
        }
        Ok(Inbound::Command(cmd)) => println!("< command echo: {cmd}"),
        Ok(Inbound::Status(status)) => {
            if verbose || rover_proto::is_noteworthy(&status) {
                println!("< {status}");
            }
        }
        Err(e) => tracing::debug!(%line, error = %e, "undecodable line"),
    }
}

/// Turn an operator input line into a framed wire message.
///
/// `/obstacle <id> <x> <y>` and `/facing <id> <n|e|s|w>` expand to the
/// structured obstacle updates; everything else is sent verbatim.
fn outbound_line(input: &str) -> Result<Vec<u8>> {
    let update = if let Some(rest) = input.strip_prefix("/obstacle ") {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        let [id, x, y] = parts.as_slice() else {
            anyhow::bail!("usage: /obstacle <id> <x> <y>");
        };
        Some(ObstacleUpdate::Position {
            id: id.parse()?,
            x: x.parse()?,
            y: y.parse()?,
        })
    } else if let Some(rest) = input.strip_prefix("/facing ") {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        let [id, direction] = parts.as_slice() else {
            anyhow::bail!("usage: /facing <id> <n|e|s|w>");
        };
        Some(ObstacleUpdate::Facing {
            id: id.parse()?,
            direction: direction.parse().map_err(|e| anyhow::anyhow!("{e}"))?,
        })
    } else {
        None
    };

    let mut line = match update {
        Some(update) => update.to_string(),
        None => input.to_string(),
    };
    line.push('\n');
    Ok(line.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obstacle_shortcut_expands() {
        assert_eq!(outbound_line("/obstacle 3 10 4").unwrap(), b"POSITION 3 10 4\n");
        assert_eq!(outbound_line("/facing 3 s").unwrap(), b"DIRECTION 3 South\n");
    }

    #[test]
    fn plain_lines_pass_through_framed() {
        assert_eq!(outbound_line("forward").unwrap(), b"forward\n");
    }

    #[test]
    fn bad_shortcut_is_rejected() {
        assert!(outbound_line("/obstacle 3 10").is_err());
        assert!(outbound_line("/facing 3 up").is_err());
    }
}
