//! Line-oriented operator console on stdin.
//!
//! One command per line: `start`, `stop`, `pause`, `resume`, `status`,
//! `shutdown`. Case and surrounding whitespace are ignored; blank lines are
//! skipped. `status` is answered from the handle's state board on the spot
//! instead of going through the queue.

use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use warlord_core::daemon::DaemonHandle;
use warlord_types::{Command, RequestId};

/// Parse one console line. `None` for blank or unknown input.
pub fn parse_command(line: &str) -> Option<Command> {
    let command = match line.trim().to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "stop" => Command::Stop,
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "status" => Command::GetStatus {
            request_id: RequestId::new(),
        },
        "shutdown" | "quit" | "exit" => Command::Shutdown,
        _ => return None,
    };
    Some(command)
}

/// Read commands from stdin until EOF and forward them to the daemon.
pub fn spawn_console(handle: DaemonHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match parse_command(&line) {
                    Some(Command::GetStatus { request_id }) => {
                        let status = handle.status();
                        info!(
                            %request_id,
                            state = %status.state,
                            queue_depth = status.queue_depth,
                            "Daemon status"
                        );
                    }
                    Some(command) => {
                        let command_id = handle.send(command);
                        info!(%command_id, %command, "Console command queued");
                    }
                    None => warn!(input = line.trim(), "Unknown console command"),
                },
                Ok(None) => {
                    debug!("Console input closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read console input");
                    break;
                }
            }
        }
    })
}

/// Send `Shutdown` when the process receives Ctrl-C.
pub fn spawn_ctrl_c(handle: DaemonHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                handle.send(Command::Shutdown);
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lifecycle_commands() {
        assert_eq!(parse_command("start"), Some(Command::Start));
        assert_eq!(parse_command("  STOP \n"), Some(Command::Stop));
        assert_eq!(parse_command("Pause"), Some(Command::Pause));
        assert_eq!(parse_command("resume"), Some(Command::Resume));
        assert_eq!(parse_command("quit"), Some(Command::Shutdown));
    }

    #[test]
    fn status_gets_a_fresh_request_id() {
        let first = parse_command("status");
        let second = parse_command("status");
        assert!(matches!(first, Some(Command::GetStatus { .. })));
        assert_ne!(first, second);
    }

    #[test]
    fn rejects_unknown_and_blank_input() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("advance"), None);
        assert_eq!(parse_command("start now"), None);
    }
}
