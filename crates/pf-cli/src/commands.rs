//! Console Commands
//!
//! Line-oriented operator console on stdin. Commands mutate the dispatcher
//! and session client; the event pump keeps running underneath.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use pf_engine::IntensityMode;
use pf_session::{EventDispatcher, SessionClient};

/// One parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Connect,
    Disconnect,
    Mode(IntensityMode),
    Strength(f32),
    Test,
    Enable,
    Disable,
    Status,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line; `Ok(None)` for blank lines
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return Ok(None);
        };
        let arg = parts.next();

        let parsed = match command.to_ascii_lowercase().as_str() {
            "connect" => ConsoleCommand::Connect,
            "disconnect" => ConsoleCommand::Disconnect,
            "mode" => {
                let arg = arg.ok_or("usage: mode <onitem|percent|time>")?;
                ConsoleCommand::Mode(IntensityMode::from_str(arg)?)
            }
            "strength" => {
                let arg = arg.ok_or("usage: strength <0.0..1.0>")?;
                let value: f32 = arg.parse().map_err(|_| format!("not a number: {arg}"))?;
                ConsoleCommand::Strength(value)
            }
            "test" => ConsoleCommand::Test,
            "enable" => ConsoleCommand::Enable,
            "disable" => ConsoleCommand::Disable,
            "status" => ConsoleCommand::Status,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(format!("unknown command '{other}' (try 'help')")),
        };
        Ok(Some(parsed))
    }
}

const HELP: &str = "\
commands:
  connect              connect to the session server
  disconnect           drop the session connection
  mode <m>             intensity mode: onitem, percent, time
  strength <s>         manual strength for onitem mode (0.0..1.0)
  test                 play the self-test pattern
  enable / disable     gate actuator output
  status               session and playback state
  quit                 disconnect and exit";

/// Read console commands from stdin until `quit` or EOF
pub async fn run_console(
    dispatcher: Arc<EventDispatcher>,
    client: Arc<SessionClient>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            ConsoleCommand::Connect => match client.connect().await {
                Ok(()) => println!("connecting..."),
                Err(err) => println!("connect failed: {err}"),
            },
            ConsoleCommand::Disconnect => {
                client.disconnect().await;
                dispatcher.set_enabled(false).await;
                println!("disconnected");
            }
            ConsoleCommand::Mode(mode) => {
                dispatcher.set_mode(mode);
                println!("mode: {mode:?}");
            }
            ConsoleCommand::Strength(value) => {
                dispatcher.set_manual_strength(value);
                println!("strength: {:.2}", value.clamp(0.0, 1.0));
            }
            ConsoleCommand::Test => {
                println!("running self-test...");
                dispatcher.run_self_test().await;
                println!("self-test done");
            }
            ConsoleCommand::Enable => {
                dispatcher.set_enabled(true).await;
                println!("output enabled");
            }
            ConsoleCommand::Disable => {
                dispatcher.set_enabled(false).await;
                println!("output disabled");
            }
            ConsoleCommand::Status => {
                let (mode, base, enabled) = dispatcher.status();
                println!(
                    "session: {:?} | mode: {mode:?} | base strength: {base:.2} | output: {}",
                    client.state().await,
                    if enabled { "enabled" } else { "disabled" },
                );
            }
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => break,
        }
    }

    Ok(())
}
