//! Front-end independent input.

use wiresim_core::{Command, ParseCommandError, PollingMode, TimerId};

use crate::SimTask;

/// One unit of work delivered to the [`Runtime`](crate::Runtime).
///
/// Drivers translate whatever they read (terminal lines, scripted steps,
/// fired timers) into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// User command for the connection.
    Command(Command),
    /// Switch the polling comparison.
    SetPollingMode(PollingMode),
    /// A scheduler timer fired.
    Timer {
        /// Timer that fired
        id: TimerId,
        /// Work it carries
        task: SimTask,
    },
    /// Re-render without changing anything.
    Refresh,
    /// Stop the runtime.
    Quit,
}

impl Input {
    /// Parse one line of user input.
    ///
    /// Blank lines yield `Ok(None)`. Accepted forms:
    ///
    /// - any [`Command`] name or alias (`connect`, `d`, `pause`, ...)
    /// - `mode <polling|long-polling|realtime>`
    /// - `status` / `s`
    /// - `quit` / `q` / `exit`
    pub fn parse(line: &str) -> Result<Option<Self>, ParseCommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default().to_ascii_lowercase();
        let rest: Vec<&str> = words.collect();

        let input = match (head.as_str(), rest.as_slice()) {
            ("quit" | "q" | "exit", []) => Self::Quit,
            ("status" | "s", []) => Self::Refresh,
            ("mode" | "m", [mode]) => Self::SetPollingMode(mode.parse()?),
            (_, []) => Self::Command(head.parse()?),
            _ => return Err(ParseCommandError { input: line.to_string() }),
        };

        Ok(Some(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_controls() {
        assert_eq!(Input::parse("connect"), Ok(Some(Input::Command(Command::Connect))));
        assert_eq!(Input::parse("  E \n"), Ok(Some(Input::Command(Command::SimulateError))));
        assert_eq!(Input::parse("status"), Ok(Some(Input::Refresh)));
        assert_eq!(Input::parse("q"), Ok(Some(Input::Quit)));
        assert_eq!(
            Input::parse("mode long"),
            Ok(Some(Input::SetPollingMode(PollingMode::LongPolling)))
        );
    }

    #[test]
    fn blank_line_is_not_input() {
        assert_eq!(Input::parse(""), Ok(None));
        assert_eq!(Input::parse("   \t"), Ok(None));
    }

    #[test]
    fn rejects_unknown_and_malformed_lines() {
        assert!(Input::parse("reboot").is_err());
        assert!(Input::parse("mode").is_err());
        assert!(Input::parse("mode fax").is_err());
        assert_eq!(
            Input::parse("connect now"),
            Err(ParseCommandError { input: "connect now".to_string() })
        );
    }
}
