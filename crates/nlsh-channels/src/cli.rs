use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use nlsh_core::channel::{Channel, ChannelError, ChannelMessage};

/// Terminal channel: reads tasks from stdin, writes responses to stdout.
#[derive(Debug)]
pub struct CliChannel {
    lines: Lines<BufReader<Stdin>>,
}

impl CliChannel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for CliChannel {
    async fn recv(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
        loop {
            prompt("You: ")?;
            let Some(line) = self.lines.next_line().await.map_err(ChannelError::Io)? else {
                return Ok(None);
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed == "exit" || trimmed == "quit" {
                return Ok(None);
            }
            return Ok(Some(ChannelMessage {
                text: trimmed.to_owned(),
            }));
        }
    }

    async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        println!("{text}");
        Ok(())
    }

    async fn confirm(&mut self, prompt_text: &str) -> Result<bool, ChannelError> {
        prompt(&format!("{prompt_text} [y/N]: "))?;
        // closed input counts as a refusal
        let Some(line) = self.lines.next_line().await.map_err(ChannelError::Io)? else {
            return Ok(false);
        };
        let answer = line.trim().to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

fn prompt(text: &str) -> Result<(), ChannelError> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{text}").map_err(ChannelError::Io)?;
    stdout.flush().map_err(ChannelError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constructs() {
        let channel = CliChannel::default();
        let debug = format!("{channel:?}");
        assert!(debug.contains("CliChannel"));
    }
}
