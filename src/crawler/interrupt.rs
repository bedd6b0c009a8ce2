//! Ctrl-C prompt

use std::io::{BufRead, Write};

/// What to do after the user interrupted the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptChoice {
    /// Stop, saving a resume file
    Abort,
    Continue,
    /// Print the partial results and continue
    Results,
}

/// Parses an answer; only the first letter matters
pub fn parse_choice(input: &str) -> Option<InterruptChoice> {
    match input.trim().chars().next()?.to_ascii_lowercase() {
        'a' => Some(InterruptChoice::Abort),
        'c' => Some(InterruptChoice::Continue),
        'r' => Some(InterruptChoice::Results),
        _ => None,
    }
}

/// Asks on stderr until a valid answer is read from stdin
///
/// A closed stdin aborts.
pub async fn prompt() -> InterruptChoice {
    tokio::task::spawn_blocking(|| {
        let stdin = std::io::stdin();
        loop {
            eprint!("\nInterrupted. [a]bort, [c]ontinue or show [r]esults? ");
            let _ = std::io::stderr().flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return InterruptChoice::Abort,
                Ok(_) => {
                    if let Some(choice) = parse_choice(&line) {
                        return choice;
                    }
                }
            }
        }
    })
    .await
    .unwrap_or(InterruptChoice::Abort)
}
