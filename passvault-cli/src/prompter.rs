use std::io::{self, BufRead, Write};

use passvault_core::{AuthOutcome, AuthPrompter, ChallengeRequest, PromptAvailability};

/// Asks for confirmation on the terminal.
///
/// Stands in for a biometric prompt during development. The question is asked
/// on a dedicated thread so the runtime keeps running while the user decides.
pub struct TerminalPrompter;

impl AuthPrompter for TerminalPrompter {
    fn availability(&self) -> PromptAvailability {
        PromptAvailability::Available
    }

    fn present(&self, request: ChallengeRequest) {
        std::thread::spawn(move || {
            let outcome = ask(request.reason(), &mut io::stdin().lock(), &mut io::stderr());
            tracing::debug!(?outcome, "terminal challenge answered");
            request.resolve(outcome);
        });
    }
}

fn ask(reason: &str, input: &mut impl BufRead, output: &mut impl Write) -> AuthOutcome {
    if write!(output, "{reason}\nAuthenticate? [y/N] ").and_then(|()| output.flush()).is_err() {
        return AuthOutcome::Canceled;
    }

    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => AuthOutcome::Canceled,
        Ok(_) => parse_answer(&line),
    }
}

fn parse_answer(line: &str) -> AuthOutcome {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => AuthOutcome::Succeeded,
        _ => AuthOutcome::Failed,
    }
}
