use std::io::{self, BufRead, Write};

pub static CONSOLE_LOG_TARGET: &'static str = "operator_console";

/// Human-readable progress output for the operator. Write failures are
/// logged and otherwise ignored; losing console text never stops the test.
pub struct OperatorConsole<W: Write> {
    out: W,
}

impl<W: Write> OperatorConsole<W> {
    pub fn new(out: W) -> Self {
        OperatorConsole { out }
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let result = writeln!(self.out, "{}", text.as_ref()).and_then(|_| self.out.flush());
        if let Err(e) = result {
            log::warn!(target: CONSOLE_LOG_TARGET, "Console write failed: {}", e);
        }
    }

    /// Text without a trailing newline, for status lines completed later.
    pub fn partial(&mut self, text: impl AsRef<str>) {
        let result = write!(self.out, "{}", text.as_ref()).and_then(|_| self.out.flush());
        if let Err(e) = result {
            log::warn!(target: CONSOLE_LOG_TARGET, "Console write failed: {}", e);
        }
    }

    pub fn banner(&mut self, title: &str) {
        let rule = "=".repeat(60);
        self.line(&rule);
        self.line(title);
        self.line(&rule);
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Asks the operator to type `token`. Only an exact match (the line ending
/// excluded) counts as consent; end of input is a refusal.
pub fn confirm_operator<R: BufRead, W: Write>(
    input: &mut R,
    console: &mut OperatorConsole<W>,
    token: &str,
) -> io::Result<bool> {
    console.partial(format!(
        "\n⚠️  WARNING: This will move the robot!\nType '{token}' to continue: "
    ));

    // Compared as bytes so input that is not UTF-8 is a plain refusal.
    let mut answer = Vec::new();
    if input.read_until(b'\n', &mut answer)? == 0 {
        console.line("");
        return Ok(false);
    }
    let answer = answer
        .strip_suffix(b"\n")
        .map(|a| a.strip_suffix(b"\r").unwrap_or(a))
        .unwrap_or(&answer);

    Ok(answer == token.as_bytes())
}
