//! Test-body discovery: the `CommandRecognizer` specialization that turns
//! a plain `ShellParser` into a `ScriptParser` (§4.4).

use super::test_parser::ChainAccumulator;
use super::{CommandRecognizer, NoopRecognizer, Parser};
use crate::lexer::Token;
use regex::Regex;

/// One annotated `test_expect_{success,failure}` body, ready to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    pub title: String,
    pub body: String,
    /// Whether `body` actually carries a `?!...?!` annotation (as opposed
    /// to being included only because `--emit-all` was set). Exit-code
    /// computation must use this, not a substring search over `body` —
    /// a clean test whose body text happens to contain literal `?!`
    /// characters must not flip the exit code (§8 "Exit-code
    /// consistency").
    pub flagged: bool,
}

const TRAILING_TERMINATORS: [&str; 6] = [";", "&", "\n", "|", "&&", "||"];

fn strip_trailing_terminators(cmd: &[Token]) -> usize {
    let mut n = cmd.len();
    while n > 0 && TRAILING_TERMINATORS.contains(&cmd[n - 1].as_str()) {
        n -= 1;
    }
    n
}

/// Reduces a token's surface syntax to its shell-visible content:
/// `'x'` -> `x`, `"x"` -> `x`, and composite runs like `word"a b"42'c d'`
/// -> `worda b42c d`. Outside single quotes, backslash escapes the next
/// character; a backslash immediately before a newline keeps the
/// backslash as a line-splice marker rather than dropping it (§9 open
/// question).
pub fn unwrap_token(tok: &Token) -> String {
    let chars: Vec<char> = tok.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\'' => {
                i += 1;
                while i < chars.len() && chars[i] != '\'' {
                    out.push(chars[i]);
                    i += 1;
                }
                i += 1; // closing quote
            }
            '"' => {
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        let nc = chars[i + 1];
                        if nc == '\n' {
                            out.push('\\');
                            out.push('\n');
                        } else {
                            out.push(nc);
                        }
                        i += 2;
                    } else {
                        out.push(chars[i]);
                        i += 1;
                    }
                }
                i += 1; // closing quote
            }
            '\\' if i + 1 < chars.len() => {
                let nc = chars[i + 1];
                if nc == '\n' {
                    out.push('\\');
                    out.push('\n');
                } else {
                    out.push(nc);
                }
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Space-joins the annotated token stream, strips a leading `\n`, trims one
/// leading and one trailing space per line, and ensures a trailing
/// newline (§4.4 steps 1-4).
fn format_body(stream: &[Token]) -> String {
    let joined = stream.join(" ");
    let joined = joined.strip_prefix('\n').unwrap_or(&joined);
    let lines: Vec<&str> = joined
        .split('\n')
        .map(|line| {
            let line = line.strip_prefix(' ').unwrap_or(line);
            line.strip_suffix(' ').unwrap_or(line)
        })
        .collect();
    let mut out = lines.join("\n");
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Recognizes `test_expect_success`/`test_expect_failure` invocations at
/// any top-level nesting depth, re-parses their body via a nested
/// `TestParser`, and collects one [`TestReport`] per flagged (or, with
/// `emit_all`, every) test.
pub struct ScriptRecognizer {
    emit_all: bool,
    test_count: usize,
    reports: Vec<TestReport>,
}

static ANNOTATION: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();

fn annotation_re() -> &'static Regex {
    ANNOTATION.get_or_init(|| Regex::new(r"\?![^?]+\?!").expect("valid annotation regex"))
}

impl ScriptRecognizer {
    pub fn new(emit_all: bool) -> Self {
        ScriptRecognizer {
            emit_all,
            test_count: 0,
            reports: Vec::new(),
        }
    }

    pub fn test_count(&self) -> usize {
        self.test_count
    }

    pub fn into_reports(self) -> Vec<TestReport> {
        self.reports
    }

    fn check_test(&mut self, title_tok: &Token, body_tok: &Token) {
        self.test_count += 1;
        let title = unwrap_token(title_tok);
        let body = unwrap_token(body_tok);

        let mut test_parser: Parser<ChainAccumulator, NoopRecognizer> =
            Parser::with(&body, ChainAccumulator, NoopRecognizer);
        let stream = test_parser.parse_all();

        let flagged = stream.iter().any(|t| annotation_re().is_match(t));
        if flagged || self.emit_all {
            self.reports.push(TestReport {
                title,
                body: format_body(&stream),
                flagged,
            });
        }
    }
}

impl Default for ScriptRecognizer {
    fn default() -> Self {
        Self::new(false)
    }
}

impl CommandRecognizer for ScriptRecognizer {
    fn recognize(&mut self, cmd: Vec<Token>) -> Vec<Token> {
        if cmd.is_empty() {
            return cmd;
        }
        if cmd[0] != "test_expect_success" && cmd[0] != "test_expect_failure" {
            return cmd;
        }
        let n = strip_trailing_terminators(&cmd);
        if n == 0 {
            return cmd;
        }
        let last_idx = n - 1;
        if last_idx == 2 {
            self.check_test(&cmd[1], &cmd[2]);
        } else if last_idx > 2 {
            self.check_test(&cmd[2], &cmd[3]);
        }
        cmd
    }
}

/// A `ShellParser` specialized for recognizing test bodies anywhere in a
/// script, without itself flagging `&&`-chains at the script's own
/// top level (that only applies inside a test body, via `TestParser`).
pub type ScriptParser = Parser<super::NoopAccumulator, ScriptRecognizer>;
