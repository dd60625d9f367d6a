//! Chain-integrity checking: the `Accumulator` specialization that turns a
//! plain `ShellParser` into a `TestParser` (§4.3).

use super::Accumulator;
use crate::lexer::Token;
use regex::Regex;

/// Tokens a command may legitimately end in without breaking the chain
/// into whatever follows it.
const CHAIN_SAFE: [&str; 3] = ["&&", "||", "|"];

/// Index of the last non-newline token in `stream`, or `None` if `stream`
/// holds only (or no) newline tokens.
fn last_non_newline_index(stream: &[Token]) -> Option<usize> {
    stream.iter().rposition(|t| t != "\n")
}

/// Walks backward over `stream`, skipping `\n` tokens that correspond to
/// literal `"\n"` entries in `needles`, and matching the remaining needles
/// against tokens in reverse order. Needles are literal text, not
/// user-facing regexes — matched via an escaped, anchored pattern.
pub fn ends_with(stream: &[Token], needles: &[&str]) -> bool {
    let mut idx = stream.len();
    for needle in needles.iter().rev() {
        if *needle == "\n" {
            let mut skipped = false;
            while idx > 0 && stream[idx - 1] == "\n" {
                idx -= 1;
                skipped = true;
            }
            if !skipped {
                return false;
            }
            continue;
        }
        if idx == 0 {
            return false;
        }
        let pattern = format!("^{}$", regex::escape(needle));
        let re = Regex::new(&pattern).expect("escaped literal is always a valid regex");
        if !re.is_match(&stream[idx - 1]) {
            return false;
        }
        idx -= 1;
    }
    true
}

/// Flags a command lacking a trailing `&&`/`||`/`|` by inserting `?!AMP?!`
/// immediately after the last non-newline token already in the stream.
#[derive(Default)]
pub struct ChainAccumulator;

impl Accumulator for ChainAccumulator {
    fn accumulate(&mut self, stream: &mut Vec<Token>, cmd: Vec<Token>) {
        if stream.is_empty() {
            stream.extend(cmd);
            return;
        }
        if cmd.len() == 1 && cmd[0] == "\n" {
            stream.extend(cmd);
            return;
        }

        let chained = match last_non_newline_index(stream) {
            None => true, // nothing real precedes this command yet
            Some(i) => {
                let tail = &stream[i];
                CHAIN_SAFE.contains(&tail.as_str()) || tail == "?!AMP?!"
            }
        };

        if !chained {
            let insert_at = last_non_newline_index(stream).map(|i| i + 1).unwrap_or(0);
            stream.insert(insert_at, "?!AMP?!".to_string());
        }

        stream.extend(cmd);
    }
}
