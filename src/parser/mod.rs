//! Recursive-descent grammar over the lexer's token stream.
//!
//! There is no Rust subclassing, so `TestParser` and `ScriptParser` aren't
//! separate types: they're the same [`Parser`] grammar parameterized, via
//! two small capability traits, over how completed commands are merged
//! into the running token stream ([`Accumulator`]) and how a completed
//! top-level command is post-processed ([`CommandRecognizer`]). A plain
//! `ShellParser` is just `Parser<NoopAccumulator, NoopRecognizer>`.

pub mod script_parser;
pub mod test_parser;

use crate::lexer::{Lexer, SubstitutionResolver, Token};
use regex::Regex;

/// How a completed command's tokens are merged into the running stream.
/// The `&&`-chain check (`test_parser::ChainAccumulator`) lives entirely
/// in one implementation of this seam.
pub trait Accumulator {
    fn accumulate(&mut self, stream: &mut Vec<Token>, cmd: Vec<Token>);
}

/// Post-processing hook invoked once per completed top-level command.
/// Test-body discovery (`script_parser::ScriptRecognizer`) lives entirely
/// in one implementation of this seam. The default is the identity.
pub trait CommandRecognizer {
    fn recognize(&mut self, cmd: Vec<Token>) -> Vec<Token>;
}

#[derive(Default)]
pub struct NoopAccumulator;

impl Accumulator for NoopAccumulator {
    fn accumulate(&mut self, stream: &mut Vec<Token>, cmd: Vec<Token>) {
        stream.extend(cmd);
    }
}

#[derive(Default)]
pub struct NoopRecognizer;

impl CommandRecognizer for NoopRecognizer {
    fn recognize(&mut self, cmd: Vec<Token>) -> Vec<Token> {
        cmd
    }
}

const TERMINATORS: [&str; 6] = [";", "&", "\n", "|", "&&", "||"];

fn is_terminator(tok: &str) -> bool {
    TERMINATORS.contains(&tok)
}

/// A plain, un-specialized grammar: no chain-checking, no test discovery.
pub type ShellParser = Parser<NoopAccumulator, NoopRecognizer>;

/// Recursive-descent parser over a single shared [`Lexer`]. `A` decides how
/// parsed commands accumulate into the output stream; `R` decides what
/// happens to each completed top-level command.
pub struct Parser<A: Accumulator, R: CommandRecognizer> {
    lexer: Lexer,
    pushback: Vec<Token>,
    stop_stack: Vec<Option<Regex>>,
    accumulator: A,
    recognizer: R,
}

impl<A: Accumulator + Default, R: CommandRecognizer + Default> Parser<A, R> {
    pub fn new(src: &str) -> Self {
        Self::with(src, A::default(), R::default())
    }
}

impl<A: Accumulator, R: CommandRecognizer> Parser<A, R> {
    pub fn with(src: &str, accumulator: A, recognizer: R) -> Self {
        Parser {
            lexer: Lexer::new(src),
            pushback: Vec::new(),
            stop_stack: Vec::new(),
            accumulator,
            recognizer,
        }
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    pub fn into_recognizer(self) -> R {
        self.recognizer
    }

    fn scan_token(&mut self) -> Option<Token> {
        // The lexer is temporarily taken out of `self` so it can be driven
        // through `lexer.scan_token(self)` without `self` aliasing
        // `self.lexer` — see DESIGN.md's note on lexer/parser ownership.
        let mut lexer = std::mem::replace(&mut self.lexer, Lexer::new(""));
        let tok = lexer.scan_token(self);
        self.lexer = lexer;
        tok
    }

    fn next_tok(&mut self) -> Option<Token> {
        if let Some(t) = self.pushback.pop() {
            return Some(t);
        }
        self.scan_token()
    }

    fn peek_tok(&mut self) -> Option<Token> {
        let t = self.next_tok()?;
        self.pushback.push(t.clone());
        Some(t)
    }

    fn push_back(&mut self, t: Token) {
        self.pushback.push(t);
    }

    fn stop_matches(&self, tok: &str) -> bool {
        match self.stop_stack.last() {
            Some(Some(re)) => re.is_match(tok),
            _ => false,
        }
    }

    /// `expect(TOKEN)` consumes the next token if it equals `expected`,
    /// returning it unchanged. Otherwise it pushes the unexpected token
    /// back (so parsing can continue from it) and returns a synthetic
    /// `?!ERR?!` annotation token in its place.
    fn expect(&mut self, expected: &str) -> Token {
        match self.next_tok() {
            Some(t) if t == expected => t,
            Some(t) => {
                let msg = format!("?!ERR?! expected '{}' but found '{}'\n", expected, t);
                self.push_back(t);
                msg
            }
            None => format!("?!ERR?! expected '{}' but found end of input\n", expected),
        }
    }

    /// Run the grammar to end-of-input with no stop condition.
    pub fn parse_all(&mut self) -> Vec<Token> {
        self.stop_stack.push(None);
        let stream = self.parse_body();
        self.stop_stack.pop();
        stream
    }

    /// Parse until `peek()` matches `stop_pattern` (the stop token itself
    /// is left unconsumed) or input is exhausted.
    fn parse(&mut self, stop_pattern: &str) -> Vec<Token> {
        let re = Regex::new(stop_pattern).expect("valid stop-pattern regex");
        self.stop_stack.push(Some(re));
        let stream = self.parse_body();
        self.stop_stack.pop();
        stream
    }

    fn parse_body(&mut self) -> Vec<Token> {
        let mut stream = Vec::new();
        loop {
            match self.peek_tok() {
                None => break,
                Some(t) if self.stop_matches(&t) => break,
                Some(_) => {}
            }
            let cmd = self.parse_cmd();
            if cmd.is_empty() {
                break;
            }
            let cmd = self.recognizer.recognize(cmd);
            self.accumulator.accumulate(&mut stream, cmd);
        }
        stream
    }

    /// Parse exactly one command, including any trailing terminator.
    fn parse_cmd(&mut self) -> Vec<Token> {
        let first = match self.peek_tok() {
            None => return Vec::new(),
            Some(t) => t,
        };

        if first == "\n" {
            self.next_tok();
            return vec!["\n".to_string()];
        }

        if first == "!" {
            self.next_tok();
            let mut cmd = vec!["!".to_string()];
            cmd.extend(self.parse_cmd());
            return cmd;
        }

        let mut cmd = Vec::new();
        match first.as_str() {
            "{" => {
                self.next_tok();
                cmd.push("{".to_string());
                cmd.extend(self.parse(r"^\}$"));
                cmd.push(self.expect("}"));
            }
            "(" => {
                self.next_tok();
                cmd.push("(".to_string());
                cmd.extend(self.parse(r"^\)$"));
                cmd.push(self.expect(")"));
            }
            "case" => self.parse_case(&mut cmd),
            "for" => self.parse_for(&mut cmd),
            "if" => self.parse_if(&mut cmd),
            "until" | "while" => self.parse_loop_cmd(&mut cmd),
            _ => {
                if let Some(completed) = self.parse_simple_or_def(&mut cmd) {
                    return completed;
                }
            }
        }

        self.consume_tail(&mut cmd);
        cmd
    }

    /// Simple command, function definition, or Bash array assignment —
    /// distinguished by whether the first token is immediately followed
    /// by `(` and whether that first token ends in `=`. A function
    /// definition's body is itself a full `parse_cmd`, which already
    /// consumes its own trailing terminator; returning it here (rather
    /// than falling through to the caller's `consume_tail`) avoids
    /// swallowing whatever command follows the function definition.
    fn parse_simple_or_def(&mut self, cmd: &mut Vec<Token>) -> Option<Vec<Token>> {
        let head = self.next_tok().expect("caller already peeked a token");
        if self.peek_tok().as_deref() != Some("(") {
            cmd.push(head);
            return None;
        }
        if head.ends_with('=') {
            self.next_tok(); // consume "("
            let mut inner = Vec::new();
            loop {
                match self.next_tok() {
                    None => break,
                    Some(t) if t == ")" => break,
                    Some(t) => inner.push(t),
                }
            }
            cmd.push(format!("{}({})", head, inner.join(" ")));
            None
        } else {
            cmd.push(head);
            cmd.push(self.expect("("));
            cmd.push(self.expect(")"));
            while self.peek_tok().as_deref() == Some("\n") {
                cmd.push(self.next_tok().unwrap());
            }
            cmd.extend(self.parse_cmd());
            Some(std::mem::take(cmd))
        }
    }

    /// Consume tokens up to and including the command's terminator (one
    /// of `;`, `&`, `\n`, `|`, `&&`, `||`), stopping early without
    /// consuming if the current stop-pattern matches first (e.g. a
    /// trailing `)` closing an enclosing subshell).
    fn consume_tail(&mut self, cmd: &mut Vec<Token>) {
        loop {
            match self.peek_tok() {
                None => break,
                Some(t) => {
                    if self.stop_matches(&t) {
                        break;
                    }
                    self.next_tok();
                    let is_term = is_terminator(&t);
                    cmd.push(t);
                    if is_term {
                        break;
                    }
                }
            }
        }
    }

    fn parse_case(&mut self, cmd: &mut Vec<Token>) {
        cmd.push(self.next_tok().unwrap()); // "case"
        loop {
            match self.peek_tok() {
                None => break,
                Some(t) if t == "in" => break,
                Some(_) => cmd.push(self.next_tok().unwrap()),
            }
        }
        cmd.push(self.expect("in"));
        while self.peek_tok().as_deref() == Some("\n") {
            cmd.push(self.next_tok().unwrap());
        }
        'cases: loop {
            match self.peek_tok() {
                None => break,
                Some(t) if t == "esac" => break,
                _ => {
                    if self.peek_tok().as_deref() == Some("(") {
                        cmd.push(self.next_tok().unwrap());
                    }
                    loop {
                        match self.peek_tok() {
                            None => break 'cases,
                            Some(t) if t == ")" => {
                                cmd.push(self.next_tok().unwrap());
                                break;
                            }
                            Some(_) => cmd.push(self.next_tok().unwrap()),
                        }
                    }
                    cmd.extend(self.parse(r"^(;;|esac)$"));
                    if self.peek_tok().as_deref() == Some(";;") {
                        cmd.push(self.next_tok().unwrap());
                    }
                    while self.peek_tok().as_deref() == Some("\n") {
                        cmd.push(self.next_tok().unwrap());
                    }
                }
            }
        }
        cmd.push(self.expect("esac"));
    }

    fn parse_for(&mut self, cmd: &mut Vec<Token>) {
        cmd.push(self.next_tok().unwrap()); // "for"
        if let Some(var) = self.next_tok() {
            cmd.push(var);
        }
        if self.peek_tok().as_deref() == Some("in") {
            cmd.push(self.next_tok().unwrap());
            loop {
                match self.peek_tok() {
                    Some(t) if t == ";" || t == "\n" || t == "do" => break,
                    Some(_) => cmd.push(self.next_tok().unwrap()),
                    None => return,
                }
            }
        }
        if matches!(self.peek_tok().as_deref(), Some(";") | Some("\n")) {
            cmd.push(self.next_tok().unwrap());
        }
        while self.peek_tok().as_deref() == Some("\n") {
            cmd.push(self.next_tok().unwrap());
        }
        cmd.push(self.expect("do"));
        cmd.extend(self.parse(r"^done$"));
        cmd.push(self.expect("done"));
    }

    fn parse_if(&mut self, cmd: &mut Vec<Token>) {
        cmd.push(self.next_tok().unwrap()); // "if"
        cmd.extend(self.parse(r"^then$"));
        cmd.push(self.expect("then"));
        cmd.extend(self.parse(r"^(elif|else|fi)$"));
        loop {
            match self.peek_tok() {
                Some(t) if t == "elif" => {
                    cmd.push(self.next_tok().unwrap());
                    cmd.extend(self.parse(r"^then$"));
                    cmd.push(self.expect("then"));
                    cmd.extend(self.parse(r"^(elif|else|fi)$"));
                }
                Some(t) if t == "else" => {
                    cmd.push(self.next_tok().unwrap());
                    cmd.extend(self.parse(r"^fi$"));
                    break;
                }
                _ => break,
            }
        }
        cmd.push(self.expect("fi"));
    }

    fn parse_loop_cmd(&mut self, cmd: &mut Vec<Token>) {
        cmd.push(self.next_tok().unwrap()); // "until" | "while"
        cmd.extend(self.parse(r"^do$"));
        cmd.push(self.expect("do"));
        cmd.extend(self.parse(r"^done$"));
        cmd.push(self.expect("done"));
    }
}

impl<A: Accumulator, R: CommandRecognizer> SubstitutionResolver for Parser<A, R> {
    fn resolve_command_substitution(&mut self, lexer: &mut Lexer) -> String {
        // Swap the caller's (already-advanced-past-`$(`) lexer in as our
        // own for the duration of the recursive parse, so the shared
        // here-doc queue and pushback buffer stay correct across the
        // recursion. See DESIGN.md for why this avoids a lexer<->parser
        // ownership cycle.
        let callers_lexer = std::mem::replace(lexer, Lexer::new(""));
        let outer_lexer = std::mem::replace(&mut self.lexer, callers_lexer);
        let tokens = self.parse(r"^\)$");
        self.next_tok(); // consume the closing ")"
        let advanced = std::mem::replace(&mut self.lexer, outer_lexer);
        *lexer = advanced;
        format!("({})", tokens.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let mut p = ShellParser::new(src);
        p.parse_all()
    }

    #[test]
    fn simple_pipeline_is_flattened() {
        assert_eq!(tokens("foo | bar\n"), vec!["foo", "|", "bar", "\n"]);
    }

    #[test]
    fn subshell_recurses_and_closes() {
        assert_eq!(
            tokens("(foo && bar)\n"),
            vec!["(", "foo", "&&", "bar", ")", "\n"]
        );
    }

    #[test]
    fn brace_group_recurses_and_closes() {
        assert_eq!(
            tokens("{ foo; bar; }\n"),
            vec!["{", "foo", ";", "bar", ";", "}", "\n"]
        );
    }

    #[test]
    fn if_chain_is_recognized() {
        assert_eq!(
            tokens("if foo; then bar; fi\n"),
            vec!["if", "foo", ";", "then", "bar", ";", "fi", "\n"]
        );
    }

    #[test]
    fn while_loop_is_recognized() {
        assert_eq!(
            tokens("while foo; do bar; done\n"),
            vec!["while", "foo", ";", "do", "bar", ";", "done", "\n"]
        );
    }

    #[test]
    fn for_loop_with_wordlist() {
        assert_eq!(
            tokens("for x in a b; do echo $x; done\n"),
            vec!["for", "x", "in", "a", "b", ";", "do", "echo", "$x", ";", "done", "\n"]
        );
    }

    #[test]
    fn case_statement_is_recognized() {
        assert_eq!(
            tokens("case $x in a) foo ;; b) bar ;; esac\n"),
            vec![
                "case", "$x", "in", "a", ")", "foo", ";;", "b", ")", "bar", ";;", "esac", "\n"
            ]
        );
    }

    #[test]
    fn function_definition_is_recognized() {
        assert_eq!(
            tokens("foo() { bar; }\n"),
            vec!["foo", "(", ")", "{", "bar", ";", "}", "\n"]
        );
    }

    #[test]
    fn bash_array_assignment_is_joined_into_one_token() {
        assert_eq!(tokens("a=(1 2 3)\n"), vec!["a=(1 2 3)", "\n"]);
    }

    #[test]
    fn command_after_function_definition_is_not_swallowed() {
        assert_eq!(
            tokens("foo() { bar; }\necho next\n"),
            vec![
                "foo", "(", ")", "{", "bar", ";", "}", "\n", "echo", "next", "\n"
            ]
        );
    }

    #[test]
    fn missing_closing_brace_emits_err_annotation() {
        let toks = tokens("{ foo\n");
        assert!(toks.iter().any(|t| t.starts_with("?!ERR?!")));
    }

    #[test]
    fn command_substitution_renders_as_single_token() {
        assert_eq!(
            tokens("x=$(foo && bar) && baz\n"),
            vec!["x=(foo && bar)", "&&", "baz", "\n"]
        );
    }

    #[test]
    fn heredoc_defers_past_newline_regardless_of_chain() {
        assert_eq!(
            tokens("cat <<EOF && echo ok\nhello\nEOF\necho done\n"),
            vec!["cat", "<<EOF", "&&", "echo", "ok", "\n", "echo", "done", "\n"]
        );
    }
}
