//! Chain-annotation scenarios against the full file-reading/test-discovery
//! pipeline (as opposed to the in-module parser tests, which exercise the
//! grammar directly).

use chainlint::jobs::lint_source;

fn script(body: &str) -> String {
    format!("test_expect_success 'case' '{body}'\n")
}

#[test]
fn broken_chain_is_flagged_between_commands() {
    let (_count, reports) = lint_source(&script("foo && bar\nbaz && qux\n"), false);
    assert_eq!(reports.len(), 1);
    assert!(reports[0].body.contains("bar ?!AMP?!") || reports[0].body.contains("?!AMP?!"));
    assert!(reports[0].body.contains("baz && qux"));
}

#[test]
fn clean_chain_is_never_flagged() {
    let (_count, reports) = lint_source(&script("foo && bar && baz\n"), false);
    assert!(reports.is_empty());
}

#[test]
fn pipe_alone_satisfies_the_chain_rule() {
    let (_count, reports) = lint_source(&script("foo | bar\nbaz\n"), false);
    assert!(reports.is_empty());
}

#[test]
fn heredoc_body_is_skipped_and_the_chain_check_resumes_after_it() {
    // "cat <<EOF && echo ok" and "echo done" are two separate top-level
    // commands (the heredoc body is consumed invisibly by the lexer, not
    // part of either); "echo ok" ends its line bare, so the chain check
    // correctly flags "echo done" as unchained. The heredoc body text
    // itself must never leak into the token stream.
    let (_count, reports) = lint_source(
        &script("cat <<EOF && echo ok\nhello\nEOF\necho done\n"),
        false,
    );
    assert_eq!(reports.len(), 1);
    assert!(!reports[0].body.contains("hello"));
    assert!(reports[0].body.contains("?!AMP?!"));
}

#[test]
fn command_substitution_does_not_break_the_chain() {
    let (_count, reports) = lint_source(&script("x=$(foo && bar) && baz\n"), false);
    assert!(reports.is_empty());
}

#[test]
fn test_body_recognition_produces_titled_report() {
    let src = "test_expect_success 'title' '\nfoo\nbar\n'\n";
    let (count, reports) = lint_source(src, false);
    assert_eq!(count, 1);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].title, "title");
    assert!(reports[0].body.contains("?!AMP?!"));
}

#[test]
fn prereq_form_of_test_expect_failure_is_recognized() {
    let src = "test_expect_failure PREREQ 'needs prereq' 'foo\nbar\n'\n";
    let (count, reports) = lint_source(src, false);
    assert_eq!(count, 1);
    assert_eq!(reports[0].title, "needs prereq");
}

#[test]
fn indented_heredoc_terminator_is_recognized() {
    let (_count, reports) = lint_source(
        &script("cat <<-EOF && echo ok\n\thello\n\tEOF\necho done\n"),
        false,
    );
    assert_eq!(reports.len(), 1);
    assert!(!reports[0].body.contains("hello"));
}

#[test]
fn nested_command_substitution_recurses_correctly() {
    let (_count, reports) =
        lint_source(&script("x=$(echo $(echo inner) && echo mid) && echo outer\n"), false);
    assert!(reports.is_empty());
}

#[test]
fn multiple_tests_in_one_script_are_each_checked_independently() {
    let src = "test_expect_success 'a' 'foo && bar\n'\ntest_expect_success 'b' 'foo\nbar\n'\n";
    let (count, reports) = lint_source(src, false);
    assert_eq!(count, 2);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].title, "b");
}

#[test]
fn emit_all_reports_every_test_including_clean_ones() {
    let src = "test_expect_success 'a' 'foo && bar\n'\n";
    let (_count, reports) = lint_source(src, true);
    assert_eq!(reports.len(), 1);
    assert!(!reports[0].body.contains("?!AMP?!"));
}
