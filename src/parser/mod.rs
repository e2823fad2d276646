use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use crate::model::{CommandKind, RawConstruct};

mod line;

pub use line::{BraceScanner, LineClass, classify_line};

/// The result of parsing a single file
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// The constructs recognized on the file, in order of appearance
    pub constructs: Vec<RawConstruct>,
    /// Malformed constructs discarded while parsing
    pub skipped: u64,
}

/// The comment candidate accumulated while scanning, threaded explicitly through the line loop.
///
/// Consecutive comment lines join into a single block; a blank line pauses the block so a later comment starts a fresh
/// one, and any other-code line discards it.
#[derive(Debug, Default)]
struct CommentBlock {
    lines: Vec<String>,
    paused: bool,
}

impl CommentBlock {
    fn push(&mut self, text: String) {
        if self.paused {
            self.lines.clear();
            self.paused = false;
        }
        self.lines.push(text);
    }

    fn pause(&mut self) {
        if !self.lines.is_empty() {
            self.paused = true;
        }
    }

    fn take(&mut self) -> Option<String> {
        self.paused = false;
        if self.lines.is_empty() {
            None
        } else {
            Some(self.lines.drain(..).join("\n"))
        }
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.paused = false;
    }
}

/// A function definition being collected, until its brace balance returns to zero
#[derive(Debug)]
struct FunctionCollect {
    name: String,
    line_number: usize,
    comment_above: Option<String>,
    body_lines: Vec<String>,
    scanner: BraceScanner,
    opened: bool,
}

impl FunctionCollect {
    /// Feeds one more line (or fragment) of the body, returning whether it just closed
    fn feed(&mut self, line: &str) -> bool {
        match self.scanner.feed(line) {
            Some(close_idx) => {
                let fragment = line[..close_idx].trim_end();
                if !fragment.trim().is_empty() {
                    self.body_lines.push(fragment.to_string());
                }
                true
            }
            None => {
                self.body_lines.push(line.trim_end().to_string());
                false
            }
        }
    }
}

/// Parses the content of a single shell file into its recognized constructs.
///
/// Malformed input never fails the file: unterminated functions are discarded and counted, anything unrecognized is
/// skipped. Constructs whose name matches `name_ignore` are dropped.
pub fn parse_source(source_path: &str, content: &str, name_ignore: Option<&Regex>) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let mut comment = CommentBlock::default();
    let mut collecting: Option<FunctionCollect> = None;

    for (idx, line) in content.lines().enumerate() {
        let line_number = idx + 1;

        // While collecting a function body, lines are fed to the brace scanner instead of the classifier
        if let Some(mut func) = collecting.take() {
            if func.opened {
                if func.feed(line) {
                    push_function(&mut outcome, source_path, func, name_ignore);
                } else {
                    collecting = Some(func);
                }
                continue;
            }
            // The opening brace hasn't shown up yet: only blank lines may precede it
            let trimmed = line.trim_start();
            if trimmed.is_empty() {
                collecting = Some(func);
                continue;
            }
            if let Some(after_brace) = trimmed.strip_prefix('{') {
                func.opened = true;
                func.scanner = BraceScanner::open();
                if func.feed(after_brace) {
                    push_function(&mut outcome, source_path, func, name_ignore);
                } else {
                    collecting = Some(func);
                }
                continue;
            }
            // Anything else means this was not a function after all; classify the line normally
        }

        match classify_line(line) {
            LineClass::Blank => comment.pause(),
            LineClass::Comment { text } => {
                // A shebang is not a description candidate
                if line_number == 1 && text.starts_with('!') {
                    continue;
                }
                comment.push(text);
            }
            LineClass::Alias {
                name,
                value,
                inline_comment,
            } => {
                let comment_above = comment.take();
                push_construct(
                    &mut outcome,
                    RawConstruct {
                        kind: CommandKind::Alias,
                        name,
                        code: value,
                        source_path: source_path.to_string(),
                        line_number,
                        comment_above,
                        comment_inline: inline_comment,
                    },
                    name_ignore,
                );
            }
            LineClass::Export {
                name,
                value,
                inline_comment,
            } => {
                let comment_above = comment.take();
                push_construct(
                    &mut outcome,
                    RawConstruct {
                        kind: CommandKind::Export,
                        name,
                        code: value,
                        source_path: source_path.to_string(),
                        line_number,
                        comment_above,
                        comment_inline: inline_comment,
                    },
                    name_ignore,
                );
            }
            LineClass::FunctionStart { name, rest } => {
                // Only a brace (on this line or a later one) makes this a function; anything else after the
                // parentheses means the line is not a definition
                if !rest.is_empty() && !rest.starts_with('{') {
                    comment.clear();
                    continue;
                }
                let mut func = FunctionCollect {
                    name,
                    line_number,
                    comment_above: comment.take(),
                    body_lines: Vec::new(),
                    scanner: BraceScanner::default(),
                    opened: false,
                };
                if let Some(after_brace) = rest.strip_prefix('{') {
                    func.opened = true;
                    func.scanner = BraceScanner::open();
                    if func.feed(after_brace) {
                        push_function(&mut outcome, source_path, func, name_ignore);
                        continue;
                    }
                }
                collecting = Some(func);
            }
            LineClass::Other => comment.clear(),
        }
    }

    // An unterminated function at end of file is malformed input, discarded without failing the file
    if let Some(func) = collecting
        && func.opened
    {
        tracing::debug!("Discarding unterminated function '{}' in {source_path}", func.name);
        outcome.skipped += 1;
    }

    outcome
}

/// Finalizes a collected function into a construct
fn push_function(outcome: &mut ParseOutcome, source_path: &str, func: FunctionCollect, name_ignore: Option<&Regex>) {
    let comment_inline = function_body_comment(&func.body_lines);
    let code = trim_body(&func.body_lines);
    push_construct(
        outcome,
        RawConstruct {
            kind: CommandKind::Function,
            name: func.name,
            code,
            source_path: source_path.to_string(),
            line_number: func.line_number,
            comment_above: func.comment_above,
            comment_inline,
        },
        name_ignore,
    );
}

/// Appends a construct to the outcome, unless its name matches the ignore regex
fn push_construct(outcome: &mut ParseOutcome, construct: RawConstruct, name_ignore: Option<&Regex>) {
    if let Some(ignore) = name_ignore
        && ignore.is_match(&construct.name)
    {
        tracing::trace!(
            "Ignored {} '{}' in {}",
            construct.kind,
            construct.name,
            construct.source_path
        );
        return;
    }
    outcome.constructs.push(construct);
}

/// Extracts the inline comment of a function: the first non-blank line of its body, when it is a comment.
///
/// A structured `desc:`/`description:` prefix inside the comment is stripped.
fn function_body_comment(body_lines: &[String]) -> Option<String> {
    /// A structured description marker at the start of the comment
    static DESC_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^desc(?:ription)?\s*[-:=]\s*").unwrap());

    let first = body_lines.iter().find(|l| !l.trim().is_empty())?;
    match classify_line(first) {
        LineClass::Comment { text } => {
            let text = DESC_PREFIX_RE.replace(&text, "").trim().to_string();
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    }
}

/// Joins the collected body lines, dropping leading and trailing blank lines
fn trim_body(body_lines: &[String]) -> String {
    let start = body_lines.iter().position(|l| !l.trim().is_empty());
    let end = body_lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => body_lines[start..=end].join("\n"),
        _ => String::new(),
    }
}
