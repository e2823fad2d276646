use std::sync::LazyLock;

use regex::Regex;

/// The classification of a single physical line of a shell file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// An empty or whitespace-only line
    Blank,
    /// A line holding only a comment
    Comment { text: String },
    /// An `alias name=value` definition
    Alias {
        name: String,
        value: String,
        inline_comment: Option<String>,
    },
    /// An `export NAME=value` definition
    Export {
        name: String,
        value: String,
        inline_comment: Option<String>,
    },
    /// The `name() {` head of a function definition; `rest` holds whatever follows the parentheses
    FunctionStart { name: String, rest: String },
    /// Anything else
    Other,
}

/// Classifies a single line of text.
///
/// Keywords (`alias`, `export`, `function`/`func`) always match case-insensitively; the configured case sensitivity
/// only governs user-supplied regexes.
pub fn classify_line(line: &str) -> LineClass {
    /// A line holding only a comment
    static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[ \t]*#[ \t]?(?<text>.*)$").unwrap());
    /// An alias definition; the name excludes `=`, whitespace, `\`, `$` and backticks
    static ALIAS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)^[ \t]*alias[ \t]+(?<name>[^=\s\\$`]+)=(?<rest>.*)$").unwrap());
    /// An export definition; the name additionally excludes quotes
    static EXPORT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"(?i)^[ \t]*export[ \t]+(?<name>[^=\s"'\\$`]+)=(?<rest>.*)$"#).unwrap());
    /// A function head, with an optional `function`/`func` keyword
    static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)^[ \t]*(?:func(?:tion)?[ \t]+)?(?<name>[\w-]+)[ \t]*\([^)]*\)[ \t]*(?<rest>.*)$").unwrap()
    });

    if line.trim().is_empty() {
        return LineClass::Blank;
    }
    if let Some(caps) = COMMENT_RE.captures(line) {
        return LineClass::Comment {
            text: caps["text"].trim_end().to_string(),
        };
    }
    if let Some(caps) = ALIAS_RE.captures(line) {
        if let Some((value, inline_comment)) = split_value_and_comment(&caps["rest"]) {
            return LineClass::Alias {
                name: caps["name"].to_string(),
                value,
                inline_comment,
            };
        }
        return LineClass::Other;
    }
    if let Some(caps) = EXPORT_RE.captures(line) {
        if let Some((value, inline_comment)) = split_value_and_comment(&caps["rest"]) {
            return LineClass::Export {
                name: caps["name"].to_string(),
                value,
                inline_comment,
            };
        }
        return LineClass::Other;
    }
    if let Some(caps) = FUNCTION_RE.captures(line) {
        let rest = caps["rest"].trim().to_string();
        // Subshell-bodied functions `name() (...)` are not recognized
        if !rest.starts_with('(') {
            return LineClass::FunctionStart {
                name: caps["name"].to_string(),
                rest,
            };
        }
    }
    LineClass::Other
}

/// Splits the right-hand side of an alias/export into the value and an optional trailing comment.
///
/// The value may be single-quoted, double-quoted or bare (ending at the first whitespace). Returns `None` when no
/// value is present, in which case the line is not a valid definition.
fn split_value_and_comment(rest: &str) -> Option<(String, Option<String>)> {
    let rest = rest.trim_start();
    let (value, remainder) = match rest.chars().next()? {
        quote @ ('\'' | '"') => {
            let inner = &rest[1..];
            let end = inner.find(quote)?;
            if end == 0 {
                return None;
            }
            (&inner[..end], &inner[end + 1..])
        }
        _ => {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            (&rest[..end], &rest[end..])
        }
    };
    if value.is_empty() {
        return None;
    }

    let remainder = remainder.trim();
    let inline_comment = remainder
        .strip_prefix('#')
        .map(|comment| comment.trim().to_string())
        .filter(|comment| !comment.is_empty());

    Some((value.to_string(), inline_comment))
}

/// Tracks brace depth across the lines of a function body.
///
/// Braces inside single-quoted or double-quoted strings, escaped characters and anything after an unquoted `#` are
/// never counted. Quote state persists across lines, so multi-line strings are handled too.
#[derive(Debug, Default)]
pub struct BraceScanner {
    depth: u32,
    in_single: bool,
    in_double: bool,
}

impl BraceScanner {
    /// Starts a scanner with the opening brace already consumed
    pub fn open() -> Self {
        Self {
            depth: 1,
            ..Default::default()
        }
    }

    /// Feeds a line (or fragment) to the scanner.
    ///
    /// Returns the byte index of the brace closing the outermost scope, when this line reaches it.
    pub fn feed(&mut self, line: &str) -> Option<usize> {
        let mut prev: Option<char> = None;
        let mut chars = line.char_indices();
        while let Some((i, c)) = chars.next() {
            if self.in_single {
                if c == '\'' {
                    self.in_single = false;
                }
                prev = Some(c);
                continue;
            }
            if self.in_double {
                match c {
                    '"' => self.in_double = false,
                    '\\' => {
                        chars.next();
                    }
                    _ => {}
                }
                prev = Some(c);
                continue;
            }
            match c {
                '\\' => {
                    chars.next();
                }
                '\'' => self.in_single = true,
                '"' => self.in_double = true,
                // A comment runs to the end of the line, nothing after it counts
                '#' if prev.is_none_or(char::is_whitespace) => return None,
                '{' => self.depth += 1,
                '}' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
            prev = Some(c);
        }
        None
    }
}
