use crate::tokens::Token;

/// What a standard stream should be connected to instead of its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Read from file
    FileRead(String),
    /// Write to file (truncate)
    File(String),
    /// Write to file (append)
    FileAppend(String),
    /// Share whatever another stream is currently connected to (e.g. `2>&1`)
    Fd(i32),
}

/// A single I/O redirection instruction for stream `fd` (0, 1 or 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub fd: i32,
    pub target: RedirectTarget,
}

/// Operators that take a filename, longest first so `>>` wins over `>`.
const FILE_OPERATORS: &[(&str, i32, fn(String) -> RedirectTarget)] = &[
    ("2>>", 2, RedirectTarget::FileAppend),
    ("1>>", 1, RedirectTarget::FileAppend),
    (">>", 1, RedirectTarget::FileAppend),
    ("2>", 2, RedirectTarget::File),
    ("1>", 1, RedirectTarget::File),
    (">", 1, RedirectTarget::File),
    ("<", 0, RedirectTarget::FileRead),
];

/// Separate redirect operators from regular arguments.
///
/// Returns `(args, redirections)` with redirections in source order, or a
/// message for syntax errors. Handles `<`, `>`, `>>`, `1>`, `1>>`, `2>`,
/// `2>>`, `2>&1`, `1>&2`, `>&2`. Operators must be whole unquoted words; only
/// the fd-prefixed forms take an attached filename (`2>err.txt`).
pub fn extract_redirections(
    tokens: &[Token],
) -> Result<(Vec<String>, Vec<Redirection>), String> {
    let mut args = Vec::new();
    let mut redirections = Vec::new();
    let mut iter = tokens.iter();

    while let Some(token) = iter.next() {
        if token.is_quoted() {
            args.push(token.text().to_string());
            continue;
        }

        let word = token.text();
        match word {
            "2>&1" => redirections.push(Redirection {
                fd: 2,
                target: RedirectTarget::Fd(1),
            }),
            "1>&2" | ">&2" => redirections.push(Redirection {
                fd: 1,
                target: RedirectTarget::Fd(2),
            }),
            _ => {
                if let Some((operator, fd, make)) =
                    FILE_OPERATORS.iter().find(|(op, _, _)| *op == word)
                {
                    let path = iter.next().map(|t| t.text().to_string()).ok_or_else(|| {
                        format!("syntax error: expected filename after '{operator}'")
                    })?;
                    redirections.push(Redirection {
                        fd: *fd,
                        target: make(path),
                    });
                } else if let Some((path, fd, make)) = attached(word) {
                    redirections.push(Redirection {
                        fd,
                        target: make(path),
                    });
                } else {
                    args.push(word.to_string());
                }
            }
        }
    }

    Ok((args, redirections))
}

/// `1>file`, `2>>file` and friends: an fd-prefixed operator with the
/// filename in the same word.
fn attached(word: &str) -> Option<(String, i32, fn(String) -> RedirectTarget)> {
    FILE_OPERATORS
        .iter()
        .filter(|(op, _, _)| op.starts_with(['1', '2']))
        .find_map(|(op, fd, make)| {
            word.strip_prefix(op)
                .filter(|rest| !rest.is_empty())
                .map(|rest| (rest.to_string(), *fd, *make))
        })
}
