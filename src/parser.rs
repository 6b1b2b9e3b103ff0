use crate::tokens::{Token, TokenSequence};

/// States for the tokenizer state machine.
enum State {
    /// Between tokens: whitespace is skipped
    Normal,
    /// Building an unquoted word: whitespace ends it
    InWord,
    /// Inside double quotes: whitespace is preserved
    InDoubleQuote,
    /// Inside single quotes: everything is literal
    InSingleQuote,
}

/// Split a command line into words, resolving quotes and backslash escapes.
///
/// Operators such as `|` and `>` are only recognised later, and only when
/// they stand alone as a whole, unquoted word. Any quote or backslash in a
/// word marks the finished token as quoted.
pub fn tokenize(input: &str) -> TokenSequence {
    let mut words: Vec<Token> = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut state = State::Normal;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match (&state, ch) {
            // ── Normal state: between tokens ──
            (State::Normal, ' ' | '\t' | '\n') => {}
            (State::Normal, '"') => {
                quoted = true;
                state = State::InDoubleQuote;
            }
            (State::Normal, '\'') => {
                quoted = true;
                state = State::InSingleQuote;
            }
            (State::Normal, '\\') => {
                quoted = true;
                current.push(chars.next().unwrap_or('\\'));
                state = State::InWord;
            }
            (State::Normal, c) => {
                current.push(c);
                state = State::InWord;
            }

            // ── InWord state: building a token ──
            (State::InWord, ' ' | '\t' | '\n') => {
                words.push(Token::new(std::mem::take(&mut current), quoted));
                quoted = false;
                state = State::Normal;
            }
            (State::InWord, '"') => {
                quoted = true;
                state = State::InDoubleQuote;
            }
            (State::InWord, '\'') => {
                quoted = true;
                state = State::InSingleQuote;
            }
            (State::InWord, '\\') => {
                quoted = true;
                current.push(chars.next().unwrap_or('\\'));
            }
            (State::InWord, c) => current.push(c),

            // ── InDoubleQuote state: inside "..." ──
            // Closing a quote always leaves a word behind, so `""` is a valid empty arg.
            (State::InDoubleQuote, '"') => state = State::InWord,
            (State::InDoubleQuote, '\\') => match chars.peek() {
                Some(&next @ ('"' | '\\' | '$' | '`')) => {
                    current.push(next);
                    chars.next();
                }
                _ => current.push('\\'),
            },
            (State::InDoubleQuote, c) => current.push(c),

            // ── InSingleQuote state: inside '...' ──
            (State::InSingleQuote, '\'') => state = State::InWord,
            (State::InSingleQuote, c) => current.push(c),
        }
    }

    match state {
        State::Normal => {}
        // Unclosed quotes keep whatever text they collected.
        State::InWord | State::InDoubleQuote | State::InSingleQuote => {
            if !current.is_empty() || matches!(state, State::InWord) {
                words.push(Token::new(current, quoted));
            }
        }
    }

    TokenSequence::new(words)
}
