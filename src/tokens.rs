use std::ops::Range;

/// The token that separates two pipeline stages.
pub const PIPE: &str = "|";

/// A requested sub-range does not fit inside the sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("token range {start}..{end} out of bounds for sequence of length {len}")]
pub struct RangeError {
    pub start: usize,
    pub end: usize,
    pub len: usize,
}

/// One word of a command line.
///
/// A word that was quoted or escaped anywhere is literal text: it never acts
/// as a pipe or redirection operator, even if it reads like one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    text: String,
    quoted: bool,
}

impl Token {
    pub fn new(text: impl Into<String>, quoted: bool) -> Self {
        Self {
            text: text.into(),
            quoted,
        }
    }

    /// A bare word, eligible to be an operator.
    pub fn word(text: impl Into<String>) -> Self {
        Self::new(text, false)
    }

    /// A word that had quoting or escapes in it.
    pub fn quoted(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// True when this is the unquoted operator `op`.
    pub fn is_operator(&self, op: &str) -> bool {
        !self.quoted && self.text == op
    }
}

/// An ordered list of owned words making up one command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSequence(Vec<Token>);

impl TokenSequence {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.0
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(Token::text)
    }

    /// The text of every token, quoting dropped.
    pub fn words(&self) -> Vec<String> {
        self.0.iter().map(|t| t.text.clone()).collect()
    }

    /// Number of unquoted tokens exactly equal to `delimiter`.
    pub fn count_occurrences(&self, delimiter: &str) -> usize {
        self.0.iter().filter(|t| t.is_operator(delimiter)).count()
    }

    /// Indices of every unquoted token equal to `delimiter`, ascending.
    pub fn positions(&self, delimiter: &str) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_operator(delimiter))
            .map(|(i, _)| i)
            .collect()
    }

    /// Copy out the half-open range `start..end` as a new sequence.
    pub fn slice(&self, start: usize, end: usize) -> Result<TokenSequence, RangeError> {
        if start > end || end > self.0.len() {
            return Err(RangeError {
                start,
                end,
                len: self.0.len(),
            });
        }
        Ok(Self(self.0[start..end].to_vec()))
    }

    /// Bounds of stage `index` when the sequence is split on `delimiter`.
    ///
    /// Boundaries are recomputed from the delimiter positions on every call,
    /// so the result for a given stage never depends on which other stages
    /// were extracted before it.
    pub fn stage_range(&self, index: usize, delimiter: &str) -> Result<Range<usize>, RangeError> {
        let positions = self.positions(delimiter);
        if index > positions.len() {
            return Err(RangeError {
                start: index,
                end: index,
                len: positions.len() + 1,
            });
        }

        let start = match index {
            0 => 0,
            i => positions[i - 1] + 1,
        };
        let end = positions.get(index).copied().unwrap_or(self.0.len());
        Ok(start..end)
    }

    /// The tokens of stage `index`, delimiter tokens excluded.
    pub fn stage(&self, index: usize, delimiter: &str) -> Result<TokenSequence, RangeError> {
        let range = self.stage_range(index, delimiter)?;
        self.slice(range.start, range.end)
    }
}

impl From<Vec<Token>> for TokenSequence {
    fn from(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }
}

/// Plain strings become bare words.
impl FromIterator<String> for TokenSequence {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().map(Token::word).collect())
    }
}

impl FromIterator<Token> for TokenSequence {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TokenSequence {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
