use crate::error::ScanError;

/// On-demand token scanner over a raw command string.
///
/// Nothing is pre-tokenized: each call consumes exactly one segment under
/// the reading mode the caller asks for and advances the cursor. The scanner
/// is `Copy`, so callers can probe a token and discard the advanced copy if
/// the probe does not match.
#[derive(Clone, Copy, Debug)]
pub struct TokenScanner<'a> {
    input: &'a str,
    cursor: usize,
}

impl<'a> TokenScanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, cursor: 0 }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Everything after the cursor, untrimmed.
    pub fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    /// True when only whitespace (or nothing) remains.
    pub fn at_end(&self) -> bool {
        self.remaining().chars().all(char::is_whitespace)
    }

    fn skip_whitespace(&mut self) {
        let rest = self.remaining();
        let skipped = rest.len() - rest.trim_start().len();
        self.cursor += skipped;
    }

    /// One whitespace-delimited word. A double-quoted run is a single token
    /// with the quotes stripped, so embedded whitespace survives.
    pub fn read_word(&mut self) -> Result<&'a str, ScanError> {
        self.skip_whitespace();
        let rest = self.remaining();
        if rest.is_empty() {
            return Err(ScanError::UnexpectedEnd);
        }

        if let Some(body) = rest.strip_prefix('"') {
            return match body.find('"') {
                Some(end) => {
                    self.cursor += 1 + end + 1;
                    Ok(&body[..end])
                }
                None => Err(ScanError::TypeMismatch {
                    expected: "closing `\"`",
                    found: body.to_string(),
                }),
            };
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.cursor += end;
        Ok(&rest[..end])
    }

    /// A word parsed as a signed base-10 integer.
    pub fn read_integer(&mut self) -> Result<i64, ScanError> {
        let word = self.read_word()?;
        word.parse().map_err(|_| ScanError::TypeMismatch {
            expected: "integer",
            found: word.to_string(),
        })
    }

    /// The entire remainder of the input, verbatim, including embedded
    /// whitespace. Leading separator whitespace is skipped.
    pub fn read_rest(&mut self) -> Result<&'a str, ScanError> {
        self.skip_whitespace();
        let rest = self.remaining();
        if rest.is_empty() {
            return Err(ScanError::UnexpectedEnd);
        }
        self.cursor = self.input.len();
        Ok(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_whitespace_delimited() {
        let mut s = TokenScanner::new("issue  myrepo 42");
        assert_eq!(s.read_word().unwrap(), "issue");
        assert_eq!(s.read_word().unwrap(), "myrepo");
        assert_eq!(s.read_word().unwrap(), "42");
        assert!(s.at_end());
        assert_eq!(s.read_word(), Err(ScanError::UnexpectedEnd));
    }

    #[test]
    fn quoted_word_keeps_embedded_whitespace() {
        let mut s = TokenScanner::new(r#""my repo" 7"#);
        assert_eq!(s.read_word().unwrap(), "my repo");
        assert_eq!(s.read_integer().unwrap(), 7);
    }

    #[test]
    fn unterminated_quote_is_a_mismatch() {
        let mut s = TokenScanner::new(r#""never closed"#);
        assert!(matches!(
            s.read_word(),
            Err(ScanError::TypeMismatch { expected, .. }) if expected.contains('"')
        ));
    }

    #[test]
    fn integer_accepts_sign_and_rejects_text() {
        let mut s = TokenScanner::new("-13 nope");
        assert_eq!(s.read_integer().unwrap(), -13);
        assert_eq!(
            s.read_integer(),
            Err(ScanError::TypeMismatch {
                expected: "integer",
                found: "nope".to_string(),
            })
        );
    }

    #[test]
    fn rest_is_verbatim_to_end_of_input() {
        let mut s = TokenScanner::new("create myrepo Bug title - Steps to reproduce");
        s.read_word().unwrap();
        s.read_word().unwrap();
        assert_eq!(s.read_rest().unwrap(), "Bug title - Steps to reproduce");
        assert!(s.at_end());
        assert_eq!(s.read_rest(), Err(ScanError::UnexpectedEnd));
    }

    #[test]
    fn probing_copy_does_not_advance_the_original() {
        let s = TokenScanner::new("create rest");
        let mut probe = s;
        assert_eq!(probe.read_word().unwrap(), "create");
        assert_eq!(s.cursor(), 0);
    }
}
