//! Splitting of a command line into a command name and its arguments.
//!
//! The scanner is deliberately permissive: it never fails. A quote that is not
//! closed on the same line is read as an ordinary character of a bare word.

/// State of the argument scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingQuote(char),
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    /// Runs the scanner over the whole input and returns the arguments in order.
    fn make_args(&mut self) -> Vec<String> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingQuote(quote) => self.handle_quote(ch, quote, &mut out),
            }
        }

        if self.state != LexingState::Start {
            out.push(std::mem::take(&mut self.buffer));
        }

        out
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    /// True when `quote` appears again somewhere after the current position.
    fn has_closing(&self, quote: char) -> bool {
        self.input[self.pos..].contains(&quote)
    }

    fn handle_start(&mut self, ch: char) {
        match ch {
            c if c.is_whitespace() => {}
            '"' | '\'' if self.has_closing(ch) => self.state = LexingState::ReadingQuote(ch),
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) {
        if ch.is_whitespace() {
            out.push(std::mem::take(&mut self.buffer));
            self.state = LexingState::Start;
        } else {
            self.buffer.push(ch);
        }
    }

    fn handle_quote(&mut self, ch: char, quote: char, out: &mut Vec<String>) {
        if ch == quote {
            out.push(std::mem::take(&mut self.buffer));
            self.state = LexingState::Start;
        } else {
            self.buffer.push(ch);
        }
    }
}

/// Splits the argument part of a command line into individual arguments.
///
/// A span enclosed in double or single quotes becomes one argument with the quotes
/// removed; any other run of non-whitespace characters is one argument. Text right
/// after a closing quote starts a new argument.
pub fn split_into_args(line: &str) -> Vec<String> {
    let args = LexingFSM::new(line).make_args();
    log::trace!("tokenized {:?} into {:?}", line, args);
    args
}

/// Splits a statement into its leading command token and the raw remainder.
///
/// Returns `None` for a blank statement.
pub fn split_command(statement: &str) -> Option<(&str, &str)> {
    let trimmed = statement.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.find(char::is_whitespace) {
        Some(end) => Some((&trimmed[..end], &trimmed[end..])),
        None => Some((trimmed, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words() {
        assert_eq!(split_into_args("  a bb\tccc "), vec!["a", "bb", "ccc"]);
    }

    #[test]
    fn test_empty_remainder() {
        assert!(split_into_args("").is_empty());
        assert!(split_into_args("   ").is_empty());
    }

    #[test]
    fn test_double_quoted_span_is_one_arg() {
        assert_eq!(split_into_args(r#""a b" c"#), vec!["a b", "c"]);
    }

    #[test]
    fn test_single_quoted_span_is_one_arg() {
        assert_eq!(split_into_args("'x  y' z"), vec!["x  y", "z"]);
    }

    #[test]
    fn test_empty_quotes_give_empty_arg() {
        assert_eq!(split_into_args(r#"a "" b"#), vec!["a", "", "b"]);
    }

    #[test]
    fn test_unterminated_quote_degrades_to_word() {
        assert_eq!(split_into_args("'unterminated"), vec!["'unterminated"]);
        assert_eq!(split_into_args(r#""open and more"#), vec![r#""open"#, "and", "more"]);
    }

    #[test]
    fn test_other_quote_kind_inside_span_is_literal() {
        assert_eq!(split_into_args(r#""it's here" x"#), vec!["it's here", "x"]);
    }

    #[test]
    fn test_quote_inside_word_is_literal() {
        assert_eq!(split_into_args(r#"ab"c d"#), vec![r#"ab"c"#, "d"]);
    }

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("  echo a b"), Some(("echo", " a b")));
        assert_eq!(split_command("help"), Some(("help", "")));
        assert_eq!(split_command("  "), None);
    }
}
