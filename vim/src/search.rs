//! Pattern search for `/`, `?`, `n`, `N`, `*` and `#`.
//!
//! Patterns use `regex` syntax with a few Vim atoms translated: `\<` and
//! `\>` become word boundaries, `\c`/`\C` force case (in)sensitivity.

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::error::{Error, Result};
use crate::motion::{CharClass, char_class};
use crate::options::Options;
use crate::traits::Buffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchDirection {
    #[default]
    Forward,
    Backward,
}

impl SearchDirection {
    pub fn reversed(self) -> Self {
        match self {
            SearchDirection::Forward => SearchDirection::Backward,
            SearchDirection::Backward => SearchDirection::Forward,
        }
    }
}

pub fn compile(pattern: &str, options: &Options) -> Result<Regex> {
    let mut translated = String::with_capacity(pattern.len());
    let mut case: Option<bool> = None;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            translated.push(c);
            continue;
        }
        match chars.next() {
            Some('<' | '>') => translated.push_str("\\b"),
            Some('c') => case = Some(true),
            Some('C') => case = Some(false),
            Some(other) => {
                translated.push('\\');
                translated.push(other);
            }
            None => translated.push_str("\\\\"),
        }
    }
    let ignore_case = case.unwrap_or_else(|| {
        options.ignorecase && !(options.smartcase && pattern.chars().any(char::is_uppercase))
    });
    RegexBuilder::new(&translated)
        .case_insensitive(ignore_case)
        .multi_line(true)
        .build()
        .map_err(|err| Error::InvalidPattern(err.to_string()))
}

fn char_to_byte(text: &str, offset: usize) -> usize {
    text.char_indices().nth(offset).map_or(text.len(), |(b, _)| b)
}

fn byte_to_char(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Offset of the `count`-th match of `pattern` from `caret`.
pub fn find(
    buf: &dyn Buffer,
    caret: usize,
    pattern: &str,
    direction: SearchDirection,
    count: usize,
    options: &Options,
) -> Result<usize> {
    let regex = compile(pattern, options)?;
    let text = buf.slice(0, buf.len_chars());
    let not_found = || Error::PatternNotFound(pattern.to_string());
    let mut current = char_to_byte(&text, caret);
    for _ in 0..count.max(1) {
        current = match direction {
            SearchDirection::Forward => {
                let from = text[current..]
                    .chars()
                    .next()
                    .map_or(text.len(), |c| current + c.len_utf8());
                regex
                    .find_at(&text, from)
                    .or_else(|| options.wrapscan.then(|| regex.find(&text)).flatten())
                    .map(|m| m.start())
                    .ok_or_else(not_found)?
            }
            SearchDirection::Backward => {
                let mut before = None;
                let mut last = None;
                for m in regex.find_iter(&text) {
                    if m.start() < current {
                        before = Some(m.start());
                    }
                    last = Some(m.start());
                }
                before
                    .or(if options.wrapscan { last } else { None })
                    .ok_or_else(not_found)?
            }
        };
    }
    let offset = byte_to_char(&text, current);
    debug!(pattern, from = caret, to = offset, "search");
    Ok(offset)
}

/// `\<word\>` for the keyword under or after the caret on its line.
pub fn word_pattern(buf: &dyn Buffer, caret: usize) -> Option<String> {
    let end = buf.line_end(buf.line_of(caret));
    let is_word = |offset: usize| {
        buf.char_at(offset)
            .is_some_and(|c| char_class(c, false) == CharClass::Word)
    };
    let mut start = caret;
    while start < end && !is_word(start) {
        start += 1;
    }
    if start >= end {
        return None;
    }
    while start > 0 && is_word(start - 1) {
        start -= 1;
    }
    let mut stop = start;
    while stop < end && is_word(stop) {
        stop += 1;
    }
    Some(format!("\\<{}\\>", regex::escape(&buf.slice(start, stop))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rope_buffer::RopeBuffer;

    #[test]
    fn forward_wraps_around() {
        let buf = RopeBuffer::new("foo bar\nfoo baz");
        let options = Options::default();
        assert_eq!(find(&buf, 0, "foo", SearchDirection::Forward, 1, &options), Ok(8));
        assert_eq!(find(&buf, 8, "foo", SearchDirection::Forward, 1, &options), Ok(0));
        assert_eq!(find(&buf, 0, "foo", SearchDirection::Forward, 2, &options), Ok(0));
    }

    #[test]
    fn nowrapscan_reports_missing_match() {
        let buf = RopeBuffer::new("foo bar\nfoo baz");
        let options = Options {
            wrapscan: false,
            ..Options::default()
        };
        assert_eq!(
            find(&buf, 8, "foo", SearchDirection::Forward, 1, &options),
            Err(Error::PatternNotFound("foo".into()))
        );
        assert_eq!(find(&buf, 8, "bar", SearchDirection::Backward, 1, &options), Ok(4));
    }

    #[test]
    fn smartcase() {
        let buf = RopeBuffer::new("Foo foo");
        let options = Options {
            ignorecase: true,
            smartcase: true,
            ..Options::default()
        };
        assert_eq!(find(&buf, 0, "foo", SearchDirection::Forward, 1, &options), Ok(4));
        assert_eq!(find(&buf, 4, "Foo", SearchDirection::Forward, 1, &options), Ok(0));
        assert_eq!(find(&buf, 0, "FOO\\c", SearchDirection::Forward, 1, &options), Ok(4));
    }

    #[test]
    fn word_under_caret() {
        let buf = RopeBuffer::new("  let foo_1 = 2;");
        assert_eq!(word_pattern(&buf, 0).as_deref(), Some("\\<let\\>"));
        assert_eq!(word_pattern(&buf, 8).as_deref(), Some("\\<foo_1\\>"));
        let buf = RopeBuffer::new("foo foobar foo");
        assert_eq!(find(&buf, 0, "\\<foo\\>", SearchDirection::Forward, 1, &Options::default()), Ok(11));
    }

    #[test]
    fn invalid_pattern() {
        let buf = RopeBuffer::new("x");
        assert!(matches!(
            find(&buf, 0, "(", SearchDirection::Forward, 1, &Options::default()),
            Err(Error::InvalidPattern(_))
        ));
    }
}
