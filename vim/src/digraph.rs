//! `<C-k>{char1}{char2}` digraphs.
//!
//! A subset of the RFC 1345 table that Vim ships, covering Latin accents,
//! common symbols and Greek letters. Either key order is accepted.

const DIGRAPHS: &[(char, char, char)] = &[
    ('a', ':', 'ä'),
    ('o', ':', 'ö'),
    ('u', ':', 'ü'),
    ('A', ':', 'Ä'),
    ('O', ':', 'Ö'),
    ('U', ':', 'Ü'),
    ('e', ':', 'ë'),
    ('i', ':', 'ï'),
    ('y', ':', 'ÿ'),
    ('s', 's', 'ß'),
    ('a', '\'', 'á'),
    ('e', '\'', 'é'),
    ('i', '\'', 'í'),
    ('o', '\'', 'ó'),
    ('u', '\'', 'ú'),
    ('E', '\'', 'É'),
    ('a', '!', 'à'),
    ('e', '!', 'è'),
    ('i', '!', 'ì'),
    ('o', '!', 'ò'),
    ('u', '!', 'ù'),
    ('a', '>', 'â'),
    ('e', '>', 'ê'),
    ('i', '>', 'î'),
    ('o', '>', 'ô'),
    ('u', '>', 'û'),
    ('n', '?', 'ñ'),
    ('N', '?', 'Ñ'),
    ('c', ',', 'ç'),
    ('C', ',', 'Ç'),
    ('a', 'a', 'å'),
    ('A', 'A', 'Å'),
    ('a', 'e', 'æ'),
    ('A', 'E', 'Æ'),
    ('o', '/', 'ø'),
    ('O', '/', 'Ø'),
    ('E', 'u', '€'),
    ('P', 'd', '£'),
    ('Y', 'e', '¥'),
    ('C', 't', '¢'),
    ('C', 'o', '©'),
    ('R', 'g', '®'),
    ('D', 'G', '°'),
    ('+', '-', '±'),
    ('*', 'X', '×'),
    ('-', ':', '÷'),
    ('<', '<', '«'),
    ('>', '>', '»'),
    ('S', 'E', '§'),
    ('P', 'I', '¶'),
    ('N', 'S', '\u{a0}'),
    ('-', 'N', '–'),
    ('-', 'M', '—'),
    ('.', '.', '‥'),
    (',', '.', '…'),
    ('-', '>', '→'),
    ('<', '-', '←'),
    ('-', '!', '↑'),
    ('-', 'v', '↓'),
    ('=', '>', '⇒'),
    ('!', '=', '≠'),
    ('=', '<', '≤'),
    ('>', '=', '≥'),
    ('0', '0', '∞'),
    ('a', '*', 'α'),
    ('b', '*', 'β'),
    ('g', '*', 'γ'),
    ('d', '*', 'δ'),
    ('e', '*', 'ε'),
    ('l', '*', 'λ'),
    ('m', '*', 'μ'),
    ('p', '*', 'π'),
    ('s', '*', 'σ'),
    ('w', '*', 'ω'),
    ('D', '*', 'Δ'),
    ('W', '*', 'Ω'),
    ('O', 'K', '✓'),
    ('X', 'X', '✗'),
];

/// The character for a digraph, or `None` when the pair is unknown.
pub fn lookup(first: char, second: char) -> Option<char> {
    DIGRAPHS
        .iter()
        .find(|(a, b, _)| (*a == first && *b == second) || (*a == second && *b == first))
        .map(|(_, _, c)| *c)
}

/// Like [`lookup`], but an unknown pair produces its second character.
pub fn resolve(first: char, second: char) -> char {
    lookup(first, second).unwrap_or(second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn either_order() {
        assert_eq!(lookup('a', ':'), Some('ä'));
        assert_eq!(lookup(':', 'a'), Some('ä'));
        assert_eq!(lookup('E', 'u'), Some('€'));
    }

    #[test]
    fn unknown_pairs_fall_back_to_the_second_char() {
        assert_eq!(lookup('q', 'q'), None);
        assert_eq!(resolve('q', 'z'), 'z');
    }
}
