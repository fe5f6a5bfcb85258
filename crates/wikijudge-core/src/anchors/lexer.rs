//! Comment and string masking ahead of anchor regexes.
//!
//! Masked characters become spaces; newlines survive so line-anchored patterns
//! (`^import`, `^@decorator`) still see the original line structure. Quote
//! characters themselves are kept.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Syntax {
    /// `//` and `/* */` comments, `"`/`'` literals with backslash escapes, `"""` text blocks.
    CLike,
    /// `#` comments, `'`/`"` literals, triple-quoted strings.
    Python,
    /// `--` and `/* */` comments, `'` literals with `''` escapes.
    /// `"` is a quoted identifier and stays.
    Sql,
}

impl Syntax {
    fn line_comment_at(&self, chars: &[char], i: usize) -> bool {
        let next = chars.get(i + 1).copied();
        match self {
            Syntax::CLike => chars[i] == '/' && next == Some('/'),
            Syntax::Python => chars[i] == '#',
            Syntax::Sql => chars[i] == '-' && next == Some('-'),
        }
    }

    fn has_block_comments(&self) -> bool {
        !matches!(self, Syntax::Python)
    }

    fn is_quote(&self, c: char) -> bool {
        match self {
            Syntax::CLike | Syntax::Python => c == '"' || c == '\'',
            Syntax::Sql => c == '\'',
        }
    }

    fn backslash_escapes(&self) -> bool {
        !matches!(self, Syntax::Sql)
    }

    fn multiline_strings(&self) -> bool {
        matches!(self, Syntax::Sql)
    }
}

fn blank(c: char) -> char {
    if c == '\n' {
        '\n'
    } else {
        ' '
    }
}

fn triple_at(chars: &[char], i: usize, q: char) -> bool {
    chars.get(i) == Some(&q) && chars.get(i + 1) == Some(&q) && chars.get(i + 2) == Some(&q)
}

/// Replace comments and string-literal contents with whitespace.
pub(crate) fn mask_non_code(src: &str, syntax: Syntax) -> String {
    let chars: Vec<char> = src.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(src.len());
    let mut i = 0;

    while i < n {
        let c = chars[i];

        if syntax.line_comment_at(&chars, i) {
            while i < n && chars[i] != '\n' {
                out.push(' ');
                i += 1;
            }
            continue;
        }

        if syntax.has_block_comments() && c == '/' && chars.get(i + 1) == Some(&'*') {
            out.push_str("  ");
            i += 2;
            while i < n && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                out.push(blank(chars[i]));
                i += 1;
            }
            if i < n {
                out.push_str("  ");
                i += 2;
            }
            continue;
        }

        if syntax.is_quote(c) {
            if syntax != Syntax::Sql && triple_at(&chars, i, c) {
                out.extend([c, c, c]);
                i += 3;
                while i < n && !triple_at(&chars, i, c) {
                    if chars[i] == '\\' && i + 1 < n {
                        out.push(' ');
                        out.push(blank(chars[i + 1]));
                        i += 2;
                        continue;
                    }
                    out.push(blank(chars[i]));
                    i += 1;
                }
                if i < n {
                    out.extend([c, c, c]);
                    i += 3;
                }
                continue;
            }

            out.push(c);
            i += 1;
            while i < n {
                let ch = chars[i];
                if ch == '\\' && syntax.backslash_escapes() {
                    out.push(' ');
                    i += 1;
                    if i < n && chars[i] != '\n' {
                        out.push(' ');
                        i += 1;
                    }
                    continue;
                }
                if ch == c {
                    if syntax == Syntax::Sql && chars.get(i + 1) == Some(&c) {
                        out.push_str("  ");
                        i += 2;
                        continue;
                    }
                    out.push(c);
                    i += 1;
                    break;
                }
                if ch == '\n' && !syntax.multiline_strings() {
                    // unterminated literal ends at the line break
                    break;
                }
                out.push(blank(ch));
                i += 1;
            }
            continue;
        }

        out.push(c);
        i += 1;
    }

    out
}
