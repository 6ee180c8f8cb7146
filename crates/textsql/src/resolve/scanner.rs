//! Lexical scan of SQL text, just deep enough to find table positions.

use crate::error::ResolveError;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Space,
    Comment,
    Word,
    /// Identifier quoted with `"` or `` ` ``.
    Quoted(char),
    /// Single-quoted string literal.
    Str,
    LParen,
    RParen,
    Comma,
    Semicolon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Space | TokenKind::Comment)
    }
}

/// Keywords after which the next token names a table.
const TABLE_KEYWORDS: &[&str] = &["FROM", "JOIN"];

/// Modifiers that may sit between `FROM` and the table itself.
const TABLE_MODIFIERS: &[&str] = &["ONLY", "LATERAL"];

/// Words that end a table list instead of aliasing the preceding table.
const RESERVED: &[&str] = &[
    "AS", "CROSS", "EXCEPT", "FETCH", "FOR", "FROM", "FULL", "GROUP", "HAVING", "INDEXED",
    "INNER", "INTERSECT", "JOIN", "LEFT", "LIMIT", "NATURAL", "NOT", "OFFSET", "ON", "ORDER",
    "OUTER", "RETURNING", "RIGHT", "SELECT", "SET", "STRAIGHT_JOIN", "TABLESAMPLE", "UNION",
    "USING", "VALUES", "WHERE", "WINDOW", "WITH",
];

fn is_special(c: char) -> bool {
    matches!(c, '(' | ')' | ',' | ';' | '\'' | '"' | '`')
}

/// Split `sql` into tokens covering every byte of the input.
pub(crate) fn tokenize(sql: &str) -> Result<Vec<Token>, ResolveError> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while let Some(c) = sql[i..].chars().next() {
        let rest = &sql[i..];
        let (kind, len) = if c.is_whitespace() {
            let len = rest
                .find(|ch: char| !ch.is_whitespace())
                .unwrap_or(rest.len());
            (TokenKind::Space, len)
        } else if rest.starts_with("--") {
            (TokenKind::Comment, rest.find('\n').unwrap_or(rest.len()))
        } else if rest.starts_with("/*") {
            let len = rest[2..].find("*/").map(|p| p + 4).unwrap_or(rest.len());
            (TokenKind::Comment, len)
        } else {
            match c {
                '(' => (TokenKind::LParen, 1),
                ')' => (TokenKind::RParen, 1),
                ',' => (TokenKind::Comma, 1),
                ';' => (TokenKind::Semicolon, 1),
                '\'' => (TokenKind::Str, quoted_len(rest, '\'').unwrap_or(rest.len())),
                '"' | '`' => match quoted_len(rest, c) {
                    Some(len) => (TokenKind::Quoted(c), len),
                    None => {
                        return Err(ResolveError::UnterminatedQuote {
                            position: i,
                            fragment: rest.chars().take(40).collect(),
                        })
                    }
                },
                _ => {
                    let len = rest
                        .find(|ch: char| ch.is_whitespace() || is_special(ch))
                        .unwrap_or(rest.len());
                    (TokenKind::Word, len)
                }
            }
        };
        tokens.push(Token {
            kind,
            span: i..i + len,
        });
        i += len;
    }

    Ok(tokens)
}

/// Byte length of a quoted run starting at `s[0] == quote`, where a doubled
/// quote is an escaped quote. `None` if the run is unterminated.
fn quoted_len(s: &str, quote: char) -> Option<usize> {
    let mut chars = s.char_indices().skip(1).peekable();
    while let Some((pos, c)) = chars.next() {
        if c == quote {
            if chars.peek().map(|&(_, next)| next) == Some(quote) {
                chars.next();
            } else {
                return Some(pos + c.len_utf8());
            }
        }
    }
    None
}

/// Content of a quoted token with doubled quotes collapsed.
pub(crate) fn unquote(text: &str, quote: char) -> String {
    let inner = &text[quote.len_utf8()..text.len() - quote.len_utf8()];
    let doubled: String = [quote, quote].iter().collect();
    inner.replace(&doubled, &quote.to_string())
}

/// A token sitting where the grammar expects a table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TablePosition {
    pub span: Range<usize>,
    /// Unquoted text of the token.
    pub text: String,
    pub quoted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    ExpectTable,
    AfterTable,
    ExpectAlias,
    AfterAlias,
}

/// Walk the tokens and collect every table position of FROM/JOIN clauses,
/// including comma-separated table lists. Function calls (`name(...)`) and
/// subqueries are not table positions.
pub(crate) fn table_positions(sql: &str, tokens: &[Token]) -> Vec<TablePosition> {
    let significant: Vec<&Token> = tokens.iter().filter(|t| !t.is_trivia()).collect();
    let mut positions = Vec::new();
    let mut state = State::Normal;
    let mut i = 0;

    while i < significant.len() {
        let token = significant[i];
        let text = &sql[token.span.clone()];
        let upper = text.to_ascii_uppercase();
        let is_word = token.kind == TokenKind::Word;
        let reserved = is_word && RESERVED.contains(&upper.as_str());

        let next = match state {
            State::Normal => {
                if is_word && TABLE_KEYWORDS.contains(&upper.as_str()) {
                    State::ExpectTable
                } else {
                    State::Normal
                }
            }
            State::ExpectTable => match token.kind {
                TokenKind::Word if TABLE_MODIFIERS.contains(&upper.as_str()) => State::ExpectTable,
                TokenKind::Word | TokenKind::Quoted(_) if !reserved => {
                    let is_call = significant
                        .get(i + 1)
                        .is_some_and(|t| t.kind == TokenKind::LParen);
                    if is_call {
                        State::Normal
                    } else {
                        positions.push(TablePosition {
                            span: token.span.clone(),
                            text: match token.kind {
                                TokenKind::Quoted(q) => unquote(text, q),
                                _ => text.to_string(),
                            },
                            quoted: matches!(token.kind, TokenKind::Quoted(_)),
                        });
                        State::AfterTable
                    }
                }
                _ => {
                    state = State::Normal;
                    continue;
                }
            },
            State::AfterTable => match token.kind {
                TokenKind::Comma => State::ExpectTable,
                TokenKind::Word if upper == "AS" => State::ExpectAlias,
                TokenKind::Word if !reserved => State::AfterAlias,
                TokenKind::Quoted(_) => State::AfterAlias,
                _ => {
                    state = State::Normal;
                    continue;
                }
            },
            State::ExpectAlias => match token.kind {
                TokenKind::Word | TokenKind::Quoted(_) => State::AfterAlias,
                _ => {
                    state = State::Normal;
                    continue;
                }
            },
            State::AfterAlias => match token.kind {
                TokenKind::Comma => State::ExpectTable,
                _ => {
                    state = State::Normal;
                    continue;
                }
            },
        };

        state = next;
        i += 1;
    }

    positions
}
