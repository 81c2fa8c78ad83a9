// SPDX-License-Identifier: AGPL-3.0-or-later
// CsvSift - Streaming CSV Query Engine
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Tokenizer for the query dialect.
//!
//! Keywords are not distinguished here; any bare run of characters is a
//! [`TokenKind::Word`], which lets file paths (`/data/orders.csv`),
//! numbers, and identifiers share one token shape. The parser decides
//! what a word means from context.

use crate::error::{SqlError, SqlResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare word: identifier, keyword, number, or file path.
    Word(String),
    /// `'...'` or `"..."` literal, quotes stripped.
    Quoted(String),
    Star,
    Comma,
    LParen,
    RParen,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Word(w) => format!("{w:?}"),
            TokenKind::Quoted(s) => format!("{s:?}"),
            TokenKind::Star => "'*'".into(),
            TokenKind::Comma => "','".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::Eq => "'='".into(),
            TokenKind::Ne => "'!='".into(),
            TokenKind::Gt => "'>'".into(),
            TokenKind::Ge => "'>='".into(),
            TokenKind::Lt => "'<'".into(),
            TokenKind::Le => "'<='".into(),
            TokenKind::Eof => "end of query".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    pub fn tokenize(mut self) -> SqlResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> SqlResult<Token> {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        let start = self.pos;
        if self.pos >= self.input.len() {
            return Ok(Token {
                kind: TokenKind::Eof,
                pos: start,
            });
        }

        let kind = match self.input[self.pos] {
            b'*' => {
                self.pos += 1;
                TokenKind::Star
            }
            b',' => {
                self.pos += 1;
                TokenKind::Comma
            }
            b'(' => {
                self.pos += 1;
                TokenKind::LParen
            }
            b')' => {
                self.pos += 1;
                TokenKind::RParen
            }
            b'=' => {
                self.pos += 1;
                TokenKind::Eq
            }
            b'!' => {
                if self.peek(1) == Some(b'=') {
                    self.pos += 2;
                    TokenKind::Ne
                } else {
                    return Err(SqlError::UnexpectedChar {
                        found: '!',
                        pos: start,
                    });
                }
            }
            b'<' => match self.peek(1) {
                Some(b'=') => {
                    self.pos += 2;
                    TokenKind::Le
                }
                Some(b'>') => {
                    self.pos += 2;
                    TokenKind::Ne
                }
                _ => {
                    self.pos += 1;
                    TokenKind::Lt
                }
            },
            b'>' => {
                if self.peek(1) == Some(b'=') {
                    self.pos += 2;
                    TokenKind::Ge
                } else {
                    self.pos += 1;
                    TokenKind::Gt
                }
            }
            quote @ (b'\'' | b'"') => {
                self.pos += 1;
                let text_start = self.pos;
                while self.pos < self.input.len() && self.input[self.pos] != quote {
                    self.pos += 1;
                }
                if self.pos >= self.input.len() {
                    return Err(SqlError::UnterminatedString { pos: start });
                }
                let text = String::from_utf8_lossy(&self.input[text_start..self.pos]).into_owned();
                self.pos += 1;
                TokenKind::Quoted(text)
            }
            _ => {
                while self.pos < self.input.len() && !is_word_break(self.input[self.pos]) {
                    self.pos += 1;
                }
                let word = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                TokenKind::Word(word)
            }
        };

        Ok(Token { kind, pos: start })
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.input.get(self.pos + ahead).copied()
    }
}

fn is_word_break(b: u8) -> bool {
    b.is_ascii_whitespace()
        || matches!(
            b,
            b',' | b'(' | b')' | b'=' | b'!' | b'<' | b'>' | b'*' | b'\'' | b'"'
        )
}
