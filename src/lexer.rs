//! Lexical analysis for 0x source text.
//!
//! Greedy left-to-right scan producing positioned tokens. Lines and columns
//! are 1-based and point at the first character of each token.

mod error;
mod token;

pub use error::{LexError, LexResult};
pub use token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            done: false,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token> {
        self.skip_trivia();

        let span = self.current_span();
        let Some(ch) = self.peek_char() else {
            return Ok(Token::new(TokenKind::Eof, span));
        };

        if let Some(kind) = self.try_consume_symbol(ch) {
            return Ok(Token::new(kind, span));
        }

        match ch {
            '"' | '\'' => self.read_string(ch, span),
            c if c.is_ascii_digit() => self.read_integer(span),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier(span)),
            _ => Err(LexError::UnexpectedCharacter {
                character: ch,
                line: span.line,
                column: span.column,
            }),
        }
    }

    /// Skips whitespace and `//` line comments, tracking line/column.
    fn skip_trivia(&mut self) {
        loop {
            self.consume_while(|c| c.is_whitespace());
            if self.rest().starts_with("//") {
                self.consume_while(|c| c != '\n');
                continue;
            }
            break;
        }
    }

    fn try_consume_symbol(&mut self, ch: char) -> Option<TokenKind> {
        // Two-character symbols win over one-character symbols at the
        // same position.
        let two = [
            ("==", TokenKind::EqualEqual),
            ("!=", TokenKind::BangEqual),
            ("<=", TokenKind::LessEqual),
            (">=", TokenKind::GreaterEqual),
            ("&&", TokenKind::AndAnd),
            ("||", TokenKind::OrOr),
            ("->", TokenKind::Arrow),
        ];
        for (text, kind) in two {
            if self.rest().starts_with(text) {
                self.consume_char();
                self.consume_char();
                return Some(kind);
            }
        }

        let kind = match ch {
            '=' => TokenKind::Equal,
            '<' => TokenKind::Less,
            '>' => TokenKind::Greater,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            _ => return None,
        };
        self.consume_char();
        Some(kind)
    }

    fn read_identifier(&mut self, span: Span) -> Token {
        let start = self.pos;
        self.consume_while(|c| c.is_alphanumeric() || c == '_');
        let word = &self.input[start..self.pos];

        let kind = match word {
            "class" => TokenKind::Class,
            "extends" => TokenKind::Extends,
            "constructor" => TokenKind::Constructor,
            "let" => TokenKind::Let,
            "new" => TokenKind::New,
            "return" => TokenKind::Return,
            "super" => TokenKind::Super,
            "this" => TokenKind::This,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "import" => TokenKind::Import,
            "as" => TokenKind::As,
            _ => TokenKind::Identifier(word.to_string()),
        };
        Token::new(kind, span)
    }

    fn read_integer(&mut self, span: Span) -> LexResult<Token> {
        let start = self.pos;
        self.consume_while(|c| c.is_ascii_digit());
        let literal = &self.input[start..self.pos];

        let value = literal
            .parse::<i64>()
            .map_err(|_| LexError::InvalidIntegerLiteral {
                literal: literal.to_string(),
                line: span.line,
                column: span.column,
            })?;
        Ok(Token::new(TokenKind::Integer(value), span))
    }

    /// Reads a string opened by `delimiter`. A backslash escapes the next
    /// character, which is included literally; the delimiters are not part
    /// of the content. Running out of input is an error at the opening
    /// quote.
    fn read_string(&mut self, delimiter: char, span: Span) -> LexResult<Token> {
        self.consume_char();
        let mut content = String::new();

        loop {
            match self.consume_char() {
                Some('\\') => match self.consume_char() {
                    Some(escaped) => content.push(escaped),
                    None => {
                        return Err(LexError::UnterminatedString {
                            line: span.line,
                            column: span.column,
                        });
                    }
                },
                Some(c) if c == delimiter => {
                    return Ok(Token::new(TokenKind::Str(content), span));
                }
                Some(c) => content.push(c),
                None => {
                    return Err(LexError::UnterminatedString {
                        line: span.line,
                        column: span.column,
                    });
                }
            }
        }
    }

    fn consume_while<P>(&mut self, keep_predicate: P)
    where
        P: Fn(char) -> bool,
    {
        while let Some(c) = self.peek_char() {
            if !keep_predicate(c) {
                break;
            }
            self.consume_char();
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn current_span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(token) => {
                if matches!(token.kind, TokenKind::Eof) {
                    self.done = true;
                }
                Some(Ok(token))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::Eof);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}
