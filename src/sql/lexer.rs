/// Tokenizer for query text.
///
/// The lexer only needs to be precise about what matters for sections:
/// bind placeholders, line breaks, and the constructs that may contain
/// placeholder-looking characters without being placeholders (string
/// literals, quoted identifiers, comments). Problems are recorded with their
/// position and lexing carries on, so a broken query still yields tokens.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    /// Backtick, double-quote or bracket quoted identifier; holds the unquoted name.
    QuotedIdent(String),
    StringLit,
    Number,
    Whitespace,
    NewLine,
    Comment,
    LParen,
    RParen,
    /// `?`, `?N` or `:name`.
    Bind { name: Option<String> },
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::NewLine | TokenKind::Comment
        )
    }

    /// Identifier value for words and quoted identifiers.
    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word => Some(&self.text),
            TokenKind::QuotedIdent(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }
}

#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub errors: Vec<String>,
}

pub fn tokenize(input: &str) -> Lexed {
    let mut lexer = Lexer {
        chars: input.chars().collect(),
        pos: 0,
        line: 1,
        col: 1,
        out: Lexed::default(),
        open_parens: Vec::new(),
    };
    lexer.run();
    lexer.out
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    out: Lexed,
    open_parens: Vec<(usize, usize)>,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error(&mut self, line: usize, col: usize, message: impl AsRef<str>) {
        self.out
            .errors
            .push(format!("line {line}:{col} {}", message.as_ref()));
    }

    fn push(&mut self, kind: TokenKind, start: usize, line: usize, col: usize) {
        let text: String = self.chars[start..self.pos].iter().collect();
        self.out.tokens.push(Token {
            kind,
            text,
            line,
            col,
        });
    }

    fn run(&mut self) {
        while let Some(c) = self.peek() {
            let (start, line, col) = (self.pos, self.line, self.col);
            let kind = match c {
                '\n' => {
                    self.bump();
                    TokenKind::NewLine
                }
                c if c.is_whitespace() => {
                    while matches!(self.peek(), Some(c) if c.is_whitespace() && c != '\n') {
                        self.bump();
                    }
                    TokenKind::Whitespace
                }
                '-' if self.peek_at(1) == Some('-') => {
                    while matches!(self.peek(), Some(c) if c != '\n') {
                        self.bump();
                    }
                    TokenKind::Comment
                }
                '/' if self.peek_at(1) == Some('*') => {
                    self.bump();
                    self.bump();
                    let mut closed = false;
                    while let Some(c) = self.bump() {
                        if c == '*' && self.peek() == Some('/') {
                            self.bump();
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        self.error(line, col, "unterminated comment");
                    }
                    TokenKind::Comment
                }
                '\'' => {
                    self.quoted('\'', line, col, "unterminated string literal");
                    TokenKind::StringLit
                }
                '"' | '`' => {
                    let name = self.quoted(c, line, col, "unterminated quoted identifier");
                    TokenKind::QuotedIdent(name)
                }
                '[' => {
                    self.bump();
                    let mut name = String::new();
                    let mut closed = false;
                    while let Some(c) = self.bump() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        self.error(line, col, "unterminated quoted identifier");
                    }
                    TokenKind::QuotedIdent(name)
                }
                '?' => self.positional(line, col),
                ':' => self.named(line, col),
                '(' => {
                    self.bump();
                    self.open_parens.push((line, col));
                    TokenKind::LParen
                }
                ')' => {
                    self.bump();
                    if self.open_parens.pop().is_none() {
                        self.error(line, col, "unbalanced ')'");
                    }
                    TokenKind::RParen
                }
                c if c.is_ascii_digit() => {
                    while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '.') {
                        self.bump();
                    }
                    TokenKind::Number
                }
                c if is_ident_start(c) => {
                    while matches!(self.peek(), Some(c) if is_ident_part(c)) {
                        self.bump();
                    }
                    TokenKind::Word
                }
                _ => {
                    self.bump();
                    TokenKind::Punct
                }
            };
            self.push(kind, start, line, col);
        }
        let unclosed = std::mem::take(&mut self.open_parens);
        for (line, col) in unclosed {
            self.error(line, col, "unclosed '('");
        }
    }

    /// Consumes a quoted run where the quote character escapes itself.
    fn quoted(&mut self, quote: char, line: usize, col: usize, message: &str) -> String {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.bump();
                        value.push(quote);
                    } else {
                        return value;
                    }
                }
                Some(c) => value.push(c),
                None => {
                    self.error(line, col, message);
                    return value;
                }
            }
        }
    }

    fn positional(&mut self, line: usize, col: usize) -> TokenKind {
        self.bump();
        let digits_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        let digits: String = self.chars[digits_start..self.pos].iter().collect();
        if matches!(self.peek(), Some(c) if is_ident_part(c)) {
            while matches!(self.peek(), Some(c) if is_ident_part(c)) {
                self.bump();
            }
            let text: String = self.chars[digits_start - 1..self.pos].iter().collect();
            self.error(line, col, format!("malformed bind placeholder `{text}`"));
        } else if !digits.is_empty() && digits.parse::<usize>().map_or(true, |n| n == 0) {
            self.error(line, col, format!("bind index must be at least 1 in `?{digits}`"));
        }
        TokenKind::Bind { name: None }
    }

    fn named(&mut self, line: usize, col: usize) -> TokenKind {
        self.bump();
        if !matches!(self.peek(), Some(c) if is_ident_start(c)) {
            self.error(line, col, "expected a parameter name after ':'");
            return TokenKind::Punct;
        }
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_part(c)) {
            self.bump();
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        TokenKind::Bind { name: Some(name) }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
