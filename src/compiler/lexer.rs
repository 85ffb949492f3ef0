use logos::{Logos, Skip};

use crate::error::CompileError;

/// Represents a lexical token of the language.
///
/// A token is a minimal but meaningful unit of text produced by the lexer.
/// Operators are recognized by maximal munch: the longest operator that
/// matches at the current position wins, so `..=` is one token rather than
/// `..` followed by `=`.
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(extras = LexerExtras)]
pub enum Token {
    /// Numeric literal tokens.
    ///
    /// A literal is first parsed as an integer with C-style base detection
    /// (`0x…` hexadecimal, `0…` octal, decimal otherwise) and falls back to
    /// double parsing when the integer parse does not consume the whole
    /// word, so `3.14`, `1e9`, and out-of-range integers all produce
    /// doubles.
    #[regex(r"[0-9][0-9a-zA-Z_]*(\.[0-9][0-9a-zA-Z_]*)?", parse_number)]
    Number(f64),
    /// String literal tokens, honoring the escapes `\t \n \r \0 \\ \"`.
    #[regex(r#""([^"\\\n\r\t]|\\[^\n\r])*""#, parse_string)]
    Str(String),
    /// Identifier tokens; variable or function names such as `x` or `join`.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    /// `sizeof`
    #[token("sizeof")]
    KwSizeof,
    /// `tostring`
    #[token("tostring")]
    KwTostring,
    /// `if`
    #[token("if")]
    KwIf,
    /// `elif`
    #[token("elif")]
    KwElif,
    /// `else`
    #[token("else")]
    KwElse,
    /// `switch`
    #[token("switch")]
    KwSwitch,
    /// `case`
    #[token("case")]
    KwCase,
    /// `default`
    #[token("default")]
    KwDefault,
    /// `for`
    #[token("for")]
    KwFor,
    /// `while`
    #[token("while")]
    KwWhile,
    /// `do`
    #[token("do")]
    KwDo,
    /// `break`
    #[token("break")]
    KwBreak,
    /// `continue`
    #[token("continue")]
    KwContinue,
    /// `return`
    #[token("return")]
    KwReturn,
    /// `function`
    #[token("function")]
    KwFunction,
    /// `void`
    #[token("void")]
    KwVoid,
    /// `number`
    #[token("number")]
    KwNumber,
    /// `string`
    #[token("string")]
    KwString,
    /// `public`
    #[token("public")]
    KwPublic,

    /// `++`
    #[token("++")]
    Inc,
    /// `--`
    #[token("--")]
    Dec,
    /// `+`
    #[token("+")]
    Add,
    /// `-`
    #[token("-")]
    Sub,
    /// `..`
    #[token("..")]
    Concat,
    /// `*`
    #[token("*")]
    Mul,
    /// `/`
    #[token("/")]
    Div,
    /// `\`
    #[token("\\")]
    Idiv,
    /// `%`
    #[token("%")]
    Mod,
    /// `~`
    #[token("~")]
    BitwiseNot,
    /// `&`
    #[token("&")]
    BitwiseAnd,
    /// `|`
    #[token("|")]
    BitwiseOr,
    /// `^`
    #[token("^")]
    BitwiseXor,
    /// `<<`
    #[token("<<")]
    Shiftl,
    /// `>>`
    #[token(">>")]
    Shiftr,
    /// `=`
    #[token("=")]
    Assign,
    /// `+=`
    #[token("+=")]
    AddAssign,
    /// `-=`
    #[token("-=")]
    SubAssign,
    /// `..=`
    #[token("..=")]
    ConcatAssign,
    /// `*=`
    #[token("*=")]
    MulAssign,
    /// `/=`
    #[token("/=")]
    DivAssign,
    /// `\=`
    #[token("\\=")]
    IdivAssign,
    /// `%=`
    #[token("%=")]
    ModAssign,
    /// `&=`
    #[token("&=")]
    AndAssign,
    /// `|=`
    #[token("|=")]
    OrAssign,
    /// `^=`
    #[token("^=")]
    XorAssign,
    /// `<<=`
    #[token("<<=")]
    ShiftlAssign,
    /// `>>=`
    #[token(">>=")]
    ShiftrAssign,
    /// `!`
    #[token("!")]
    LogicalNot,
    /// `&&`
    #[token("&&")]
    LogicalAnd,
    /// `||`
    #[token("||")]
    LogicalOr,
    /// `==`
    #[token("==")]
    Eq,
    /// `!=`
    #[token("!=")]
    Ne,
    /// `<`
    #[token("<")]
    Lt,
    /// `>`
    #[token(">")]
    Gt,
    /// `<=`
    #[token("<=")]
    Le,
    /// `>=`
    #[token(">=")]
    Ge,
    /// `?`
    #[token("?")]
    Question,
    /// `:`
    #[token(":")]
    Colon,
    /// `,`
    #[token(",")]
    Comma,
    /// `;`
    #[token(";")]
    Semicolon,
    /// `(`
    #[token("(")]
    OpenRound,
    /// `)`
    #[token(")")]
    CloseRound,
    /// `{`
    #[token("{")]
    OpenCurly,
    /// `}`
    #[token("}")]
    CloseCurly,
    /// `[`
    #[token("[")]
    OpenSquare,
    /// `]`
    #[token("]")]
    CloseSquare,

    /// A string literal that is still open when the line or the input ends.
    /// Reported as a parsing error by [`tokenize`].
    #[regex(r#""([^"\\\n\r\t]|\\[^\n\r])*\\?"#)]
    UnterminatedStr,
    /// A block comment that is still open when the input ends.
    /// Reported as a parsing error by [`tokenize`].
    #[regex(r"/\*([^*]|\*+[^*/])*\**", unterminated_comment)]
    UnterminatedComment,

    /// `// Comments.`
    #[regex(r"//[^\n]*", logos::skip)]
    Comment,
    /// `/* Multi line comments. */`
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", block_comment)]
    MultiLineComment,
    /// Newlines; tracked for locations, then skipped.
    #[token("\n", newline)]
    NewLine,
    /// Spaces, tabs and feeds.
    #[regex(r"[ \t\r\f]+", logos::skip)]
    Ignored,
}

/// Additional information carried by the lexer during tokenization.
///
/// Tracks the current line and the byte offset of its first character, so
/// every token can be stamped with a line and column.
#[derive(Default)]
pub struct LexerExtras {
    /// The current 0-based line number in the source being tokenized.
    pub line:       usize,
    /// The byte offset at which the current line starts.
    pub line_start: usize,
}

/// A token together with the 0-based source position of its first character.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    /// The token itself.
    pub token: Token,
    /// The source line of the token.
    pub line:  usize,
    /// The source column of the token.
    pub col:   usize,
}

/// Parses a numeric literal from the current token slice.
///
/// # Returns
/// - `Some(f64)`: The parsed value.
/// - `None`: If the word is neither a valid integer nor a valid double,
///   which surfaces as a lexing error.
#[allow(clippy::cast_precision_loss)]
fn parse_number(lex: &logos::Lexer<Token>) -> Option<f64> {
    let word = lex.slice();

    let integer = if let Some(hex) = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if word.len() > 1 && word.starts_with('0') && !word.contains('.') {
        i64::from_str_radix(&word[1..], 8).ok()
    } else {
        word.parse::<i64>().ok()
    };

    match integer {
        Some(n) => Some(n as f64),
        None => word.parse::<f64>().ok(),
    }
}

/// Parses a string literal from the current token slice, resolving escapes.
///
/// The recognized escapes are `\t`, `\n`, `\r`, and `\0`; any other escaped
/// character stands for itself, which covers `\\` and `\"`.
fn parse_string(lex: &logos::Lexer<Token>) -> String {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];

    let mut ret = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            ret.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => ret.push('\t'),
            Some('n') => ret.push('\n'),
            Some('r') => ret.push('\r'),
            Some('0') => ret.push('\0'),
            Some(other) => ret.push(other),
            None => {},
        }
    }

    ret
}

fn newline(lex: &mut logos::Lexer<Token>) -> Skip {
    lex.extras.line += 1;
    lex.extras.line_start = lex.span().end;
    Skip
}

fn block_comment(lex: &mut logos::Lexer<Token>) -> Skip {
    advance_lines(lex);
    Skip
}

fn unterminated_comment(lex: &mut logos::Lexer<Token>) {
    advance_lines(lex);
}

/// Accounts for the newlines inside a multi-line slice.
fn advance_lines(lex: &mut logos::Lexer<Token>) {
    let slice = lex.slice();
    let newlines = slice.bytes().filter(|&b| b == b'\n').count();

    if newlines > 0 {
        lex.extras.line += newlines;
        let last = slice.rfind('\n').unwrap_or(0);
        lex.extras.line_start = lex.span().start + last + 1;
    }
}

/// Converts a source text into the token sequence the compiler consumes.
///
/// # Errors
/// Returns a [`CompileError`] describing the first lexical malformation:
/// an unterminated string or block comment, a malformed numeric literal, or
/// a character that cannot start any token.
pub fn tokenize(source: &str) -> Result<TokenStream, CompileError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer_with_extras(source, LexerExtras::default());

    while let Some(token) = lexer.next() {
        let span = lexer.span();
        let line = lexer.extras.line;
        let col = span.start - lexer.extras.line_start;

        match token {
            Ok(Token::UnterminatedStr) => {
                return Err(CompileError::UnterminatedString { line,
                                                              col: span.end
                                                                   - lexer.extras.line_start, });
            },
            Ok(Token::UnterminatedComment) => {
                return Err(CompileError::UnterminatedComment { line,
                                                               col: span.end
                                                                    - lexer.extras.line_start, });
            },
            Ok(token) => tokens.push(TokenInfo { token, line, col }),
            Err(()) => {
                let text = lexer.slice().to_string();
                return Err(if text.starts_with(|c: char| c.is_ascii_digit()) {
                               CompileError::MalformedNumber { text, line, col }
                           } else {
                               CompileError::UnexpectedCharacter { text, line, col }
                           });
            },
        }
    }

    let end = (lexer.extras.line, source.len() - lexer.extras.line_start);
    Ok(TokenStream::new(tokens, end))
}

/// A cursor over a lexed token sequence.
///
/// The compiler drives a single `TokenStream` per compilation unit; function
/// bodies captured during the declaration pass are replayed later through a
/// fresh stream over the captured tokens.
pub struct TokenStream {
    tokens: Vec<TokenInfo>,
    pos:    usize,
    end:    (usize, usize),
}

impl TokenStream {
    /// Creates a stream over `tokens`; `end` is the position reported for
    /// errors at the end of input.
    #[must_use]
    pub fn new(tokens: Vec<TokenInfo>, end: (usize, usize)) -> Self {
        Self { tokens, pos: 0, end }
    }

    /// Creates a stream over a captured token slice, such as a function
    /// body.
    #[must_use]
    pub fn from_tokens(tokens: Vec<TokenInfo>) -> Self {
        let end = tokens.last().map_or((0, 0), |t| (t.line, t.col));
        Self::new(tokens, end)
    }

    /// Returns the token at the cursor without consuming it, or `None` at
    /// the end of input.
    #[must_use]
    pub fn peek(&self) -> Option<&TokenInfo> {
        self.tokens.get(self.pos)
    }

    /// Consumes and returns the token at the cursor.
    pub fn next(&mut self) -> Option<TokenInfo> {
        let ret = self.tokens.get(self.pos).cloned();
        if ret.is_some() {
            self.pos += 1;
        }
        ret
    }

    /// Moves the cursor past the current token.
    pub fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Returns `true` when the cursor has consumed every token.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Returns `true` when the token at the cursor equals `token`.
    #[must_use]
    pub fn matches(&self, token: &Token) -> bool {
        self.peek().is_some_and(|t| t.token == *token)
    }

    /// Returns the position of the token at the cursor, or the end-of-input
    /// position once the stream is exhausted.
    #[must_use]
    pub fn location(&self) -> (usize, usize) {
        self.peek().map_or(self.end, |t| (t.line, t.col))
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Number(n) => return write!(f, "{}", crate::runtime::value::number_to_string(*n)),
            Self::Str(s) => return write!(f, "{s}"),
            Self::Identifier(name) => return write!(f, "{name}"),
            Self::KwSizeof => "sizeof",
            Self::KwTostring => "tostring",
            Self::KwIf => "if",
            Self::KwElif => "elif",
            Self::KwElse => "else",
            Self::KwSwitch => "switch",
            Self::KwCase => "case",
            Self::KwDefault => "default",
            Self::KwFor => "for",
            Self::KwWhile => "while",
            Self::KwDo => "do",
            Self::KwBreak => "break",
            Self::KwContinue => "continue",
            Self::KwReturn => "return",
            Self::KwFunction => "function",
            Self::KwVoid => "void",
            Self::KwNumber => "number",
            Self::KwString => "string",
            Self::KwPublic => "public",
            Self::Inc => "++",
            Self::Dec => "--",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Concat => "..",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Idiv => "\\",
            Self::Mod => "%",
            Self::BitwiseNot => "~",
            Self::BitwiseAnd => "&",
            Self::BitwiseOr => "|",
            Self::BitwiseXor => "^",
            Self::Shiftl => "<<",
            Self::Shiftr => ">>",
            Self::Assign => "=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::ConcatAssign => "..=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
            Self::IdivAssign => "\\=",
            Self::ModAssign => "%=",
            Self::AndAssign => "&=",
            Self::OrAssign => "|=",
            Self::XorAssign => "^=",
            Self::ShiftlAssign => "<<=",
            Self::ShiftrAssign => ">>=",
            Self::LogicalNot => "!",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Question => "?",
            Self::Colon => ":",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::OpenRound => "(",
            Self::CloseRound => ")",
            Self::OpenCurly => "{",
            Self::CloseCurly => "}",
            Self::OpenSquare => "[",
            Self::CloseSquare => "]",
            Self::UnterminatedStr | Self::UnterminatedComment => "<error>",
            Self::Comment | Self::MultiLineComment | Self::NewLine | Self::Ignored => "",
        };
        write!(f, "{text}")
    }
}
