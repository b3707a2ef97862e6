//! A small YANG front-end: enough of RFC 7950 section 6 to read the
//! statement tree and pull out module headers and linkage.

use crate::error::SchemaError;

/// One YANG statement with its substatements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Keyword, including any extension prefix (`ext:foo`).
    pub keyword: String,
    pub argument: Option<String>,
    /// Line the keyword is on, 1-based.
    pub line: usize,
    pub substatements: Vec<Statement>,
}

impl Statement {
    /// Substatements with the given keyword.
    pub fn children<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Statement> + 'a {
        self.substatements
            .iter()
            .filter(move |s| s.keyword == keyword)
    }
}

/// Whether a file holds a module or a submodule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Module,
    Submodule,
}

/// Header and linkage statements of a module or submodule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YangModule {
    pub kind: ModuleKind,
    pub name: String,
    /// `revision` arguments, in file order (normally newest first).
    pub revisions: Vec<String>,
    pub imports: Vec<String>,
    pub includes: Vec<String>,
    /// Parent module of a submodule.
    pub belongs_to: Option<String>,
}

impl YangModule {
    /// Parse module text. `file` is only used in error messages.
    pub fn parse(text: &str, file: &str) -> Result<Self, SchemaError> {
        let statements = parse_statements(text, file)?;
        let top = statements.first().ok_or_else(|| SchemaError::Parse {
            file: file.to_string(),
            line: 1,
            message: "no statements".to_string(),
        })?;

        let kind = match top.keyword.as_str() {
            "module" => ModuleKind::Module,
            "submodule" => ModuleKind::Submodule,
            other => {
                return Err(SchemaError::Parse {
                    file: file.to_string(),
                    line: top.line,
                    message: format!("expected module or submodule, found '{}'", other),
                });
            }
        };
        let name = top.argument.clone().ok_or_else(|| SchemaError::Parse {
            file: file.to_string(),
            line: top.line,
            message: format!("{} without a name", top.keyword),
        })?;

        let args = |keyword: &str| -> Vec<String> {
            top.children(keyword)
                .filter_map(|s| s.argument.clone())
                .collect()
        };

        Ok(Self {
            kind,
            name,
            revisions: args("revision"),
            imports: args("import"),
            includes: args("include"),
            belongs_to: args("belongs-to").into_iter().next(),
        })
    }

    /// The most recent revision date.
    pub fn latest_revision(&self) -> Option<&str> {
        // Dates are YYYY-MM-DD so string order is date order
        self.revisions.iter().map(String::as_str).max()
    }

    /// Imported and included module names.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.imports
            .iter()
            .chain(self.includes.iter())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Unquoted or quoted (and concatenated) string.
    Str(String),
    Open,
    Close,
    Semi,
}

/// Parse text into its top-level statements.
pub fn parse_statements(text: &str, file: &str) -> Result<Vec<Statement>, SchemaError> {
    let tokens = tokenize(text, file)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        file,
    };
    let mut statements = Vec::new();
    while parser.pos < parser.tokens.len() {
        statements.push(parser.statement()?);
    }
    Ok(statements)
}

struct Parser<'a> {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    file: &'a str,
}

impl Parser<'_> {
    fn error(&self, line: usize, message: impl Into<String>) -> SchemaError {
        SchemaError::Parse {
            file: self.file.to_string(),
            line,
            message: message.into(),
        }
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map(|(_, l)| *l).unwrap_or(1)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn statement(&mut self) -> Result<Statement, SchemaError> {
        let (keyword, line) = match self.next() {
            Some((Token::Str(s), line)) => (s, line),
            Some((t, line)) => return Err(self.error(line, format!("expected keyword, found {:?}", t))),
            None => return Err(self.error(self.last_line(), "unexpected end of input")),
        };

        let mut argument = None;
        let mut terminator = self.next();
        if let Some((Token::Str(arg), _)) = terminator {
            argument = Some(arg);
            terminator = self.next();
        }

        let mut substatements = Vec::new();
        match terminator {
            Some((Token::Semi, _)) => {}
            Some((Token::Open, _)) => loop {
                match self.tokens.get(self.pos) {
                    Some((Token::Close, _)) => {
                        self.pos += 1;
                        break;
                    }
                    Some(_) => substatements.push(self.statement()?),
                    None => {
                        return Err(self.error(
                            self.last_line(),
                            format!("unterminated block for '{}' at line {}", keyword, line),
                        ));
                    }
                }
            },
            Some((t, l)) => {
                return Err(self.error(l, format!("expected ';' or '{{' after '{}', found {:?}", keyword, t)));
            }
            None => return Err(self.error(self.last_line(), "unexpected end of input")),
        }

        Ok(Statement {
            keyword,
            argument,
            line,
            substatements,
        })
    }
}

fn tokenize(text: &str, file: &str) -> Result<Vec<(Token, usize)>, SchemaError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let chars: Vec<char> = text.chars().collect();
    let mut tokens: Vec<(Token, usize)> = Vec::new();
    let mut line = 1;
    let mut i = 0;

    let error = |line: usize, message: &str| SchemaError::Parse {
        file: file.to_string(),
        line,
        message: message.to_string(),
    };

    // Set after a quoted string; a following '+' concatenates
    let mut after_quoted = false;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let start = line;
                i += 2;
                loop {
                    match chars.get(i) {
                        None => return Err(error(start, "unterminated comment")),
                        Some('*') if chars.get(i + 1) == Some(&'/') => {
                            i += 2;
                            break;
                        }
                        Some('\n') => line += 1,
                        Some(_) => {}
                    }
                    i += 1;
                }
            }
            '{' | '}' | ';' => {
                let token = match c {
                    '{' => Token::Open,
                    '}' => Token::Close,
                    _ => Token::Semi,
                };
                tokens.push((token, line));
                after_quoted = false;
                i += 1;
            }
            '+' if after_quoted => {
                // Concatenation: the next token must be a quoted string
                i += 1;
                while i < chars.len() && chars[i].is_whitespace() {
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    i += 1;
                }
                let Some(&(quote @ ('"' | '\''))) = chars.get(i) else {
                    return Err(error(line, "'+' not followed by a quoted string"));
                };
                let (part, next, lines) = quoted(&chars, i, quote).ok_or_else(|| error(line, "unterminated string"))?;
                line += lines;
                i = next;
                if let Some((Token::Str(s), _)) = tokens.last_mut() {
                    s.push_str(&part);
                }
            }
            '"' | '\'' => {
                let start = line;
                let (s, next, lines) = quoted(&chars, i, c).ok_or_else(|| error(start, "unterminated string"))?;
                line += lines;
                i = next;
                tokens.push((Token::Str(s), start));
                after_quoted = true;
            }
            _ => {
                let start = i;
                while i < chars.len() {
                    let c = chars[i];
                    if c.is_whitespace() || matches!(c, '{' | '}' | ';' | '"' | '\'') {
                        break;
                    }
                    if c == '/' && matches!(chars.get(i + 1), Some('/') | Some('*')) {
                        break;
                    }
                    i += 1;
                }
                tokens.push((Token::Str(chars[start..i].iter().collect()), line));
                after_quoted = false;
            }
        }
    }

    Ok(tokens)
}

/// Read a quoted string starting at `chars[start] == quote`.
///
/// Returns the content, the index after the closing quote and the number
/// of newlines consumed.
fn quoted(chars: &[char], start: usize, quote: char) -> Option<(String, usize, usize)> {
    let mut out = String::new();
    let mut lines = 0;
    let mut i = start + 1;
    loop {
        let c = *chars.get(i)?;
        if c == '\n' {
            lines += 1;
        }
        if c == quote {
            return Some((out, i + 1, lines));
        }
        if quote == '"' && c == '\\' {
            let escaped = *chars.get(i + 1)?;
            match escaped {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
            i += 2;
            continue;
        }
        out.push(c);
        i += 1;
    }
}
