//! Fragment compilers
//!
//! [`FragmentCompiler`] is the seam to the grammar/statement translator. It
//! must be deterministic and free of side effects. Any
//! `Fn(&str) -> Result<String, SyntaxError>` closure is a compiler.
//!
//! [`StatementCompiler`] is the built-in implementation: it parses a fragment
//! into statements and blocks, then renders each one in sequence.

use crate::error::SyntaxError;

/// Translates one fragment's inner text into target-language statements
pub trait FragmentCompiler: Send + Sync {
    /// Compile `source`. An empty fragment compiles to an empty string.
    fn compile(&self, source: &str) -> Result<String, SyntaxError>;
}

impl<F> FragmentCompiler for F
where
    F: Fn(&str) -> Result<String, SyntaxError> + Send + Sync,
{
    fn compile(&self, source: &str) -> Result<String, SyntaxError> {
        self(source)
    }
}

/// Parsed fragment element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// A single statement without its terminator
    Simple(String),

    /// `head { body }`
    Block { head: String, body: Vec<Statement> },
}

impl Statement {
    fn render(&self, out: &mut String) {
        match self {
            Statement::Simple(text) => {
                out.push_str(text);
                out.push(';');
            }
            Statement::Block { head, body } => {
                if !head.is_empty() {
                    out.push_str(head);
                    out.push(' ');
                }
                out.push('{');
                out.push(' ');
                if !body.is_empty() {
                    render_all(body, out);
                    out.push(' ');
                }
                out.push('}');
            }
        }
    }
}

fn render_all(statements: &[Statement], out: &mut String) {
    for (i, stmt) in statements.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        stmt.render(out);
    }
}

/// Deepest block nesting the built-in compiler accepts
pub const MAX_BLOCK_DEPTH: usize = 256;

/// Built-in statement compiler
///
/// Statements end at a top-level `;` or newline. Newlines inside brackets or
/// string literals do not end a statement. A `{` outside parentheses opens a
/// block, nested at most [`MAX_BLOCK_DEPTH`] deep.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementCompiler;

impl StatementCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Parse a fragment into its statements
    pub fn parse(&self, source: &str) -> Result<Vec<Statement>, SyntaxError> {
        Parser::new(source).parse()
    }
}

impl FragmentCompiler for StatementCompiler {
    fn compile(&self, source: &str) -> Result<String, SyntaxError> {
        let statements = self.parse(source)?;
        let mut out = String::with_capacity(source.len() + statements.len());
        render_all(&statements, &mut out);
        Ok(out)
    }
}

/// Position of an opening bracket or quote, for error reporting
#[derive(Debug, Clone, Copy)]
struct Mark {
    ch: char,
    line: usize,
    column: usize,
}

/// A block whose closing `}` has not been seen yet
struct Frame {
    head: String,
    open: Mark,
    /// Statements preceding the block at the enclosing level
    outer: Vec<Statement>,
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<(char, Mark)> {
        let ch = self.chars.next()?;
        let mark = Mark {
            ch,
            line: self.line,
            column: self.column,
        };
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some((ch, mark))
    }

    /// Parse statements until end of input. Open blocks are kept on an
    /// explicit stack so nesting depth never grows the call stack.
    fn parse(&mut self) -> Result<Vec<Statement>, SyntaxError> {
        let mut frames: Vec<Frame> = Vec::new();
        let mut statements = Vec::new();
        let mut buf = String::new();
        let mut brackets: Vec<Mark> = Vec::new();

        loop {
            let Some((ch, mark)) = self.bump() else {
                if let Some(open) = brackets.last().or(frames.last().map(|f| &f.open)) {
                    return Err(unclosed(*open));
                }
                flush(&mut buf, &mut statements);
                return Ok(statements);
            };

            match ch {
                '"' | '\'' => {
                    buf.push(ch);
                    self.string(mark, &mut buf)?;
                }
                '(' | '[' => {
                    brackets.push(mark);
                    buf.push(ch);
                }
                '{' if brackets.is_empty() => {
                    if frames.len() >= MAX_BLOCK_DEPTH {
                        return Err(SyntaxError::new(
                            format!("blocks nested deeper than {}", MAX_BLOCK_DEPTH),
                            mark.line,
                            mark.column,
                        ));
                    }
                    let head = buf.trim().to_string();
                    buf.clear();
                    frames.push(Frame {
                        head,
                        open: mark,
                        outer: std::mem::take(&mut statements),
                    });
                }
                '{' => {
                    brackets.push(mark);
                    buf.push(ch);
                }
                ')' | ']' | '}' => match brackets.pop() {
                    Some(open) if closes(open.ch) == ch => buf.push(ch),
                    Some(open) => {
                        return Err(SyntaxError::new(
                            format!("expected '{}' but found '{}'", closes(open.ch), ch),
                            mark.line,
                            mark.column,
                        ))
                    }
                    None => match frames.pop() {
                        Some(frame) if ch == '}' => {
                            flush(&mut buf, &mut statements);
                            let body = std::mem::replace(&mut statements, frame.outer);
                            statements.push(Statement::Block {
                                head: frame.head,
                                body,
                            });
                        }
                        _ => {
                            return Err(SyntaxError::new(
                                format!("unexpected '{}'", ch),
                                mark.line,
                                mark.column,
                            ))
                        }
                    },
                },
                ';' | '\n' if brackets.is_empty() => flush(&mut buf, &mut statements),
                _ => buf.push(ch),
            }
        }
    }

    /// Consume a string literal body up to and including its closing quote
    fn string(&mut self, open: Mark, buf: &mut String) -> Result<(), SyntaxError> {
        let mut escaped = false;
        while let Some((ch, _)) = self.bump() {
            buf.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open.ch {
                return Ok(());
            }
        }
        Err(SyntaxError::new(
            "unterminated string literal",
            open.line,
            open.column,
        ))
    }
}

fn closes(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn unclosed(open: Mark) -> SyntaxError {
    SyntaxError::new(format!("unclosed '{}'", open.ch), open.line, open.column)
}

fn flush(buf: &mut String, statements: &mut Vec<Statement>) {
    let text = buf.trim();
    if !text.is_empty() {
        statements.push(Statement::Simple(text.to_string()));
    }
    buf.clear();
}
