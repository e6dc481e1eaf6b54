#![allow(non_camel_case_types)]

use std::fmt;

use beef::lean::Cow;
use logos::Logos;
use span::Span;

/// A single token in the stream. INDENT/DEDENT/NEWLINE/EOF/ERROR are
/// synthetic: they carry an empty lexeme and a zero-length span at the
/// position where they were produced.
#[derive(Clone, Debug)]
pub struct Token<'src> {
  pub lexeme: Cow<'src, str>,
  pub kind: TokenKind,
  pub span: Span,
  pub line: usize,
  pub column: usize,
}

pub struct Lexer<'src> {
  tokens: Vec<Token<'src>>,
}

#[derive(Debug)]
pub struct Error {
  pub span: Span,
  pub message: String,
}

impl<'src> Lexer<'src> {
  pub fn lex(src: &'src str) -> Result<Self, Vec<Error>> {
    let tokens = tokenize(src)?;
    Ok(Lexer { tokens })
  }

  pub fn tokens(&self) -> &[Token<'src>] {
    &self.tokens
  }

  pub fn get(&self, pos: usize) -> Option<&Token<'src>> {
    self.tokens.get(pos)
  }

  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }
}

fn column_width(ws: &str) -> usize {
  ws.chars().map(|c| if c == '\t' { 4 } else { 1 }).sum()
}

/// Runs a mechanical `logos` classification pass over the raw source (one
/// `Raw` variant per keyword/literal/operator/bracket, plus hidden markers
/// for line breaks, horizontal whitespace runs and comments), then a second
/// pass that tracks the indentation stack and synthesizes
/// INDENT/DEDENT/NEWLINE/EOF tokens from those markers.
fn tokenize(src: &str) -> Result<Vec<Token<'_>>, Vec<Error>> {
  let mut errors = Vec::new();
  let mut out = Vec::new();
  let mut indent_stack = vec![0usize];

  let mut at_line_start = true;
  let mut pending_cols = 0usize;
  let mut line = 1usize;
  let mut line_start_byte = 0usize;
  let mut last_was_newline = false;

  let mut raw = Raw::lexer(src);
  while let Some(kind) = raw.next() {
    let lexeme = raw.slice();
    let span: Span = raw.span().into();

    match kind {
      Raw::Indent => {
        if at_line_start {
          pending_cols = column_width(lexeme);
        }
      }
      Raw::Comment => {}
      Raw::Newline => {
        out.push(Token {
          lexeme: Cow::borrowed(""),
          kind: TokenKind::Newline,
          span: (span.start..span.start).into(),
          line,
          column: span.start - line_start_byte + 1,
        });
        last_was_newline = true;
        at_line_start = true;
        pending_cols = 0;
        line += 1;
        line_start_byte = span.end;
      }
      Raw::Error => {
        errors.push(Error {
          span,
          message: format!("unexpected character `{lexeme}`"),
        });
      }
      content => {
        if at_line_start {
          if let Err(e) = apply_indent(&mut indent_stack, pending_cols, span, line) {
            errors.push(e);
          }
          at_line_start = false;
        }
        last_was_newline = false;
        out.push(Token {
          lexeme: lexeme.into(),
          kind: classify(content, lexeme),
          span,
          line,
          column: span.start - line_start_byte + 1,
        });
      }
    }
  }

  let eof: Span = (src.len()..src.len()).into();
  if !last_was_newline && !out.is_empty() {
    out.push(Token {
      lexeme: Cow::borrowed(""),
      kind: TokenKind::Newline,
      span: eof,
      line,
      column: src.len() - line_start_byte + 1,
    });
  }
  while indent_stack.len() > 1 {
    indent_stack.pop();
    out.push(Token {
      lexeme: Cow::borrowed(""),
      kind: TokenKind::Dedent,
      span: eof,
      line,
      column: 1,
    });
  }
  out.push(Token {
    lexeme: Cow::borrowed(""),
    kind: TokenKind::Eof,
    span: eof,
    line,
    column: 1,
  });

  if !errors.is_empty() {
    Err(errors)
  } else {
    Ok(out)
  }
}

fn apply_indent(stack: &mut Vec<usize>, cols: usize, span: Span, line: usize) -> Result<(), Error> {
  use std::cmp::Ordering;
  match cols.cmp(stack.last().unwrap()) {
    Ordering::Greater => {
      stack.push(cols);
    }
    Ordering::Less => {
      while cols < *stack.last().unwrap() {
        stack.pop();
      }
      if cols != *stack.last().unwrap() {
        return Err(Error {
          span,
          message: format!("inconsistent dedent on line {line}"),
        });
      }
    }
    Ordering::Equal => {}
  }
  Ok(())
}

/// Closed set of token kinds, including the synthetic INDENT/DEDENT/NEWLINE/
/// EOF/ERROR kinds produced only by the second lexing pass (never by
/// `logos` directly).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
  // Keywords
  Kw_Designate,
  Kw_Foresee,
  Kw_Alternate,
  Kw_Otherwise,
  Kw_Cycle,
  Kw_While,
  Kw_Through,
  Kw_From,
  Kw_To,
  Kw_As,
  Kw_Where,
  Kw_For,
  Kw_Yield,
  Kw_Delegate,
  Kw_Ascend,
  Kw_Manifest,
  Kw_Situation,
  Kw_Alignment,
  Kw_Attempt,
  Kw_Recover,
  Kw_Scheme,
  Kw_Execute,
  Kw_Preview,
  Kw_Override,
  Kw_Absolute,
  Kw_Anomaly,
  Kw_Protocol,
  Kw_Sequence,
  Kw_Async,
  Kw_Entity,
  Kw_Inherits,
  Kw_Self,
  Kw_And,
  Kw_Or,
  Kw_Not,
  Kw_Await,
  Kw_Return,
  Kw_Break,
  Kw_Continue,
  Kw_Pass,
  Kw_Import,

  // Brackets
  Brk_CurlyL,
  Brk_CurlyR,
  Brk_ParenL,
  Brk_ParenR,
  Brk_SquareL,
  Brk_SquareR,

  // Punctuation
  Op_Dot,
  Tok_Comma,
  Tok_Colon,
  Tok_Question,
  Op_Arrow,
  Op_Spread,

  // Assignment
  Op_Equal,
  Op_Walrus,
  Op_PlusEqual,
  Op_MinusEqual,
  Op_StarEqual,
  Op_SlashEqual,
  Op_PercentEqual,
  Op_StarStarEqual,
  Op_QuestionQuestionEqual,

  // Operators
  Op_Plus,
  Op_Minus,
  Op_Star,
  Op_StarStar,
  Op_Slash,
  Op_SlashSlash,
  Op_Percent,
  Op_EqualEqual,
  Op_BangEqual,
  Op_More,
  Op_MoreEqual,
  Op_Less,
  Op_LessEqual,
  Op_QuestionQuestion,

  // Literals
  Lit_Null,
  Lit_Bool,
  Lit_Number,
  Lit_String,
  Lit_Ident,

  // Synthetic
  Indent,
  Dedent,
  Newline,
  Eof,
  Error,
}

const KEYWORDS: &[(&str, TokenKind)] = &[
  ("designate", TokenKind::Kw_Designate),
  ("foresee", TokenKind::Kw_Foresee),
  ("alternate", TokenKind::Kw_Alternate),
  ("otherwise", TokenKind::Kw_Otherwise),
  ("cycle", TokenKind::Kw_Cycle),
  ("while", TokenKind::Kw_While),
  ("through", TokenKind::Kw_Through),
  ("from", TokenKind::Kw_From),
  ("to", TokenKind::Kw_To),
  ("as", TokenKind::Kw_As),
  ("where", TokenKind::Kw_Where),
  ("for", TokenKind::Kw_For),
  ("yield", TokenKind::Kw_Yield),
  ("delegate", TokenKind::Kw_Delegate),
  ("ascend", TokenKind::Kw_Ascend),
  ("manifest", TokenKind::Kw_Manifest),
  ("situation", TokenKind::Kw_Situation),
  ("alignment", TokenKind::Kw_Alignment),
  ("attempt", TokenKind::Kw_Attempt),
  ("recover", TokenKind::Kw_Recover),
  ("scheme", TokenKind::Kw_Scheme),
  ("execute", TokenKind::Kw_Execute),
  ("preview", TokenKind::Kw_Preview),
  ("override", TokenKind::Kw_Override),
  ("absolute", TokenKind::Kw_Absolute),
  ("anomaly", TokenKind::Kw_Anomaly),
  ("protocol", TokenKind::Kw_Protocol),
  ("sequence", TokenKind::Kw_Sequence),
  ("async", TokenKind::Kw_Async),
  ("entity", TokenKind::Kw_Entity),
  ("inherits", TokenKind::Kw_Inherits),
  ("self", TokenKind::Kw_Self),
  ("and", TokenKind::Kw_And),
  ("or", TokenKind::Kw_Or),
  ("not", TokenKind::Kw_Not),
  ("await", TokenKind::Kw_Await),
  ("return", TokenKind::Kw_Return),
  ("break", TokenKind::Kw_Break),
  ("continue", TokenKind::Kw_Continue),
  ("pass", TokenKind::Kw_Pass),
  ("import", TokenKind::Kw_Import),
  ("null", TokenKind::Lit_Null),
  ("true", TokenKind::Lit_Bool),
  ("false", TokenKind::Lit_Bool),
];

fn keyword_of(lexeme: &str) -> Option<TokenKind> {
  KEYWORDS
    .iter()
    .find(|(kw, _)| *kw == lexeme)
    .map(|(_, kind)| *kind)
}

fn classify(raw: Raw, lexeme: &str) -> TokenKind {
  use TokenKind as T;
  match raw {
    Raw::Ident => keyword_of(lexeme).unwrap_or(T::Lit_Ident),
    Raw::Number => T::Lit_Number,
    Raw::String => T::Lit_String,
    Raw::CurlyL => T::Brk_CurlyL,
    Raw::CurlyR => T::Brk_CurlyR,
    Raw::ParenL => T::Brk_ParenL,
    Raw::ParenR => T::Brk_ParenR,
    Raw::SquareL => T::Brk_SquareL,
    Raw::SquareR => T::Brk_SquareR,
    Raw::Spread => T::Op_Spread,
    Raw::Dot => T::Op_Dot,
    Raw::Comma => T::Tok_Comma,
    Raw::Walrus => T::Op_Walrus,
    Raw::Colon => T::Tok_Colon,
    Raw::Question => T::Tok_Question,
    Raw::Arrow => T::Op_Arrow,
    Raw::StarStarEqual => T::Op_StarStarEqual,
    Raw::QuestionQuestionEqual => T::Op_QuestionQuestionEqual,
    Raw::PlusEqual => T::Op_PlusEqual,
    Raw::MinusEqual => T::Op_MinusEqual,
    Raw::StarEqual => T::Op_StarEqual,
    Raw::SlashEqual => T::Op_SlashEqual,
    Raw::PercentEqual => T::Op_PercentEqual,
    Raw::EqualEqual => T::Op_EqualEqual,
    Raw::Equal => T::Op_Equal,
    Raw::BangEqual => T::Op_BangEqual,
    Raw::StarStar => T::Op_StarStar,
    Raw::Plus => T::Op_Plus,
    Raw::Minus => T::Op_Minus,
    Raw::Star => T::Op_Star,
    Raw::SlashSlash => T::Op_SlashSlash,
    Raw::Slash => T::Op_Slash,
    Raw::Percent => T::Op_Percent,
    Raw::MoreEqual => T::Op_MoreEqual,
    Raw::More => T::Op_More,
    Raw::LessEqual => T::Op_LessEqual,
    Raw::Less => T::Op_Less,
    Raw::QuestionQuestion => T::Op_QuestionQuestion,
    Raw::Newline | Raw::Indent | Raw::Comment | Raw::Error => {
      unreachable!("handled before classify() is called")
    }
  }
}

/// Mechanical classification produced directly by `logos`. Keywords are not
/// distinguished from identifiers at this layer — `classify` resolves
/// `Ident` against the keyword table using the matched lexeme, folding
/// `true`/`false` onto one `Lit_Bool` variant.
#[derive(Clone, Copy, Debug, Logos)]
enum Raw {
  #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
  Ident,

  #[regex(r"[0-9]+(\.[0-9]+)?([Ee][+-]?[0-9]+)?")]
  Number,
  #[regex(r#""([^"\\]|\\.)*""#)]
  #[regex(r"'([^'\\]|\\.)*'")]
  String,

  #[token("{")]
  CurlyL,
  #[token("}")]
  CurlyR,
  #[token("(")]
  ParenL,
  #[token(")")]
  ParenR,
  #[token("[")]
  SquareL,
  #[token("]")]
  SquareR,

  #[token("...")]
  Spread,
  #[token(".")]
  Dot,
  #[token(",")]
  Comma,
  #[token(":=")]
  Walrus,
  #[token(":")]
  Colon,
  #[token("?")]
  Question,
  #[token("=>")]
  Arrow,

  #[token("**=")]
  StarStarEqual,
  #[token("??=")]
  QuestionQuestionEqual,
  #[token("+=")]
  PlusEqual,
  #[token("-=")]
  MinusEqual,
  #[token("*=")]
  StarEqual,
  #[token("/=")]
  SlashEqual,
  #[token("%=")]
  PercentEqual,
  #[token("==")]
  EqualEqual,
  #[token("=")]
  Equal,
  #[token("!=")]
  BangEqual,

  #[token("**")]
  StarStar,
  #[token("+")]
  Plus,
  #[token("-")]
  Minus,
  #[token("*")]
  Star,
  #[token("//")]
  SlashSlash,
  #[token("/")]
  Slash,
  #[token("%")]
  Percent,
  #[token(">=")]
  MoreEqual,
  #[token(">")]
  More,
  #[token("<=")]
  LessEqual,
  #[token("<")]
  Less,
  #[token("??")]
  QuestionQuestion,

  /// Captured (not skipped) so the indent tracker can measure the run of
  /// spaces/tabs that follows a newline; interior runs are simply ignored
  /// once matched.
  #[doc(hidden)]
  #[regex(r"[ \t]+")]
  Indent,
  #[doc(hidden)]
  #[regex(r"\r?\n")]
  Newline,
  #[doc(hidden)]
  #[regex(r"#[^\n]*", logos::skip)]
  Comment,

  #[doc(hidden)]
  #[error]
  Error,
}

impl<'src> fmt::Debug for Lexer<'src> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    struct DebugToken<'a, 'src>(&'a Token<'src>);
    impl<'a, 'src> fmt::Debug for DebugToken<'a, 'src> {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if matches!(self.0.kind, TokenKind::Lit_Ident) {
          write!(f, "({:?} `{}` @{})", self.0.kind, self.0.lexeme, self.0.span)
        } else {
          write!(f, "({:?} @{})", self.0.kind, self.0.span)
        }
      }
    }

    self.tokens.iter().map(DebugToken).collect::<Vec<_>>().fmt(f)
  }
}

#[cfg(test)]
mod tests;
