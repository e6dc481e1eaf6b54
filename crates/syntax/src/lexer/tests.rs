use super::*;

fn kinds(src: &str) -> Vec<TokenKind> {
  Lexer::lex(src)
    .unwrap_or_else(|e| panic!("lex error: {e:?}"))
    .tokens()
    .iter()
    .map(|t| t.kind)
    .collect()
}

#[test]
fn indent_dedent_balanced() {
  let src = "foresee true:\n    declare(1)\ndeclare(2)\n";
  let kinds = kinds(src);
  let indents = kinds.iter().filter(|k| **k == TokenKind::Indent).count();
  let dedents = kinds.iter().filter(|k| **k == TokenKind::Dedent).count();
  assert_eq!(indents, dedents);
  assert_eq!(indents, 1);
}

#[test]
fn blank_and_comment_lines_do_not_affect_indent() {
  let src = "foresee true:\n    declare(1)\n\n    # a comment\n    declare(2)\ndeclare(3)\n";
  let kinds = kinds(src);
  let indents = kinds.iter().filter(|k| **k == TokenKind::Indent).count();
  let dedents = kinds.iter().filter(|k| **k == TokenKind::Dedent).count();
  assert_eq!(indents, 1);
  assert_eq!(dedents, 1);
}

#[test]
fn tabs_count_as_four_columns() {
  // one tab (4 cols) is deeper than two spaces (2 cols): must be an INDENT.
  let src = "foresee true:\n\tdeclare(1)\n";
  let kinds = kinds(src);
  assert!(kinds.contains(&TokenKind::Indent));
}

#[test]
fn keywords_resolve_from_identifier_regex() {
  let kinds = kinds("designate x = 1\n");
  assert_eq!(kinds[0], TokenKind::Kw_Designate);
  assert_eq!(kinds[1], TokenKind::Lit_Ident);
  assert_eq!(kinds[2], TokenKind::Op_Equal);
}

#[test]
fn multi_char_operators_take_priority_over_prefixes() {
  let kinds = kinds("a ** b // c ?? d\n");
  assert!(kinds.contains(&TokenKind::Op_StarStar));
  assert!(kinds.contains(&TokenKind::Op_SlashSlash));
  assert!(kinds.contains(&TokenKind::Op_QuestionQuestion));
}

#[test]
fn unterminated_string_is_an_error() {
  let err = Lexer::lex("x = \"abc\n").unwrap_err();
  assert!(!err.is_empty());
}

#[test]
fn walrus_and_equal_are_distinct() {
  let kinds = kinds("a := 1\nb = 2\n");
  assert!(kinds.contains(&TokenKind::Op_Walrus));
  assert!(kinds.contains(&TokenKind::Op_Equal));
}

#[test]
fn lex_design_program() {
  let input = indoc::indoc! {r#"
    designate v = 1 + 2 * 3
    declare(v)

    sequence counter(start, step):
        n := start
        cycle while true:
            yield n
            n += step

    entity Animal:
        protocol construct(name):
            self.name = name

    entity Dog inherits Animal:
        protocol construct(name):
            ascend construct(name)

    attempt:
        declare(1 / 0)
    recover e:
        declare("caught")
  "#};

  let lexer = Lexer::lex(input).unwrap_or_else(|e| panic!("lex error: {e:?}"));
  let kinds: Vec<_> = lexer.tokens().iter().map(|t| t.kind).collect();
  assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Kw_Designate).count(), 1);
  assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Kw_Sequence).count(), 1);
  assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Kw_Entity).count(), 2);
  assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Kw_Inherits).count(), 1);
  assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Kw_Ascend).count(), 1);
  assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Kw_Attempt).count(), 1);
  assert_eq!(kinds.iter().filter(|k| **k == TokenKind::Kw_Recover).count(), 1);
  let indents = kinds.iter().filter(|k| **k == TokenKind::Indent).count();
  let dedents = kinds.iter().filter(|k| **k == TokenKind::Dedent).count();
  assert_eq!(indents, dedents);
}
