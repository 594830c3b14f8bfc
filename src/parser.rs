//! Parser for `.tmc` decision-procedure programs, built on `pest`. The
//! grammar lives in `grammar.pest`; this module walks the pair tree into
//! the AST the compiler consumes.

use crate::ast::{BinOp, Expr, Program, Stmt};
use crate::types::{CompileError, Direction, Symbol, BLANK};
use pest::{
    error::{Error, ErrorVariant},
    iterators::Pair,
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use std::collections::{BTreeMap, BTreeSet};

/// True for the keyword tokens the grammar emits alongside the semantic
/// pairs; the walkers below skip them.
fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_alphabet
            | Rule::kw_input
            | Rule::kw_markers
            | Rule::kw_return
            | Rule::kw_write
            | Rule::kw_inc
            | Rule::kw_append
            | Rule::kw_scan
            | Rule::kw_for
            | Rule::kw_in
            | Rule::kw_if
            | Rule::kw_else
            | Rule::kw_loop
            | Rule::kw_let
            | Rule::kw_count
    )
}

/// The semantic children of a pair, keyword tokens filtered out.
fn children(pair: Pair<Rule>) -> impl Iterator<Item = Pair<Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

/// Derives the pest parser for the grammar in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct SourceParser;

/// Parses a program source into an AST.
///
/// This is the main entry point for parsing decision-procedure programs.
/// It trims the input, parses it with the `SourceParser`, and walks the
/// resulting pair tree into a structured `Program`. The first occurrence
/// of a name on the left of `=` acts as its declaration, so no symbol
/// table is needed here.
///
/// # Arguments
///
/// * `input` - A string slice containing the program source.
///
/// # Returns
///
/// * `Ok(Program)` if the input is a well-formed program.
/// * `Err(CompileError::Parse)` if there are any syntax errors.
pub fn parse(input: &str) -> Result<Program, CompileError> {
    let root = SourceParser::parse(Rule::program, input.trim())
        .map_err(|e| CompileError::Parse(Box::new(e)))?
        .next()
        .unwrap();

    parse_program(root)
}

/// Parses the top-level structure of a program from a `Pair<Rule::program>`.
///
/// Alphabet and marker declarations may appear anywhere at the top level
/// and are merged into their sets; every other item is a statement and is
/// collected in order into the program body.
fn parse_program(pair: Pair<Rule>) -> Result<Program, CompileError> {
    let mut program = Program::default();

    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::alphabet_decl => {
                program.input_alphabet.extend(parse_decl_symbols(p));
            }
            Rule::markers_decl => {
                program.markers.extend(parse_decl_symbols(p));
            }
            Rule::EOI => {}
            _ => program.body.push(parse_stmt(p)?),
        }
    }

    Ok(program)
}

/// Extracts the symbols of an `alphabet input:` or `markers:` declaration.
fn parse_decl_symbols(pair: Pair<Rule>) -> Vec<Symbol> {
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::sym_list)
        .map(parse_sym_list)
        .unwrap_or_default()
}

/// Parses the symbols of a bracketed `[a, b, _]` list.
fn parse_sym_list(pair: Pair<Rule>) -> Vec<Symbol> {
    pair.into_inner().map(|p| parse_symbol(p.as_str())).collect()
}

/// Maps a source symbol token to its tape symbol; `_` denotes the blank.
fn parse_symbol(text: &str) -> Symbol {
    match text {
        "_" => BLANK,
        _ => text.chars().next().unwrap_or(BLANK),
    }
}

/// Parses a single statement from its concrete grammar rule.
///
/// Each statement kind has its own rule, so this dispatches on the rule
/// and extracts the semantic children. The grammar has already settled
/// the ambiguous `if` forms: two plain identifiers around `==` become an
/// if-equal, a single symbol before `{` becomes an if-current, and
/// everything else is a general comparison.
///
/// # Arguments
///
/// * `pair` - A pair produced by one of the statement rules.
///
/// # Returns
///
/// * `Ok(Stmt)` with the corresponding AST variant.
/// * `Err(CompileError::Parse)` if a nested expression is malformed.
fn parse_stmt(pair: Pair<Rule>) -> Result<Stmt, CompileError> {
    match pair.as_rule() {
        Rule::return_stmt => {
            let expr = parse_expr(children(pair).next().unwrap())?;
            Ok(Stmt::Return(expr))
        }
        Rule::accept_stmt => Ok(Stmt::Accept),
        Rule::reject_stmt => Ok(Stmt::Reject),
        Rule::break_stmt => Ok(Stmt::Break),
        Rule::move_stmt => {
            let dir = parse_direction(pair.into_inner().next().unwrap());
            Ok(Stmt::Move(dir))
        }
        Rule::write_stmt => {
            let sym = parse_symbol(children(pair).next().unwrap().as_str());
            Ok(Stmt::Write(sym))
        }
        Rule::inc_stmt => {
            let name = children(pair).next().unwrap().as_str().to_string();
            Ok(Stmt::Inc(name))
        }
        Rule::append_stmt => {
            let mut inner = children(pair);
            let src = inner.next().unwrap().as_str().to_string();
            let dst = inner.next().unwrap().as_str().to_string();
            Ok(Stmt::Append { src, dst })
        }
        Rule::scan_stmt => {
            let mut inner = children(pair);
            let direction = parse_direction(inner.next().unwrap());
            let stops = inner.next().unwrap();
            let stop_symbols: BTreeSet<Symbol> = match stops.as_rule() {
                Rule::sym_list => parse_sym_list(stops).into_iter().collect(),
                _ => [parse_symbol(stops.as_str())].into_iter().collect(),
            };
            Ok(Stmt::Scan {
                direction,
                stop_symbols,
            })
        }
        Rule::loop_stmt => {
            let body = parse_block(children(pair).next().unwrap())?;
            Ok(Stmt::Loop { body })
        }
        Rule::for_stmt => {
            let mut inner = children(pair);
            let var = inner.next().unwrap().as_str().to_string();
            let start = parse_expr(inner.next().unwrap())?;
            let end = parse_expr(inner.next().unwrap())?;
            let body = parse_block(inner.next().unwrap())?;
            Ok(Stmt::For {
                var,
                start,
                end,
                body,
            })
        }
        Rule::if_eq_stmt => {
            let mut inner = children(pair);
            let left = inner.next().unwrap().as_str().to_string();
            let right = inner.next().unwrap().as_str().to_string();
            let then_body = parse_block(inner.next().unwrap())?;
            let else_body = match inner.next() {
                Some(p) => parse_else_block(p)?,
                None => Vec::new(),
            };
            Ok(Stmt::IfEqual {
                left,
                right,
                then_body,
                else_body,
            })
        }
        Rule::if_current_stmt => {
            let mut branches = BTreeMap::new();
            let mut else_body = Vec::new();
            let mut inner = children(pair);

            let first_sym = parse_symbol(inner.next().unwrap().as_str());
            branches.insert(first_sym, parse_block(inner.next().unwrap())?);

            for p in inner {
                match p.as_rule() {
                    Rule::else_if => {
                        let mut ei = children(p);
                        let sym = parse_symbol(ei.next().unwrap().as_str());
                        branches.insert(sym, parse_block(ei.next().unwrap())?);
                    }
                    Rule::else_block => else_body = parse_else_block(p)?,
                    _ => {}
                }
            }

            Ok(Stmt::IfCurrent {
                branches,
                else_body,
            })
        }
        Rule::if_stmt => {
            let mut inner = children(pair);
            let condition = parse_expr(inner.next().unwrap())?;
            let then_body = parse_block(inner.next().unwrap())?;
            let else_body = match inner.next() {
                Some(p) => parse_else_block(p)?,
                None => Vec::new(),
            };
            Ok(Stmt::If {
                condition,
                then_body,
                else_body,
            })
        }
        Rule::let_stmt => {
            let mut inner = children(pair);
            let name = inner.next().unwrap().as_str().to_string();
            let init = parse_expr(inner.next().unwrap())?;
            Ok(Stmt::Let { name, init })
        }
        Rule::assign_stmt => {
            let mut inner = pair.into_inner();
            let name = inner.next().unwrap().as_str().to_string();
            let value = parse_expr(inner.next().unwrap())?;
            Ok(Stmt::Assign { name, value })
        }
        other => unreachable!("statement rule {:?}", other),
    }
}

/// Unwraps the block of an `else { .. }` clause.
fn parse_else_block(pair: Pair<Rule>) -> Result<Vec<Stmt>, CompileError> {
    parse_block(children(pair).next().unwrap())
}

/// Parses the statements of a braced block, in order.
fn parse_block(pair: Pair<Rule>) -> Result<Vec<Stmt>, CompileError> {
    pair.into_inner().map(parse_stmt).collect()
}

/// Parses a `left` / `right` direction token.
fn parse_direction(pair: Pair<Rule>) -> Direction {
    match pair.as_str() {
        "left" => Direction::Left,
        _ => Direction::Right,
    }
}

/// Parses an expression from a `Pair<Rule::expr>`.
///
/// An expression is an additive chain, optionally followed by a single
/// comparison operator and a second additive chain; comparisons do not
/// associate.
///
/// # Arguments
///
/// * `pair` - A pair produced by the `expr` rule.
///
/// # Returns
///
/// * `Ok(Expr)` for the parsed expression tree.
/// * `Err(CompileError::Parse)` if a literal is out of range.
fn parse_expr(pair: Pair<Rule>) -> Result<Expr, CompileError> {
    let mut inner = pair.into_inner();
    let left = parse_add_expr(inner.next().unwrap())?;

    match inner.next() {
        Some(op_pair) => {
            let op = match op_pair.as_str() {
                "==" => BinOp::Eq,
                "!=" => BinOp::Ne,
                "<" => BinOp::Lt,
                "<=" => BinOp::Le,
                ">" => BinOp::Gt,
                ">=" => BinOp::Ge,
                other => unreachable!("comparison operator {:?}", other),
            };
            let right = parse_add_expr(inner.next().unwrap())?;
            Ok(Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            })
        }
        None => Ok(left),
    }
}

/// Parses a left-associative chain of `+` / `-` over primaries.
fn parse_add_expr(pair: Pair<Rule>) -> Result<Expr, CompileError> {
    let mut inner = pair.into_inner();
    let mut left = parse_primary(inner.next().unwrap())?;

    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str() {
            "+" => BinOp::Add,
            _ => BinOp::Sub,
        };
        let right = parse_primary(inner.next().unwrap())?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }

    Ok(left)
}

/// Parses a primary expression: a `count()` call, an integer literal, a
/// variable reference, or a parenthesized expression.
fn parse_primary(pair: Pair<Rule>) -> Result<Expr, CompileError> {
    match pair.as_rule() {
        Rule::count_expr => {
            let sym = parse_symbol(children(pair).next().unwrap().as_str());
            Ok(Expr::Count(sym))
        }
        Rule::int_lit => {
            let span = pair.as_span();
            let value = pair
                .as_str()
                .parse::<u32>()
                .map_err(|_| parse_error("integer literal out of range", span))?;
            Ok(Expr::Int(value))
        }
        Rule::var_ref => Ok(Expr::Var(pair.as_str().to_string())),
        Rule::expr => parse_expr(pair),
        other => unreachable!("primary rule {:?}", other),
    }
}

/// Creates a `CompileError::Parse` carrying a message and a source span.
fn parse_error(msg: &str, span: Span) -> CompileError {
    CompileError::Parse(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_program() {
        let input = r#"
alphabet input: [a, b]
n = count(a)
return count(b) == n
"#;

        let program = parse(input).unwrap();
        assert!(program.input_alphabet.contains(&'a'));
        assert!(program.input_alphabet.contains(&'b'));
        assert_eq!(program.body.len(), 2);

        assert_eq!(
            program.body[0],
            Stmt::Assign {
                name: "n".to_string(),
                value: Expr::Count('a'),
            }
        );
        match &program.body[1] {
            Stmt::Return(Expr::Binary { op, left, right }) => {
                assert_eq!(*op, BinOp::Eq);
                assert_eq!(**left, Expr::Count('b'));
                assert_eq!(**right, Expr::Var("n".to_string()));
            }
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_let_and_assign() {
        let program = parse("let x = 3\nx = x + y").unwrap();
        assert_eq!(
            program.body[0],
            Stmt::Let {
                name: "x".to_string(),
                init: Expr::Int(3),
            }
        );
        match &program.body[1] {
            Stmt::Assign { name, value } => {
                assert_eq!(name, "x");
                assert_eq!(
                    *value,
                    Expr::Binary {
                        op: BinOp::Add,
                        left: Box::new(Expr::Var("x".to_string())),
                        right: Box::new(Expr::Var("y".to_string())),
                    }
                );
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_for_loop() {
        let program = parse("for i in 1..n { inc i }").unwrap();
        match &program.body[0] {
            Stmt::For {
                var,
                start,
                end,
                body,
            } => {
                assert_eq!(var, "i");
                assert_eq!(*start, Expr::Int(1));
                assert_eq!(*end, Expr::Var("n".to_string()));
                assert_eq!(body.len(), 1);
                assert_eq!(body[0], Stmt::Inc("i".to_string()));
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_equal_on_variables() {
        let program = parse("if n == z { accept } else { reject }").unwrap();
        match &program.body[0] {
            Stmt::IfEqual {
                left,
                right,
                then_body,
                else_body,
            } => {
                assert_eq!(left, "n");
                assert_eq!(right, "z");
                assert_eq!(then_body, &vec![Stmt::Accept]);
                assert_eq!(else_body, &vec![Stmt::Reject]);
            }
            other => panic!("expected if-equal, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_current_with_else_if() {
        let program = parse("if a { left } else if b { right } else { reject }").unwrap();
        match &program.body[0] {
            Stmt::IfCurrent {
                branches,
                else_body,
            } => {
                assert_eq!(branches[&'a'], vec![Stmt::Move(Direction::Left)]);
                assert_eq!(branches[&'b'], vec![Stmt::Move(Direction::Right)]);
                assert_eq!(else_body, &vec![Stmt::Reject]);
            }
            other => panic!("expected if-current, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_general_comparison_falls_through() {
        // `count` is not an identifier, so this cannot be an if-equal or an
        // if-current; it must parse as a general comparison.
        let program = parse("if count(b) == sum { accept }").unwrap();
        match &program.body[0] {
            Stmt::If { condition, .. } => {
                assert_eq!(
                    *condition,
                    Expr::Binary {
                        op: BinOp::Eq,
                        left: Box::new(Expr::Count('b')),
                        right: Box::new(Expr::Var("sum".to_string())),
                    }
                );
            }
            other => panic!("expected general if, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_scan_and_blank() {
        let program = parse("scan right for [b, _]").unwrap();
        match &program.body[0] {
            Stmt::Scan {
                direction,
                stop_symbols,
            } => {
                assert_eq!(*direction, Direction::Right);
                assert!(stop_symbols.contains(&'b'));
                assert!(stop_symbols.contains(&BLANK));
            }
            other => panic!("expected scan, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_scan_single_symbol() {
        let program = parse("scan left for a").unwrap();
        match &program.body[0] {
            Stmt::Scan {
                direction,
                stop_symbols,
            } => {
                assert_eq!(*direction, Direction::Left);
                assert_eq!(stop_symbols.len(), 1);
                assert!(stop_symbols.contains(&'a'));
            }
            other => panic!("expected scan, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_loop_break_append() {
        let program = parse("loop { inc i\nappend i -> sum\nif i == n { break } }").unwrap();
        match &program.body[0] {
            Stmt::Loop { body } => {
                assert_eq!(body.len(), 3);
                assert_eq!(body[0], Stmt::Inc("i".to_string()));
                assert_eq!(
                    body[1],
                    Stmt::Append {
                        src: "i".to_string(),
                        dst: "sum".to_string(),
                    }
                );
            }
            other => panic!("expected loop, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_markers_and_write() {
        let program = parse("markers: [x]\nwrite x\nleft\nright").unwrap();
        assert!(program.markers.contains(&'x'));
        assert_eq!(program.body[0], Stmt::Write('x'));
        assert_eq!(program.body[1], Stmt::Move(Direction::Left));
        assert_eq!(program.body[2], Stmt::Move(Direction::Right));
    }

    #[test]
    fn test_parse_comments_ignored() {
        let program = parse("# leading comment\nn = count(a) # trailing\naccept").unwrap();
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn test_parse_keyword_prefixed_identifier() {
        // `leftover` must parse as one identifier, not `left` + garbage.
        let program = parse("leftover = 1").unwrap();
        assert_eq!(
            program.body[0],
            Stmt::Assign {
                name: "leftover".to_string(),
                value: Expr::Int(1),
            }
        );
    }

    #[test]
    fn test_parse_error_reported() {
        let result = parse("if { }");
        assert!(matches!(result, Err(CompileError::Parse(_))));
    }

    #[test]
    fn test_parse_empty_program() {
        let program = parse("").unwrap();
        assert!(program.body.is_empty());
        assert!(program.input_alphabet.is_empty());
    }
}
