//! Compiler from filter query text to an expression tree.
//!
//! Grammar (in rough EBNF):
//!
//! filter  = expr
//! expr    = TERM operator LITERAL
//!         | expr combinator expr
//!         | "(" expr ")"
//! operator   = "eq" | "ne" | "gt" | "lt"
//! combinator = "and" | "or"
//!
//! Parentheses are optional around comparisons: `a eq 1 and b eq 2` is read as
//! `(a eq 1) and (b eq 2)`, and longer flat chains fold to the left.

use super::ast::{Combinator, CompareOp, Connective, Expr};
use super::error::CompileError;
use super::lexer::{Lexeme, Lexer, ParenMap, resolve_parens, words};
use super::schema::Schema;

/// A left or right hand side before it has been folded into a node.
#[derive(Debug)]
enum Operand<'q> {
    /// Field name or literal, still unvalidated text.
    Token(&'q str),
    Node(Expr),
}

/// Where the scanner is within one expression.
#[derive(Debug)]
enum State<'q> {
    ExpectTerm,
    ExpectOperator {
        term: &'q str,
    },
    ExpectCombinatorOrEnd {
        node: Expr,
    },
    ExpectValueOrSubexpr {
        left: Operand<'q>,
        connective: Connective,
    },
    /// `left and TERM` seen, waiting for the nested comparison's operator.
    ExpectNestedOperator {
        left: Operand<'q>,
        combinator: Combinator,
        term: &'q str,
    },
    ExpectNestedValue {
        left: Operand<'q>,
        combinator: Combinator,
        term: &'q str,
        op: CompareOp,
    },
}

impl<'q> State<'q> {
    fn on_word(self, word: &'q str, schema: &Schema) -> Result<Self, CompileError> {
        match self {
            State::ExpectTerm => {
                if !schema.contains(word) {
                    return Err(unknown_term(word));
                }
                Ok(State::ExpectOperator { term: word })
            }
            State::ExpectOperator { term } => Ok(State::ExpectValueOrSubexpr {
                left: Operand::Token(term),
                connective: parse_connective(word)?,
            }),
            State::ExpectCombinatorOrEnd { node } => Ok(State::ExpectValueOrSubexpr {
                left: Operand::Node(node),
                connective: parse_connective(word)?,
            }),
            State::ExpectValueOrSubexpr { left, connective } => match connective {
                Connective::Compare(_) => Ok(State::ExpectCombinatorOrEnd {
                    node: build(left, connective, Operand::Token(word), schema)?,
                }),
                Connective::Combine(combinator) => {
                    if !schema.contains(word) {
                        return Err(unknown_term(word));
                    }
                    Ok(State::ExpectNestedOperator {
                        left,
                        combinator,
                        term: word,
                    })
                }
            },
            State::ExpectNestedOperator {
                left,
                combinator,
                term,
            } => {
                let op = CompareOp::from_token(word).ok_or_else(|| unknown_operand(word))?;
                Ok(State::ExpectNestedValue {
                    left,
                    combinator,
                    term,
                    op,
                })
            }
            State::ExpectNestedValue {
                left,
                combinator,
                term,
                op,
            } => {
                let inner = build(
                    Operand::Token(term),
                    Connective::Compare(op),
                    Operand::Token(word),
                    schema,
                )?;
                let node = build(
                    left,
                    Connective::Combine(combinator),
                    Operand::Node(inner),
                    schema,
                )?;
                Ok(State::ExpectCombinatorOrEnd { node })
            }
        }
    }

    /// Whether a parenthesized group may appear here at all. Checked before
    /// the group is compiled so misplaced groups fail on placement.
    fn accepts_group(&self) -> bool {
        matches!(
            self,
            State::ExpectTerm | State::ExpectValueOrSubexpr { .. }
        )
    }

    fn on_group(self, node: Expr, schema: &Schema) -> Result<Self, CompileError> {
        match self {
            State::ExpectTerm => Ok(State::ExpectCombinatorOrEnd { node }),
            State::ExpectValueOrSubexpr { left, connective } => Ok(State::ExpectCombinatorOrEnd {
                node: build(left, connective, Operand::Node(node), schema)?,
            }),
            _ => Err(CompileError::invalid("unexpected parenthesized expression")),
        }
    }

    fn finish(self) -> Result<Expr, CompileError> {
        match self {
            State::ExpectCombinatorOrEnd { node } => Ok(node),
            State::ExpectTerm => Err(CompileError::EmptyQuery),
            _ => Err(CompileError::invalid("expression is incomplete")),
        }
    }
}

fn parse_connective(word: &str) -> Result<Connective, CompileError> {
    Connective::from_token(word).ok_or_else(|| unknown_operand(word))
}

fn unknown_term(word: &str) -> CompileError {
    CompileError::UnknownTerm {
        term: word.to_string(),
    }
}

fn unknown_operand(word: &str) -> CompileError {
    CompileError::UnknownOperand {
        token: word.to_string(),
    }
}

/// Fold two operands into one node.
///
/// A comparison needs a schema field on the left and a literal on the right;
/// the literal is coerced here, once. A combinator needs two finished nodes.
fn build(
    left: Operand<'_>,
    connective: Connective,
    right: Operand<'_>,
    schema: &Schema,
) -> Result<Expr, CompileError> {
    match (connective, left, right) {
        (Connective::Compare(op), Operand::Token(field), Operand::Token(literal)) => {
            let coercer = schema
                .coercer(field)
                .ok_or(CompileError::invalid("comparison on a field outside the schema"))?;
            Ok(Expr::comparison(field, op, coercer.coerce(literal)?))
        }
        (Connective::Combine(op), Operand::Node(left), Operand::Node(right)) => {
            Ok(Expr::combination(op, left, right))
        }
        (Connective::Compare(_), _, _) => Err(CompileError::invalid(
            "comparison expects a field and a literal",
        )),
        (Connective::Combine(_), _, _) => Err(CompileError::invalid(
            "combinator expects an expression on both sides",
        )),
    }
}

/// Parser state.
struct Parser<'q> {
    query: &'q str,
    schema: &'q Schema,
    parens: ParenMap,
}

impl<'q> Parser<'q> {
    /// Compile `query[from..to]` into a single expression.
    fn extract(&self, from: usize, to: usize) -> Result<Expr, CompileError> {
        let mut state = State::ExpectTerm;

        for lexeme in Lexer::new(self.query, &self.parens, from, to) {
            state = match lexeme? {
                Lexeme::Word(word) => state.on_word(word, self.schema)?,
                Lexeme::Group { open, close } => {
                    if !state.accepts_group() {
                        return Err(CompileError::invalid("unexpected parenthesized expression"));
                    }
                    let node = self.extract(open + 1, close)?;
                    state.on_group(node, self.schema)?
                }
            };
        }

        state.finish()
    }
}

/// Most combinators one query may contain. Bounds the depth of the tree,
/// since flat chains fold into a left-leaning spine.
pub const MAX_COMBINATORS: usize = 512;

/// Compile a filter query against a schema.
pub fn compile(query: &str, schema: &Schema) -> Result<Expr, CompileError> {
    let query = query.trim();
    let parens = resolve_parens(query)?;
    let combinators = words(query)
        .filter(|word| Combinator::from_token(word).is_some())
        .count();
    if combinators > MAX_COMBINATORS {
        return Err(CompileError::invalid("too many combinators"));
    }
    tracing::debug!("Compiling '{}' filter: {}", schema.name(), query);

    let parser = Parser {
        query,
        schema,
        parens,
    };
    parser.extract(0, query.len())
}
