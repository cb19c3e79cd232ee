//! Parser for the textual SMT-LIB2 formulas carried by condition artifacts.
//!
//! The branch-condition extraction tool emits plain QF_LIA terms
//! (`(and (>= dst_ip 0) (< port 2))`). Parsing them into [`SmtTerm`] keeps
//! the rest of the pipeline backend-agnostic: negating a formula for an
//! untaken branch is a structural `Not`, not string surgery.

use thiserror::Error;

use crate::terms::SmtTerm;

#[derive(Debug, Error, PartialEq)]
pub enum SmtLibParseError {
    #[error("empty formula")]
    Empty,
    #[error("unbalanced parentheses in formula")]
    Unbalanced,
    #[error("unexpected trailing input after formula: '{0}'")]
    TrailingInput(String),
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("operator '{op}' expects {expected} operands, found {found}")]
    Arity {
        op: String,
        expected: &'static str,
        found: usize,
    },
    #[error("malformed term '{0}'")]
    Malformed(String),
}

#[derive(Debug, Clone)]
enum SExp {
    Atom(String),
    List(Vec<SExp>),
}

/// Parse a single SMT-LIB2 term into an [`SmtTerm`].
///
/// `;` comments are stripped. Round-trips with
/// [`crate::backends::smtlib_printer::to_smtlib`] on the supported fragment.
pub fn parse_term(source: &str) -> Result<SmtTerm, SmtLibParseError> {
    let tokens = tokenize(source);
    if tokens.is_empty() {
        return Err(SmtLibParseError::Empty);
    }
    let mut pos = 0;
    let sexp = read_sexp(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(SmtLibParseError::TrailingInput(tokens[pos..].join(" ")));
    }
    build_term(&sexp)
}

fn tokenize(source: &str) -> Vec<String> {
    let mut cleaned = String::with_capacity(source.len());
    for line in source.lines() {
        match line.find(';') {
            Some(i) => cleaned.push_str(&line[..i]),
            None => cleaned.push_str(line),
        }
        cleaned.push('\n');
    }

    let mut tokens = Vec::new();
    let chars: Vec<char> = cleaned.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '(' | ')' => {
                tokens.push(chars[i].to_string());
                i += 1;
            }
            _ => {
                let start = i;
                while i < chars.len()
                    && !chars[i].is_whitespace()
                    && chars[i] != '('
                    && chars[i] != ')'
                {
                    i += 1;
                }
                tokens.push(chars[start..i].iter().collect());
            }
        }
    }
    tokens
}

fn read_sexp(tokens: &[String], pos: &mut usize) -> Result<SExp, SmtLibParseError> {
    match tokens.get(*pos).map(String::as_str) {
        None => Err(SmtLibParseError::Unbalanced),
        Some("(") => {
            *pos += 1;
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos).map(String::as_str) {
                    None => return Err(SmtLibParseError::Unbalanced),
                    Some(")") => {
                        *pos += 1;
                        return Ok(SExp::List(items));
                    }
                    Some(_) => items.push(read_sexp(tokens, pos)?),
                }
            }
        }
        Some(")") => Err(SmtLibParseError::Unbalanced),
        Some(atom) => {
            *pos += 1;
            Ok(SExp::Atom(atom.to_string()))
        }
    }
}

fn build_term(sexp: &SExp) -> Result<SmtTerm, SmtLibParseError> {
    match sexp {
        SExp::Atom(a) => build_atom(a),
        SExp::List(items) => {
            let (head, args) = match items.split_first() {
                Some((SExp::Atom(op), rest)) => (op.as_str(), rest),
                _ => return Err(SmtLibParseError::Malformed(render(sexp))),
            };
            let operands: Vec<SmtTerm> =
                args.iter().map(build_term).collect::<Result<_, _>>()?;
            build_application(head, operands)
        }
    }
}

fn build_atom(atom: &str) -> Result<SmtTerm, SmtLibParseError> {
    match atom {
        "true" => Ok(SmtTerm::BoolLit(true)),
        "false" => Ok(SmtTerm::BoolLit(false)),
        _ => {
            if let Ok(n) = atom.parse::<i64>() {
                Ok(SmtTerm::IntLit(n))
            } else if atom.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                Err(SmtLibParseError::Malformed(atom.to_string()))
            } else {
                Ok(SmtTerm::Var(atom.to_string()))
            }
        }
    }
}

fn build_application(
    op: &str,
    operands: Vec<SmtTerm>,
) -> Result<SmtTerm, SmtLibParseError> {
    match op {
        "and" => Ok(SmtTerm::And(operands)),
        "or" => Ok(SmtTerm::Or(operands)),
        "not" => {
            let [inner] = try_exactly::<1>(op, operands)?;
            Ok(inner.not())
        }
        "=" => binary(op, operands, SmtTerm::eq),
        "<" => binary(op, operands, SmtTerm::lt),
        "<=" => binary(op, operands, SmtTerm::le),
        ">" => binary(op, operands, SmtTerm::gt),
        ">=" => binary(op, operands, SmtTerm::ge),
        "+" => fold_left(op, operands, SmtTerm::add),
        "*" => fold_left(op, operands, SmtTerm::mul),
        "-" => match operands.len() {
            // Unary minus: `(- 5)` is the SMT-LIB2 spelling of a negative
            // literal, `(- x)` negates a term.
            1 => match operands.into_iter().next() {
                Some(SmtTerm::IntLit(n)) => Ok(SmtTerm::IntLit(-n)),
                Some(term) => Ok(SmtTerm::int(0).sub(term)),
                None => unreachable!(),
            },
            0 => Err(SmtLibParseError::Arity {
                op: op.to_string(),
                expected: "1 or more",
                found: 0,
            }),
            _ => fold_left(op, operands, SmtTerm::sub),
        },
        other => Err(SmtLibParseError::UnknownOperator(other.to_string())),
    }
}

fn try_exactly<const N: usize>(
    op: &str,
    operands: Vec<SmtTerm>,
) -> Result<[SmtTerm; N], SmtLibParseError> {
    let found = operands.len();
    operands.try_into().map_err(|_| SmtLibParseError::Arity {
        op: op.to_string(),
        expected: if N == 1 { "exactly 1" } else { "exactly 2" },
        found,
    })
}

fn binary(
    op: &str,
    operands: Vec<SmtTerm>,
    make: fn(SmtTerm, SmtTerm) -> SmtTerm,
) -> Result<SmtTerm, SmtLibParseError> {
    let [lhs, rhs] = try_exactly::<2>(op, operands)?;
    Ok(make(lhs, rhs))
}

fn fold_left(
    op: &str,
    operands: Vec<SmtTerm>,
    make: fn(SmtTerm, SmtTerm) -> SmtTerm,
) -> Result<SmtTerm, SmtLibParseError> {
    let mut iter = operands.into_iter();
    let first = iter.next().ok_or_else(|| SmtLibParseError::Arity {
        op: op.to_string(),
        expected: "2 or more",
        found: 0,
    })?;
    let mut acc = first;
    let mut count = 1;
    for term in iter {
        acc = make(acc, term);
        count += 1;
    }
    if count < 2 {
        return Err(SmtLibParseError::Arity {
            op: op.to_string(),
            expected: "2 or more",
            found: count,
        });
    }
    Ok(acc)
}

fn render(sexp: &SExp) -> String {
    match sexp {
        SExp::Atom(a) => a.clone(),
        SExp::List(items) => {
            let inner: Vec<String> = items.iter().map(render).collect();
            format!("({})", inner.join(" "))
        }
    }
}
