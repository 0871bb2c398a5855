//! a module turns a String expression into a symbolic expression
//!# Example
//! ```
//! use RustedPotential::symbolic::symbolic_engine::Expr;
//! let parsed = Expr::parse_expression("x^2*exp(-y) + 3").unwrap();
//! assert!(parsed.contains_variable("y"));
//! assert!(Expr::parse_expression("2x").is_err());
//! ```
use crate::symbolic::symbolic_engine::Expr;
use std::f64::consts::{E, PI};

//   grammar (lowest to highest precedence)
//
//   expr    := term (('+' | '-') term)*
//   term    := unary (('*' | '/') unary)*
//   unary   := ('+' | '-') unary | power
//   power   := primary (('^' | '**') unary)?      right associative, -x^2 == -(x^2)
//   primary := number | name | function '(' expr ')' | '(' expr ')'
#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Token::Number(v) => write!(f, "{}", v),
            Token::Name(n) => write!(f, "{}", n),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

/// splits the input into tokens, each paired with its character offset
fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let start = i;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::Caret
            }
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' | '[' => Token::LParen,
            ')' | ']' => Token::RParen,
            _ if c.is_ascii_digit() || c == '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // scientific notation: 1e-3, 2.5E+4
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{}' at position {}", literal, start))?;
                tokens.push((Token::Number(value), start));
                continue;
            }
            _ if c.is_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                tokens.push((Token::Name(name), start));
                continue;
            }
            _ => {
                return Err(format!(
                    "unexpected character '{}' at position {}",
                    c, start
                ));
            }
        };
        tokens.push((token, start));
        i += 1;
    }
    Ok(tokens)
}

/// elementary functions known to the parser, several spellings per function
fn apply_function(name: &str, arg: Expr) -> Option<Expr> {
    let expr = match name {
        "exp" => Expr::Exp(arg.boxed()),
        "log" | "ln" => Expr::Ln(arg.boxed()),
        "sqrt" => Expr::Pow(arg.boxed(), Expr::Const(0.5).boxed()),
        "sin" => Expr::sin(arg.boxed()),
        "cos" => Expr::cos(arg.boxed()),
        "tan" | "tg" => Expr::tg(arg.boxed()),
        "cot" | "ctg" => Expr::ctg(arg.boxed()),
        "asin" | "arcsin" => Expr::arcsin(arg.boxed()),
        "acos" | "arccos" => Expr::arccos(arg.boxed()),
        "atan" | "arctan" | "arctg" => Expr::arctg(arg.boxed()),
        "acot" | "arccot" | "arcctg" => Expr::arcctg(arg.boxed()),
        _ => return None,
    };
    Some(expr)
}

fn is_function_name(name: &str) -> bool {
    apply_function(name, Expr::Const(0.0)).is_some()
}

/// named constants; `I` is the imaginary unit written as (-1)^(1/2)
fn named_constant(name: &str) -> Option<Expr> {
    match name {
        "pi" => Some(Expr::Const(PI)),
        "E" => Some(Expr::Const(E)),
        "I" => Some(Expr::Pow(
            Expr::Const(-1.0).boxed(),
            Expr::Const(0.5).boxed(),
        )),
        _ => None,
    }
}

/// deepest accepted nesting of signs, brackets, exponents and function calls
const MAX_NESTING: usize = 256;
/// deepest accepted expression tree; later stages recurse over the tree
const MAX_DEPTH: usize = 256;

/// an expression with the depth of its tree
type Parsed = (Expr, usize);

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    input_len: usize,
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, at)| *at)
            .unwrap_or(self.input_len)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        let at = self.offset();
        match self.next() {
            Some(t) if t == expected => Ok(()),
            Some(t) => Err(format!(
                "expected '{}' but found '{}' at position {}",
                expected, t, at
            )),
            None => Err(format!("expected '{}' but input ended", expected)),
        }
    }

    /// joins two operands, refusing trees deeper than MAX_DEPTH
    fn combine(&self, lhs_depth: usize, rhs_depth: usize, at: usize) -> Result<usize, String> {
        let depth = 1 + lhs_depth.max(rhs_depth);
        if depth > MAX_DEPTH {
            return Err(format!(
                "expression is too deep (more than {} levels) at position {}",
                MAX_DEPTH, at
            ));
        }
        Ok(depth)
    }

    fn parse_expr(&mut self) -> Result<Parsed, String> {
        let (mut lhs, mut depth) = self.parse_term()?;
        loop {
            let at = self.offset();
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    let (rhs, rhs_depth) = self.parse_term()?;
                    depth = self.combine(depth, rhs_depth, at)?;
                    lhs = lhs + rhs;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    let (rhs, rhs_depth) = self.parse_term()?;
                    depth = self.combine(depth, rhs_depth, at)?;
                    lhs = lhs - rhs;
                }
                _ => return Ok((lhs, depth)),
            }
        }
    }

    fn parse_term(&mut self) -> Result<Parsed, String> {
        let (mut lhs, mut depth) = self.parse_unary()?;
        loop {
            let at = self.offset();
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    let (rhs, rhs_depth) = self.parse_unary()?;
                    depth = self.combine(depth, rhs_depth, at)?;
                    lhs = lhs * rhs;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let (rhs, rhs_depth) = self.parse_unary()?;
                    depth = self.combine(depth, rhs_depth, at)?;
                    lhs = lhs / rhs;
                }
                _ => return Ok((lhs, depth)),
            }
        }
    }

    /// every level of signs, brackets, exponents and function calls passes through here
    fn parse_unary(&mut self) -> Result<Parsed, String> {
        if self.nesting >= MAX_NESTING {
            return Err(format!(
                "expression is nested more than {} levels deep at position {}",
                MAX_NESTING,
                self.offset()
            ));
        }
        self.nesting += 1;
        let parsed = self.parse_signed();
        self.nesting -= 1;
        parsed
    }

    fn parse_signed(&mut self) -> Result<Parsed, String> {
        let at = self.offset();
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            Some(Token::Minus) => {
                self.pos += 1;
                match self.parse_unary()? {
                    (Expr::Const(c), depth) => Ok((Expr::Const(-c), depth)),
                    (other, depth) => Ok((-other, self.combine(depth, 0, at)?)),
                }
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Parsed, String> {
        let (base, depth) = self.parse_primary()?;
        let at = self.offset();
        if let Some(Token::Caret) = self.peek() {
            self.pos += 1;
            let (exponent, exponent_depth) = self.parse_unary()?;
            let depth = self.combine(depth, exponent_depth, at)?;
            return Ok((base.pow(exponent), depth));
        }
        Ok((base, depth))
    }

    fn parse_primary(&mut self) -> Result<Parsed, String> {
        let at = self.offset();
        match self.next() {
            Some(Token::Number(v)) => Ok((Expr::Const(v), 1)),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.pos += 1;
                    let (arg, depth) = self.parse_expr()?;
                    self.expect(Token::RParen)?;
                    let depth = self.combine(depth, 1, at)?;
                    apply_function(&name, arg)
                        .map(|expr| (expr, depth))
                        .ok_or_else(|| format!("unknown function '{}' at position {}", name, at))
                } else if is_function_name(&name) {
                    Err(format!(
                        "function '{}' at position {} must be followed by an argument in brackets",
                        name, at
                    ))
                } else if let Some(constant) = named_constant(&name) {
                    Ok((constant, 2))
                } else {
                    Ok((Expr::Var(name), 1))
                }
            }
            Some(t) => Err(format!("unexpected '{}' at position {}", t, at)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

/// Parses a string into a symbolic expression.
///
/// Accepts `+ - * / ^ **`, unary signs, round or square brackets, decimal and scientific numbers,
/// the constants `pi`, `E`, `I` and the functions
/// `exp log ln sqrt sin cos tan tg cot ctg asin arcsin acos arccos atan arctan arctg acot arccot arcctg`.
/// Implicit multiplication (`2x`) is rejected.
pub fn parse_expression_func(input: &str) -> Result<Expr, String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        input_len: input.chars().count(),
        nesting: 0,
    };
    let (expr, _) = parser.parse_expr()?;
    if parser.pos < parser.tokens.len() {
        let at = parser.offset();
        let token = parser.tokens[parser.pos].0.clone();
        return Err(match token {
            Token::RParen => format!("unbalanced ')' at position {}", at),
            t => format!("unexpected '{}' at position {}", t, at),
        });
    }
    Ok(expr)
}

impl Expr {
    /// Parses a string into a symbolic expression, see [`parse_expression_func`].
    pub fn parse_expression(input: &str) -> Result<Expr, String> {
        parse_expression_func(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn x() -> Expr {
        Expr::Var("x".to_string())
    }
    fn y() -> Expr {
        Expr::Var("y".to_string())
    }

    #[test]
    fn test_precedence() {
        let parsed = Expr::parse_expression("x + y * 2").unwrap();
        assert_eq!(parsed, x() + y() * Expr::Const(2.0));
        let parsed = Expr::parse_expression("x / y / 2").unwrap();
        assert_eq!(parsed, (x() / y()) / Expr::Const(2.0));
    }

    #[test]
    fn test_power_is_right_associative_and_binds_tighter_than_minus() {
        let parsed = Expr::parse_expression("-x^2").unwrap();
        assert_eq!(parsed, -(x().pow(Expr::Const(2.0))));
        let parsed = Expr::parse_expression("x**y**2").unwrap();
        assert_eq!(parsed, x().pow(y().pow(Expr::Const(2.0))));
        let parsed = Expr::parse_expression("x^-1").unwrap();
        assert_eq!(parsed, x().pow(Expr::Const(-1.0)));
    }

    #[test]
    fn test_functions_and_constants() {
        let parsed = Expr::parse_expression("sqrt(x) + log(y) - atan(pi)").unwrap();
        assert_eq!(
            parsed,
            x().pow(Expr::Const(0.5)) + Expr::Ln(y().boxed())
                - Expr::arctg(Expr::Const(PI).boxed())
        );
        let parsed = Expr::parse_expression("tan(x)*cot(x)").unwrap();
        assert_eq!(parsed, Expr::tg(x().boxed()) * Expr::ctg(x().boxed()));
        match Expr::parse_expression("E").unwrap() {
            Expr::Const(v) => assert_relative_eq!(v, E),
            other => panic!("unexpected {:?}", other),
        }
        // lowercase e is an ordinary symbol
        assert_eq!(
            Expr::parse_expression("e").unwrap(),
            Expr::Var("e".to_string())
        );
    }

    #[test]
    fn test_scientific_numbers() {
        assert_eq!(
            Expr::parse_expression("1.5e-3*x").unwrap(),
            Expr::Const(1.5e-3) * x()
        );
        assert_eq!(Expr::parse_expression(".5").unwrap(), Expr::Const(0.5));
    }

    #[test]
    fn test_malformed_inputs() {
        for bad in [
            "x+*", "", "   ", "2x", "(x+1", "x+1)", "sin x", "foo(x)", "x # y", "x,y", "x +", "()",
            "1..2",
        ] {
            assert!(
                Expr::parse_expression(bad).is_err(),
                "'{}' should not parse",
                bad
            );
        }
    }

    #[test]
    fn test_nesting_limits() {
        let signs = format!("{}x", "-".repeat(3_000));
        let err = Expr::parse_expression(&signs).unwrap_err();
        assert!(err.contains("nested"), "{}", err);
        let brackets = format!("{}x{}", "(".repeat(3_000), ")".repeat(3_000));
        assert!(Expr::parse_expression(&brackets).is_err());
        let calls = format!("{}x{}", "sin(".repeat(1_000), ")".repeat(1_000));
        assert!(Expr::parse_expression(&calls).is_err());
        let long_sum = vec!["x"; 2_000].join(" + ");
        let err = Expr::parse_expression(&long_sum).unwrap_err();
        assert!(err.contains("too deep"), "{}", err);
        // moderate nesting is fine
        let moderate = format!("{}x{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(Expr::parse_expression(&moderate).unwrap(), x());
        assert_eq!(Expr::parse_expression("--x").unwrap(), -(-x()));
        assert!(Expr::parse_expression(&vec!["x"; 100].join("*")).is_ok());
    }

    #[test]
    fn test_error_mentions_position() {
        let err = Expr::parse_expression("x+*").unwrap_err();
        assert!(err.contains("position 2"), "{}", err);
        let err = Expr::parse_expression("foo(x)").unwrap_err();
        assert!(err.contains("unknown function 'foo'"), "{}", err);
    }
}
