//! Safe arithmetic evaluator behind the `MathTool` calculator.
//!
//! Expressions are tokenized and parsed into a small AST; only numeric
//! literals, the arithmetic operators, parentheses and an allow-listed
//! set of functions and constants exist in the grammar.  There is no
//! way to reach attributes, strings, indexing or assignment.

use thiserror::Error;

/// Maximum nesting of parentheses, unary operators, function calls and
/// exponent chains.  Flat `+ - * /` chains do not nest (see [`Expr::Chain`]).
const MAX_DEPTH: usize = 200;

const FUNCTIONS: &[&str] = &[
    "abs", "round", "min", "max", "sum", "pow", "sqrt", "sin", "cos", "tan", "asin", "acos",
    "atan", "sinh", "cosh", "tanh", "log", "log10", "log2", "exp", "floor", "ceil", "degrees",
    "radians", "factorial",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("invalid syntax: {0}")]
    Syntax(String),
    #[error("name '{0}' is not defined")]
    UnknownName(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("{0}")]
    Eval(String),
}

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        "tau" => Some(std::f64::consts::TAU),
        "inf" => Some(f64::INFINITY),
        _ => None,
    }
}

fn is_function(name: &str) -> bool {
    FUNCTIONS.contains(&name)
}

// ── Lexer ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    LParen,
    RParen,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let next = chars.get(i + 1).copied();
        if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) {
            let (value, len) = lex_number(&chars[i..])?;
            tokens.push(Token::Num(value));
            i += len;
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        let (token, len) = match (c, next) {
            ('*', Some('*')) => (Token::StarStar, 2),
            ('/', Some('/')) => (Token::SlashSlash, 2),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            _ => return Err(CalcError::Syntax(format!("unexpected character '{c}'"))),
        };
        tokens.push(token);
        i += len;
    }

    Ok(tokens)
}

/// Lex `digits [. digits] [e [+-] digits]`, returning the value and the
/// number of chars consumed.
fn lex_number(chars: &[char]) -> Result<(f64, usize), CalcError> {
    let mut i = 0;
    let digits = |i: &mut usize| {
        while *i < chars.len() && chars[*i].is_ascii_digit() {
            *i += 1;
        }
    };

    digits(&mut i);
    if i < chars.len() && chars[i] == '.' {
        i += 1;
        digits(&mut i);
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        let exp_start = j;
        while j < chars.len() && chars[j].is_ascii_digit() {
            j += 1;
        }
        if j == exp_start {
            return Err(CalcError::Syntax("malformed exponent".into()));
        }
        i = j;
    }

    let text: String = chars[..i].iter().collect();
    text.parse::<f64>()
        .map(|v| (v, i))
        .map_err(|_| CalcError::Syntax(format!("invalid number '{text}'")))
}

// ── Parser ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Num(f64),
    Name(String),
    Neg(Box<Expr>),
    /// Right-associative `**`.
    Pow(Box<Expr>, Box<Expr>),
    /// Left-associative run of same-precedence operators, kept flat so a
    /// long `1 + 1 + ... + 1` is one node rather than a deep tree.
    Chain(Box<Expr>, Vec<(BinOp, Expr)>),
    Call(String, Vec<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), CalcError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> CalcError {
        match self.peek() {
            Some(t) => CalcError::Syntax(format!("unexpected token {t:?}")),
            None => CalcError::Syntax("unexpected end of expression".into()),
        }
    }

    fn enter(&mut self) -> Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::Eval("expression is nested too deeply".into()));
        }
        Ok(())
    }

    fn parse(mut self) -> Result<Expr, CalcError> {
        let expr = self.additive()?;
        if self.peek().is_some() {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn additive(&mut self) -> Result<Expr, CalcError> {
        let first = self.multiplicative()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(chain(first, rest)),
            };
            self.pos += 1;
            rest.push((op, self.multiplicative()?));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, CalcError> {
        let first = self.unary()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::SlashSlash) => BinOp::FloorDiv,
                Some(Token::Percent) => BinOp::Mod,
                _ => return Ok(chain(first, rest)),
            };
            self.pos += 1;
            rest.push((op, self.unary()?));
        }
    }

    // unary := ('+' | '-') unary | power
    fn unary(&mut self) -> Result<Expr, CalcError> {
        self.enter()?;
        let expr = if self.eat(&Token::Minus) {
            Expr::Neg(Box::new(self.unary()?))
        } else if self.eat(&Token::Plus) {
            self.unary()?
        } else {
            self.power()?
        };
        self.depth -= 1;
        Ok(expr)
    }

    // power := primary ['**' unary]   (right-associative)
    fn power(&mut self) -> Result<Expr, CalcError> {
        let base = self.primary()?;
        if self.eat(&Token::StarStar) {
            let exp = self.unary()?;
            return Ok(Expr::Pow(Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, CalcError> {
        match self.bump() {
            Some(Token::Num(v)) => Ok(Expr::Num(v)),
            Some(Token::Ident(name)) => {
                if !self.eat(&Token::LParen) {
                    return Ok(Expr::Name(name));
                }
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.additive()?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        self.expect(&Token::RParen)?;
                        break;
                    }
                }
                Ok(Expr::Call(name, args))
            }
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.additive()?;
                self.expect(&Token::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(t) => Err(CalcError::Syntax(format!("unexpected token {t:?}"))),
            None => Err(CalcError::Syntax("unexpected end of expression".into())),
        }
    }
}

fn chain(first: Expr, rest: Vec<(BinOp, Expr)>) -> Expr {
    if rest.is_empty() {
        first
    } else {
        Expr::Chain(Box::new(first), rest)
    }
}

// ── Evaluation ───────────────────────────────────────────────

fn eval(expr: &Expr) -> Result<f64, CalcError> {
    match expr {
        Expr::Num(v) => Ok(*v),
        Expr::Name(name) => match constant(name) {
            Some(v) => Ok(v),
            None if is_function(name) => Err(CalcError::Eval(format!(
                "'{name}' is a function and must be called"
            ))),
            None => Err(CalcError::UnknownName(name.clone())),
        },
        Expr::Neg(inner) => Ok(-eval(inner)?),
        Expr::Pow(base, exp) => {
            let a = eval(base)?;
            let b = eval(exp)?;
            power(a, b)
        }
        Expr::Chain(first, rest) => {
            let mut acc = eval(first)?;
            for (op, operand) in rest {
                acc = binary(*op, acc, eval(operand)?)?;
            }
            Ok(acc)
        }
        Expr::Call(name, args) => {
            if constant(name).is_some() {
                return Err(CalcError::Eval(format!("'{name}' is a constant, not a function")));
            }
            if !is_function(name) {
                return Err(CalcError::UnknownName(name.clone()));
            }
            let values = args.iter().map(eval).collect::<Result<Vec<_>, _>>()?;
            call(name, &values)
        }
    }
}

fn binary(op: BinOp, a: f64, b: f64) -> Result<f64, CalcError> {
    match op {
        BinOp::Add => Ok(a + b),
        BinOp::Sub => Ok(a - b),
        BinOp::Mul => Ok(a * b),
        BinOp::Div => {
            if b == 0.0 {
                return Err(CalcError::DivisionByZero);
            }
            Ok(a / b)
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(CalcError::DivisionByZero);
            }
            Ok((a / b).floor())
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(CalcError::DivisionByZero);
            }
            Ok(floored_mod(a, b))
        }
    }
}

/// Remainder with the sign of the divisor.
fn floored_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

fn power(base: f64, exp: f64) -> Result<f64, CalcError> {
    if base == 0.0 && exp < 0.0 {
        return Err(CalcError::DivisionByZero);
    }
    if base < 0.0 && exp.is_finite() && exp.fract() != 0.0 {
        return Err(CalcError::Eval(
            "negative number cannot be raised to a fractional power".into(),
        ));
    }
    let result = base.powf(exp);
    if result.is_infinite() && base.is_finite() && exp.is_finite() {
        return Err(CalcError::Eval("numerical result out of range".into()));
    }
    Ok(result)
}

fn arity(name: &str, args: &[f64], min: usize, max: usize) -> Result<(), CalcError> {
    let n = args.len();
    if n >= min && n <= max {
        return Ok(());
    }
    let expected = if min == max {
        format!("exactly {min}")
    } else if max == usize::MAX {
        format!("at least {min}")
    } else {
        format!("{min} to {max}")
    };
    Err(CalcError::Eval(format!(
        "{name}() takes {expected} argument(s) ({n} given)"
    )))
}

fn to_integer(x: f64) -> Result<f64, CalcError> {
    if x.is_nan() {
        return Err(CalcError::Eval("cannot convert float NaN to integer".into()));
    }
    if x.is_infinite() {
        return Err(CalcError::Eval("cannot convert float infinity to integer".into()));
    }
    Ok(x)
}

/// Apply a one-argument libm function, mapping NaN from a non-NaN input
/// to a domain error and infinity from a finite input to a range error.
fn math1(x: f64, f: fn(f64) -> f64) -> Result<f64, CalcError> {
    let y = f(x);
    if y.is_nan() && !x.is_nan() {
        return Err(CalcError::Eval("math domain error".into()));
    }
    if y.is_infinite() && x.is_finite() {
        return Err(CalcError::Eval("math range error".into()));
    }
    Ok(y)
}

fn log_positive(x: f64, f: fn(f64) -> f64) -> Result<f64, CalcError> {
    if x <= 0.0 {
        return Err(CalcError::Eval("math domain error".into()));
    }
    math1(x, f)
}

fn call(name: &str, args: &[f64]) -> Result<f64, CalcError> {
    match name {
        "abs" => {
            arity(name, args, 1, 1)?;
            Ok(args[0].abs())
        }
        "round" => {
            arity(name, args, 1, 2)?;
            let x = args[0];
            match args.get(1) {
                None => Ok(to_integer(x)?.round_ties_even()),
                Some(&nd) => {
                    if nd.fract() != 0.0 || !nd.is_finite() {
                        return Err(CalcError::Eval("round() ndigits must be an integer".into()));
                    }
                    if !x.is_finite() {
                        return Ok(x);
                    }
                    let scale = 10f64.powi(nd as i32);
                    if scale == 0.0 {
                        return Ok(0.0f64.copysign(x));
                    }
                    let scaled = x * scale;
                    if !scaled.is_finite() {
                        return Ok(x);
                    }
                    Ok(scaled.round_ties_even() / scale)
                }
            }
        }
        "min" => {
            arity(name, args, 1, usize::MAX)?;
            Ok(args.iter().copied().fold(f64::INFINITY, f64::min))
        }
        "max" => {
            arity(name, args, 1, usize::MAX)?;
            Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        }
        "sum" => Ok(args.iter().sum()),
        "pow" => {
            arity(name, args, 2, 2)?;
            power(args[0], args[1])
        }
        "sqrt" => {
            arity(name, args, 1, 1)?;
            math1(args[0], f64::sqrt)
        }
        "sin" | "cos" | "tan" | "asin" | "acos" | "atan" | "sinh" | "cosh" | "tanh" | "exp" => {
            arity(name, args, 1, 1)?;
            let f: fn(f64) -> f64 = match name {
                "sin" => f64::sin,
                "cos" => f64::cos,
                "tan" => f64::tan,
                "asin" => f64::asin,
                "acos" => f64::acos,
                "atan" => f64::atan,
                "sinh" => f64::sinh,
                "cosh" => f64::cosh,
                "tanh" => f64::tanh,
                _ => f64::exp,
            };
            math1(args[0], f)
        }
        "log" => {
            arity(name, args, 1, 2)?;
            let num = log_positive(args[0], f64::ln)?;
            match args.get(1) {
                None => Ok(num),
                Some(&base) => {
                    let den = log_positive(base, f64::ln)?;
                    if den == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    Ok(num / den)
                }
            }
        }
        "log10" => {
            arity(name, args, 1, 1)?;
            log_positive(args[0], f64::log10)
        }
        "log2" => {
            arity(name, args, 1, 1)?;
            log_positive(args[0], f64::log2)
        }
        "floor" => {
            arity(name, args, 1, 1)?;
            Ok(to_integer(args[0])?.floor())
        }
        "ceil" => {
            arity(name, args, 1, 1)?;
            Ok(to_integer(args[0])?.ceil())
        }
        "degrees" => {
            arity(name, args, 1, 1)?;
            Ok(args[0].to_degrees())
        }
        "radians" => {
            arity(name, args, 1, 1)?;
            Ok(args[0].to_radians())
        }
        "factorial" => {
            arity(name, args, 1, 1)?;
            factorial(args[0])
        }
        other => Err(CalcError::UnknownName(other.to_string())),
    }
}

fn factorial(x: f64) -> Result<f64, CalcError> {
    if !x.is_finite() || x.fract() != 0.0 {
        return Err(CalcError::Eval("factorial() only accepts integral values".into()));
    }
    if x < 0.0 {
        return Err(CalcError::Eval("factorial() not defined for negative values".into()));
    }
    if x > 170.0 {
        return Err(CalcError::Eval("factorial() result too large".into()));
    }
    Ok((2..=x as u32).fold(1.0, |acc, k| acc * k as f64))
}

// ── Public API ───────────────────────────────────────────────

/// Parse and evaluate `expr`.
pub fn evaluate(expr: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(expr.trim())?;
    if tokens.is_empty() {
        return Err(CalcError::Syntax("empty expression".into()));
    }
    let ast = Parser {
        tokens,
        pos: 0,
        depth: 0,
    }
    .parse()?;
    eval(&ast)
}

/// Integral finite values print without a fractional part; everything
/// else is rounded to 10 decimal places and printed in shortest form,
/// switching to exponent notation below `1e-4` (`1.23e-05`).
pub fn format_number(x: f64) -> String {
    if x.is_nan() {
        return "nan".into();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if x.fract() == 0.0 {
        if x == 0.0 {
            return "0".into();
        }
        return format!("{x:.0}");
    }
    let rounded: f64 = format!("{x:.10}").parse().unwrap_or(x);
    if rounded == 0.0 {
        return "0.0".into();
    }
    if rounded.fract() == 0.0 {
        return format!("{rounded:.1}");
    }
    let sci = format!("{rounded:e}");
    match sci.split_once('e').map(|(m, e)| (m, e.parse::<i32>())) {
        Some((mantissa, Ok(exp))) if exp < -4 => {
            format!("{mantissa}e-{:02}", exp.unsigned_abs())
        }
        _ => rounded.to_string(),
    }
}

/// Tool-facing entry point: never fails, always returns display text.
pub fn calculator(expression: &str) -> String {
    let expression = expression.trim();
    render(expression, &evaluate(expression))
}

/// Display text for an already evaluated `expression`.
pub fn render(expression: &str, outcome: &Result<f64, CalcError>) -> String {
    match outcome {
        Ok(v) => format!("🧮 Result: {expression} = {}", format_number(*v)),
        Err(CalcError::Syntax(_)) => {
            format!("❌ Syntax Error: Invalid expression '{expression}'")
        }
        Err(CalcError::UnknownName(_)) => format!(
            "❌ Unknown function in '{expression}'. Available: sqrt, sin, cos, tan, log, exp, etc."
        ),
        Err(CalcError::DivisionByZero) => "❌ Error: Division by zero".into(),
        Err(CalcError::Eval(cause)) => format!("❌ Error: {cause}"),
    }
}
