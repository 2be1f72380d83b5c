//! Sandboxed arithmetic formulas over a single variable, `frac`.
//!
//! Accepted grammar (Python-flavoured precedence, `**` binds tighter than a
//! leading minus and is right-associative):
//!
//! ```text
//! expr   := term   (('+' | '-') term)*
//! term   := factor (('*' | '/' | '//' | '%') factor)*
//! factor := ('+' | '-') factor | power
//! power  := atom ('**' factor)?
//! atom   := NUMBER | NAME | NAME '(' expr (',' expr)* ')' | '(' expr ')'
//! ```
//!
//! Names are `frac`, the constants `pi e tau inf nan`, and a fixed set of
//! pure math functions. Nothing else resolves; there is no control flow,
//! assignment or attribute access. A formula is parsed once into a small
//! tree and then evaluated per fraction. Nesting and tree height are capped
//! at `MAX_DEPTH`.

use thiserror::Error;

/// Why a formula could not be compiled or evaluated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    #[error("formula may not contain newlines or comments")]
    Forbidden,
    #[error("unexpected character {0:?} at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("malformed number at offset {0}")]
    BadNumber(usize),
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("unexpected token at offset {0}")]
    UnexpectedToken(usize),
    #[error("unknown name `{0}`")]
    UnknownName(String),
    #[error("`{name}` takes {expected} argument(s), got {got}")]
    Arity {
        name: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("math domain error in `{0}`")]
    Domain(&'static str),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a number")]
    NotANumber,
    #[error("formula nests deeper than {} levels", MAX_DEPTH)]
    TooDeep,
}

/// Cap on parser nesting and on the height of the parsed tree. Evaluation
/// and drop recurse over the tree, so this bounds their stack use too.
pub const MAX_DEPTH: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Tok {
    Num(f64),
    Name(usize, usize),
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

fn lex(src: &str) -> Result<Vec<(usize, Tok)>, ExprError> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        let tok = match c {
            b' ' | b'\t' | b'\r' => {
                i += 1;
                continue;
            }
            b'+' => Tok::Plus,
            b'-' => Tok::Minus,
            b'%' => Tok::Percent,
            b'(' => Tok::LParen,
            b')' => Tok::RParen,
            b',' => Tok::Comma,
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                i += 1;
                Tok::StarStar
            }
            b'*' => Tok::Star,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i += 1;
                Tok::SlashSlash
            }
            b'/' => Tok::Slash,
            b'0'..=b'9' | b'.' => {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.' || bytes[i] == b'_') {
                    i += 1;
                }
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    i += 1;
                    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
                        i += 1;
                    }
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = src[start..i].chars().filter(|&ch| ch != '_').collect();
                let v = text.parse::<f64>().map_err(|_| ExprError::BadNumber(start))?;
                out.push((start, Tok::Num(v)));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                out.push((start, Tok::Name(start, i)));
                continue;
            }
            _ => {
                let ch = src[i..].chars().next().unwrap_or('?');
                return Err(ExprError::UnexpectedChar(ch, i));
            }
        };
        out.push((start, tok));
        i += 1;
    }
    Ok(out)
}

/// Whitelisted functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Func {
    Sqrt,
    Exp,
    Log,
    Log2,
    Log10,
    Log1p,
    Expm1,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Floor,
    Ceil,
    Trunc,
    Abs,
    Min,
    Max,
    Pow,
    Round,
    Hypot,
    Degrees,
    Radians,
    Copysign,
    Fmod,
}

impl Func {
    fn lookup(name: &str) -> Option<(Func, &'static str)> {
        use Func::*;
        let f = match name {
            "sqrt" => (Sqrt, "sqrt"),
            "exp" => (Exp, "exp"),
            "log" => (Log, "log"),
            "log2" => (Log2, "log2"),
            "log10" => (Log10, "log10"),
            "log1p" => (Log1p, "log1p"),
            "expm1" => (Expm1, "expm1"),
            "sin" => (Sin, "sin"),
            "cos" => (Cos, "cos"),
            "tan" => (Tan, "tan"),
            "asin" => (Asin, "asin"),
            "acos" => (Acos, "acos"),
            "atan" => (Atan, "atan"),
            "atan2" => (Atan2, "atan2"),
            "sinh" => (Sinh, "sinh"),
            "cosh" => (Cosh, "cosh"),
            "tanh" => (Tanh, "tanh"),
            "floor" => (Floor, "floor"),
            "ceil" => (Ceil, "ceil"),
            "trunc" => (Trunc, "trunc"),
            "abs" => (Abs, "abs"),
            "fabs" => (Abs, "fabs"),
            "min" => (Min, "min"),
            "max" => (Max, "max"),
            "pow" => (Pow, "pow"),
            "round" => (Round, "round"),
            "hypot" => (Hypot, "hypot"),
            "degrees" => (Degrees, "degrees"),
            "radians" => (Radians, "radians"),
            "copysign" => (Copysign, "copysign"),
            "fmod" => (Fmod, "fmod"),
            _ => return None,
        };
        Some(f)
    }

    /// Accepted argument counts, inclusive; `usize::MAX` means variadic.
    fn arity(self) -> (usize, usize, &'static str) {
        use Func::*;
        match self {
            Atan2 | Pow | Hypot | Copysign | Fmod => (2, 2, "2"),
            Log | Round => (1, 2, "1 or 2"),
            Min | Max => (2, usize::MAX, "at least 2"),
            _ => (1, 1, "1"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Num(f64),
    Frac,
    Neg(Box<Node>),
    Bin(BinOp, Box<Node>, Box<Node>),
    Call(Func, &'static str, Vec<Node>),
}

impl Node {
    fn height(&self) -> usize {
        match self {
            Node::Num(_) | Node::Frac => 1,
            Node::Neg(inner) => inner.height() + 1,
            Node::Bin(_, l, r) => l.height().max(r.height()) + 1,
            Node::Call(_, _, args) => args.iter().map(Node::height).max().unwrap_or(0) + 1,
        }
    }
}

fn within_depth(height: usize) -> Result<usize, ExprError> {
    if height > MAX_DEPTH { Err(ExprError::TooDeep) } else { Ok(height) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

struct Parser<'a> {
    src: &'a str,
    toks: Vec<(usize, Tok)>,
    at: usize,
    nest: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Tok> {
        self.toks.get(self.at).map(|&(_, t)| t)
    }

    fn next(&mut self) -> Result<(usize, Tok), ExprError> {
        let t = self.toks.get(self.at).copied().ok_or(ExprError::UnexpectedEnd)?;
        self.at += 1;
        Ok(t)
    }

    fn expect(&mut self, want: Tok) -> Result<(), ExprError> {
        let (off, t) = self.next()?;
        if t == want { Ok(()) } else { Err(ExprError::UnexpectedToken(off)) }
    }

    fn expr(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.term()?;
        let mut height = lhs.height();
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => BinOp::Add,
                Some(Tok::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.at += 1;
            let rhs = self.term()?;
            height = within_depth(height.max(rhs.height()) + 1)?;
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.factor()?;
        let mut height = lhs.height();
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => BinOp::Mul,
                Some(Tok::Slash) => BinOp::Div,
                Some(Tok::SlashSlash) => BinOp::FloorDiv,
                Some(Tok::Percent) => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.at += 1;
            let rhs = self.factor()?;
            height = within_depth(height.max(rhs.height()) + 1)?;
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
        }
    }

    /// Every recursive descent passes through here, so this is where
    /// nesting is counted.
    fn factor(&mut self) -> Result<Node, ExprError> {
        self.nest += 1;
        if self.nest > MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        let out = self.unary();
        self.nest -= 1;
        out
    }

    fn unary(&mut self) -> Result<Node, ExprError> {
        match self.peek() {
            Some(Tok::Minus) => {
                self.at += 1;
                let inner = self.factor()?;
                within_depth(inner.height() + 1)?;
                Ok(Node::Neg(Box::new(inner)))
            }
            Some(Tok::Plus) => {
                self.at += 1;
                self.factor()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Node, ExprError> {
        let base = self.atom()?;
        if self.peek() == Some(Tok::StarStar) {
            self.at += 1;
            let exp = self.factor()?;
            within_depth(base.height().max(exp.height()) + 1)?;
            return Ok(Node::Bin(BinOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Node, ExprError> {
        let (off, t) = self.next()?;
        match t {
            Tok::Num(v) => Ok(Node::Num(v)),
            Tok::LParen => {
                let inner = self.expr()?;
                self.expect(Tok::RParen)?;
                Ok(inner)
            }
            Tok::Name(a, b) => {
                let name = &self.src[a..b];
                if self.peek() == Some(Tok::LParen) {
                    self.at += 1;
                    return self.call(name);
                }
                match name {
                    "frac" => Ok(Node::Frac),
                    "pi" => Ok(Node::Num(std::f64::consts::PI)),
                    "e" => Ok(Node::Num(std::f64::consts::E)),
                    "tau" => Ok(Node::Num(std::f64::consts::TAU)),
                    "inf" => Ok(Node::Num(f64::INFINITY)),
                    "nan" => Ok(Node::Num(f64::NAN)),
                    _ => Err(ExprError::UnknownName(name.to_owned())),
                }
            }
            _ => Err(ExprError::UnexpectedToken(off)),
        }
    }

    fn call(&mut self, name: &str) -> Result<Node, ExprError> {
        let (func, fname) = Func::lookup(name).ok_or_else(|| ExprError::UnknownName(name.to_owned()))?;
        let mut args = Vec::new();
        if self.peek() != Some(Tok::RParen) {
            loop {
                args.push(self.expr()?);
                if self.peek() == Some(Tok::Comma) {
                    self.at += 1;
                    continue;
                }
                break;
            }
        }
        self.expect(Tok::RParen)?;
        let (lo, hi, expected) = func.arity();
        if args.len() < lo || args.len() > hi {
            return Err(ExprError::Arity {
                name: fname,
                expected,
                got: args.len(),
            });
        }
        let node = Node::Call(func, fname, args);
        within_depth(node.height())?;
        Ok(node)
    }
}

/// Python-style float modulo: the result takes the sign of the divisor.
fn py_mod(a: f64, b: f64) -> Result<f64, ExprError> {
    if b == 0.0 {
        return Err(ExprError::DivisionByZero);
    }
    let r = a % b;
    Ok(if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r })
}

fn py_pow(a: f64, b: f64, name: &'static str) -> Result<f64, ExprError> {
    if a == 0.0 && b < 0.0 {
        return Err(ExprError::DivisionByZero);
    }
    if a < 0.0 && b.fract() != 0.0 && b.is_finite() {
        return Err(ExprError::Domain(name));
    }
    Ok(a.powf(b))
}

fn eval_node(node: &Node, frac: f64) -> Result<f64, ExprError> {
    Ok(match node {
        Node::Num(v) => *v,
        Node::Frac => frac,
        Node::Neg(inner) => -eval_node(inner, frac)?,
        Node::Bin(op, l, r) => {
            let a = eval_node(l, frac)?;
            let b = eval_node(r, frac)?;
            match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div if b == 0.0 => return Err(ExprError::DivisionByZero),
                BinOp::Div => a / b,
                BinOp::FloorDiv if b == 0.0 => return Err(ExprError::DivisionByZero),
                BinOp::FloorDiv => (a / b).floor(),
                BinOp::Mod => py_mod(a, b)?,
                BinOp::Pow => py_pow(a, b, "**")?,
            }
        }
        Node::Call(func, name, args) => {
            let vals = args
                .iter()
                .map(|n| eval_node(n, frac))
                .collect::<Result<Vec<_>, _>>()?;
            apply(*func, name, &vals)?
        }
    })
}

fn apply(func: Func, name: &'static str, v: &[f64]) -> Result<f64, ExprError> {
    use Func::*;
    let x = v[0];
    let domain = |ok: bool, y: f64| if ok { Ok(y) } else { Err(ExprError::Domain(name)) };
    match func {
        Sqrt => domain(x >= 0.0, x.sqrt()),
        Exp => Ok(x.exp()),
        Log => {
            let ln = domain(x > 0.0, x.ln())?;
            match v.get(1) {
                None => Ok(ln),
                Some(&base) if base > 0.0 && base != 1.0 => Ok(ln / base.ln()),
                Some(_) => Err(ExprError::Domain(name)),
            }
        }
        Log2 => domain(x > 0.0, x.log2()),
        Log10 => domain(x > 0.0, x.log10()),
        Log1p => domain(x > -1.0, x.ln_1p()),
        Expm1 => Ok(x.exp_m1()),
        Sin => Ok(x.sin()),
        Cos => Ok(x.cos()),
        Tan => Ok(x.tan()),
        Asin => domain((-1.0..=1.0).contains(&x), x.asin()),
        Acos => domain((-1.0..=1.0).contains(&x), x.acos()),
        Atan => Ok(x.atan()),
        Atan2 => Ok(x.atan2(v[1])),
        Sinh => Ok(x.sinh()),
        Cosh => Ok(x.cosh()),
        Tanh => Ok(x.tanh()),
        Floor => Ok(x.floor()),
        Ceil => Ok(x.ceil()),
        Trunc => Ok(x.trunc()),
        Abs => Ok(x.abs()),
        Min => Ok(v.iter().copied().fold(f64::INFINITY, f64::min)),
        Max => Ok(v.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        Pow => py_pow(x, v[1], name),
        Round => match v.get(1) {
            None => Ok(x.round_ties_even()),
            Some(&digits) => {
                let scale = 10f64.powi(digits.trunc() as i32);
                Ok((x * scale).round_ties_even() / scale)
            }
        },
        Hypot => Ok(x.hypot(v[1])),
        Degrees => Ok(x.to_degrees()),
        Radians => Ok(x.to_radians()),
        Copysign => Ok(x.copysign(v[1])),
        Fmod if v[1] == 0.0 => Err(ExprError::Domain(name)),
        Fmod => Ok(x % v[1]),
    }
}

/// A compiled formula `U(frac)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Formula {
    source: String,
    root: Node,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        if source.contains(['\n', '#']) {
            return Err(ExprError::Forbidden);
        }
        let trimmed = source.trim();
        let mut p = Parser {
            src: trimmed,
            toks: lex(trimmed)?,
            at: 0,
            nest: 0,
        };
        let root = p.expr()?;
        if let Some(&(off, _)) = p.toks.get(p.at) {
            return Err(ExprError::UnexpectedToken(off));
        }
        Ok(Self {
            source: source.to_owned(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate with `frac` bound. NaN results are rejected.
    pub fn eval(&self, frac: f64) -> Result<f64, ExprError> {
        let v = eval_node(&self.root, frac)?;
        if v.is_nan() { Err(ExprError::NotANumber) } else { Ok(v) }
    }
}
