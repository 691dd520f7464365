//! Filter expression language.
//!
//! A query is parsed once (grammar in `query.pest`) into an [`Expr`] tree in
//! which every identifier is already resolved to a [`Field`]. Evaluation then
//! walks the tree against anything implementing [`Bindings`], so the cost per
//! item is proportional to the size of the expression and nothing is re-parsed.
//!
//! The only free variables are the item fields; there is no other name
//! resolution and no way to reach outside the item being tested.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use lazy_static::lazy_static;
use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;
use regex::Regex;

use crate::error::{ApidexError, Result};

#[derive(Parser)]
#[grammar = "query.pest"]
pub struct QueryParser;

lazy_static! {
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::prefix(Rule::not))
        .op(Op::infix(Rule::eq, Assoc::Left) | Op::infix(Rule::ne, Assoc::Left))
        .op(Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left)
            | Op::infix(Rule::contains, Assoc::Left)
            | Op::infix(Rule::startswith, Assoc::Left)
            | Op::infix(Rule::endswith, Assoc::Left)
            | Op::infix(Rule::matches, Assoc::Left))
        .op(Op::prefix(Rule::bang))
        .op(Op::postfix(Rule::call) | Op::postfix(Rule::property));
}

// ------------- Fields -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    MemberType,
    ValueType,
    ClassName,
    Inheritance,
    Unreplicated,
    Deprecated,
    Hidden,
    Unscriptable,
    Security,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Name,
        Field::MemberType,
        Field::ValueType,
        Field::ClassName,
        Field::Inheritance,
        Field::Unreplicated,
        Field::Deprecated,
        Field::Hidden,
        Field::Unscriptable,
        Field::Security,
    ];

    /// Resolves a name as written in a query. `memberType` is accepted as an
    /// alias of `type`.
    pub fn from_name(name: &str) -> Option<Field> {
        match name {
            "name" => Some(Field::Name),
            "type" | "memberType" => Some(Field::MemberType),
            "valueType" => Some(Field::ValueType),
            "className" => Some(Field::ClassName),
            "inheritance" => Some(Field::Inheritance),
            "unreplicated" => Some(Field::Unreplicated),
            "deprecated" => Some(Field::Deprecated),
            "hidden" => Some(Field::Hidden),
            "unscriptable" => Some(Field::Unscriptable),
            "security" => Some(Field::Security),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::MemberType => "type",
            Field::ValueType => "valueType",
            Field::ClassName => "className",
            Field::Inheritance => "inheritance",
            Field::Unreplicated => "unreplicated",
            Field::Deprecated => "deprecated",
            Field::Hidden => "hidden",
            Field::Unscriptable => "unscriptable",
            Field::Security => "security",
        }
    }
}

/// The fixed-shape record a query is evaluated against.
pub trait Bindings {
    fn field(&self, field: Field) -> Value<'_>;
}

// ------------- Values -------------
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Number(f64),
    Str(Cow<'a, str>),
    List(&'a [String]),
}

impl<'a> Value<'a> {
    pub fn str(s: &'a str) -> Self {
        Value::Str(Cow::Borrowed(s))
    }
    pub fn opt_str(s: Option<&'a str>) -> Self {
        s.map_or(Value::Null, Value::str)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
        }
    }

    // Text view used by the string operations; null has none, booleans refuse.
    fn text(&self, op: &str) -> Result<Option<Cow<'a, str>>> {
        match self {
            Value::Null => Ok(None),
            Value::Str(s) => Ok(Some(s.clone())),
            Value::Number(n) => Ok(Some(Cow::Owned(format_number(*n)))),
            Value::List(l) => Ok(Some(Cow::Owned(l.join(",")))),
            Value::Bool(_) => Err(ApidexError::query(format!(
                "{op} is not defined on a boolean value"
            ))),
        }
    }

    pub fn loose_eq(&self, other: &Value<'_>) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Number(n), Value::Str(s)) | (Value::Str(s), Value::Number(n)) => {
                s.trim().parse::<f64>().is_ok_and(|parsed| parsed == *n)
            }
            (Value::List(a), Value::List(b)) => a == b,
            (Value::List(l), Value::Str(s)) | (Value::Str(s), Value::List(l)) => l.join(",") == *s,
            _ => false,
        }
    }

    pub fn ordering(&self, other: &Value<'_>) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.as_ref().cmp(b.as_ref())),
            (Value::Number(a), Value::Str(b)) => b.trim().parse::<f64>().ok()?.partial_cmp(a).map(Ordering::reverse),
            (Value::Str(a), Value::Number(b)) => a.trim().parse::<f64>().ok()?.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(l) => write!(f, "{}", l.join(",")),
        }
    }
}

// Integral numbers print without a fraction, so `3` matches "3" and not "3.0".
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ------------- Syntax tree -------------
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq, Ne, Lt, Lte, Gt, Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

impl TextOp {
    fn name(self) -> &'static str {
        match self {
            TextOp::Contains => "contains",
            TextOp::StartsWith => "startswith",
            TextOp::EndsWith => "endswith",
        }
    }
    fn apply(self, haystack: &str, needle: &str) -> bool {
        match self {
            TextOp::Contains => haystack.contains(needle),
            TextOp::StartsWith => haystack.starts_with(needle),
            TextOp::EndsWith => haystack.ends_with(needle),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOp {
    Lower,
    Upper,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Field(Field),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CompOp, Box<Expr>, Box<Expr>),
    Text(TextOp, Box<Expr>, Box<Expr>),
    Matches(Box<Expr>, Regex),
    Length(Box<Expr>),
    Case(CaseOp, Box<Expr>),
}

impl Expr {
    pub fn eval<'a>(&'a self, item: &'a dyn Bindings) -> Result<Value<'a>> {
        Ok(match self {
            Expr::Literal(literal) => match literal {
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s) => Value::str(s),
            },
            Expr::Field(field) => item.field(*field),
            Expr::Not(inner) => Value::Bool(!inner.eval(item)?.truthy()),
            Expr::And(lhs, rhs) => Value::Bool(lhs.eval(item)?.truthy() && rhs.eval(item)?.truthy()),
            Expr::Or(lhs, rhs) => Value::Bool(lhs.eval(item)?.truthy() || rhs.eval(item)?.truthy()),
            Expr::Compare(op, lhs, rhs) => {
                let (lhs, rhs) = (lhs.eval(item)?, rhs.eval(item)?);
                Value::Bool(match op {
                    CompOp::Eq => lhs.loose_eq(&rhs),
                    CompOp::Ne => !lhs.loose_eq(&rhs),
                    CompOp::Lt => lhs.ordering(&rhs) == Some(Ordering::Less),
                    CompOp::Lte => matches!(lhs.ordering(&rhs), Some(Ordering::Less | Ordering::Equal)),
                    CompOp::Gt => lhs.ordering(&rhs) == Some(Ordering::Greater),
                    CompOp::Gte => matches!(lhs.ordering(&rhs), Some(Ordering::Greater | Ordering::Equal)),
                })
            }
            Expr::Text(op, lhs, rhs) => {
                let haystack = lhs.eval(item)?;
                let needle = match rhs.eval(item)?.text(op.name())? {
                    Some(needle) => needle,
                    None => return Ok(Value::Bool(false)),
                };
                Value::Bool(match haystack {
                    Value::List(names) => names.iter().any(|n| op.apply(n, &needle)),
                    other => other.text(op.name())?.is_some_and(|h| op.apply(&h, &needle)),
                })
            }
            Expr::Matches(lhs, regex) => Value::Bool(match lhs.eval(item)? {
                Value::List(names) => names.iter().any(|n| regex.is_match(n)),
                other => other.text("matches")?.is_some_and(|h| regex.is_match(&h)),
            }),
            Expr::Length(inner) => match inner.eval(item)? {
                Value::Null => Value::Null,
                Value::Str(s) => Value::Number(s.chars().count() as f64),
                Value::List(l) => Value::Number(l.len() as f64),
                other => {
                    return Err(ApidexError::query(format!(
                        "length is not defined on a {} value",
                        other.type_name()
                    )));
                }
            },
            Expr::Case(op, inner) => match inner.eval(item)?.text("case conversion")? {
                None => Value::Null,
                Some(text) => Value::Str(Cow::Owned(match op {
                    CaseOp::Lower => text.to_lowercase(),
                    CaseOp::Upper => text.to_uppercase(),
                })),
            },
        })
    }
}

// ------------- Parsing -------------
fn unknown_rule(rule: Rule) -> ApidexError {
    ApidexError::query(format!("Unexpected token: {rule:?}"))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn parse_primary(pair: Pair<Rule>) -> Result<Expr> {
    match pair.as_rule() {
        Rule::expr => parse_expr(pair.into_inner()),
        Rule::number => {
            let n = pair
                .as_str()
                .parse::<f64>()
                .map_err(|e| ApidexError::query(format!("Invalid number {}: {e}", pair.as_str())))?;
            Ok(Expr::Literal(Literal::Number(n)))
        }
        Rule::string => {
            let inner = pair.into_inner().next().map(|p| p.as_str()).unwrap_or_default();
            Ok(Expr::Literal(Literal::Str(unescape(inner))))
        }
        Rule::boolean => Ok(Expr::Literal(Literal::Bool(pair.as_str() == "true"))),
        Rule::null => Ok(Expr::Literal(Literal::Null)),
        Rule::ident => {
            let name = pair.as_str();
            Field::from_name(name).map(Expr::Field).ok_or_else(|| {
                let available: Vec<&str> = Field::ALL.iter().map(|f| f.name()).collect();
                ApidexError::query(format!(
                    "Unknown field '{name}' (available: {})",
                    available.join(", ")
                ))
            })
        }
        r => Err(unknown_rule(r)),
    }
}

fn regex_argument(pattern: Expr) -> Result<Regex> {
    match pattern {
        Expr::Literal(Literal::Str(pattern)) => Regex::new(&pattern)
            .map_err(|e| ApidexError::query(format!("Invalid regular expression: {e}"))),
        _ => Err(ApidexError::query("matches expects a string literal pattern")),
    }
}

fn parse_infix(lhs: Expr, op: Pair<Rule>, rhs: Expr) -> Result<Expr> {
    let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
    Ok(match op.as_rule() {
        Rule::or => Expr::Or(lhs, rhs),
        Rule::and => Expr::And(lhs, rhs),
        Rule::eq => Expr::Compare(CompOp::Eq, lhs, rhs),
        Rule::ne => Expr::Compare(CompOp::Ne, lhs, rhs),
        Rule::lt => Expr::Compare(CompOp::Lt, lhs, rhs),
        Rule::le => Expr::Compare(CompOp::Lte, lhs, rhs),
        Rule::gt => Expr::Compare(CompOp::Gt, lhs, rhs),
        Rule::ge => Expr::Compare(CompOp::Gte, lhs, rhs),
        Rule::contains => Expr::Text(TextOp::Contains, lhs, rhs),
        Rule::startswith => Expr::Text(TextOp::StartsWith, lhs, rhs),
        Rule::endswith => Expr::Text(TextOp::EndsWith, lhs, rhs),
        Rule::matches => Expr::Matches(lhs, regex_argument(*rhs)?),
        r => return Err(unknown_rule(r)),
    })
}

fn parse_postfix(lhs: Expr, op: Pair<Rule>) -> Result<Expr> {
    let rule = op.as_rule();
    let mut inner = op.into_inner();
    let name = inner.next().map(|p| p.as_str()).unwrap_or_default();
    match rule {
        Rule::property => match name {
            "length" => Ok(Expr::Length(Box::new(lhs))),
            _ => Err(ApidexError::query(format!("Unknown property '{name}'"))),
        },
        Rule::call => {
            let mut args = inner.map(|p| parse_expr(p.into_inner())).collect::<Result<Vec<_>>>()?;
            let expected = match name {
                "includes" | "contains" | "startsWith" | "endsWith" | "matches" => 1,
                "toLowerCase" | "toUpperCase" => 0,
                _ => return Err(ApidexError::query(format!("Unknown method '{name}'"))),
            };
            if args.len() != expected {
                return Err(ApidexError::query(format!(
                    "{name} expects {expected} argument(s), got {}",
                    args.len()
                )));
            }
            let lhs = Box::new(lhs);
            Ok(match name {
                "toLowerCase" => Expr::Case(CaseOp::Lower, lhs),
                "toUpperCase" => Expr::Case(CaseOp::Upper, lhs),
                _ => {
                    let arg = args.remove(0);
                    match name {
                        "startsWith" => Expr::Text(TextOp::StartsWith, lhs, Box::new(arg)),
                        "endsWith" => Expr::Text(TextOp::EndsWith, lhs, Box::new(arg)),
                        "matches" => Expr::Matches(lhs, regex_argument(arg)?),
                        _ => Expr::Text(TextOp::Contains, lhs, Box::new(arg)),
                    }
                }
            })
        }
        r => Err(unknown_rule(r)),
    }
}

fn parse_expr(pairs: Pairs<Rule>) -> Result<Expr> {
    PRATT_PARSER
        .map_primary(parse_primary)
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::not | Rule::bang => Ok(Expr::Not(Box::new(rhs?))),
            r => Err(unknown_rule(r)),
        })
        .map_postfix(|lhs, op| parse_postfix(lhs?, op))
        .map_infix(|lhs, op, rhs| parse_infix(lhs?, op, rhs?))
        .parse(pairs)
}

/// Deepest grouping (parentheses plus stacked negations) a query may use.
pub const MAX_NESTING: usize = 64;
/// Most tokens a query may have; bounds the depth of operator chains.
pub const MAX_TOKENS: usize = 512;

// Parsing, evaluation and dropping of the tree all recurse per level, so
// oversized input is rejected before the grammar sees it.
fn check_size(input: &str) -> Result<()> {
    let mut chars = input.chars().peekable();
    let (mut depth, mut negations, mut tokens) = (0usize, 0usize, 0usize);
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        tokens += 1;
        match c {
            '"' | '\'' => {
                while let Some(next) = chars.next() {
                    if next == '\\' {
                        chars.next();
                    } else if next == c {
                        break;
                    }
                }
                negations = 0;
            }
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                negations = 0;
            }
            '!' if chars.peek() != Some(&'=') => negations += 1,
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !(next.is_alphanumeric() || next == '_') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                if word.eq_ignore_ascii_case("not") {
                    negations += 1;
                } else {
                    negations = 0;
                }
            }
            _ => negations = 0,
        }
        if depth + negations > MAX_NESTING {
            return Err(ApidexError::query("Query is nested too deeply"));
        }
        if tokens > MAX_TOKENS {
            return Err(ApidexError::query("Query is too long"));
        }
    }
    Ok(())
}

/// Parses a non-empty query into its expression tree.
pub fn parse(input: &str) -> Result<Expr> {
    check_size(input)?;
    let query = QueryParser::parse(Rule::query, input)?
        .next()
        .ok_or_else(|| ApidexError::query("Empty query"))?;
    let expr = query
        .into_inner()
        .next()
        .ok_or_else(|| ApidexError::query("Empty query"))?;
    parse_expr(expr.into_inner())
}

// ------------- Compiled queries -------------
/// A query ready to be run against many items. Blank queries match everything.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    source: String,
    expr: Option<Expr>,
}

impl CompiledQuery {
    pub fn compile(query: &str) -> Result<Self> {
        let trimmed = query.trim();
        let expr = if trimmed.is_empty() { None } else { Some(parse(trimmed)?) };
        Ok(Self { source: trimmed.to_string(), expr })
    }
    pub fn source(&self) -> &str {
        &self.source
    }
    pub fn matches_all(&self) -> bool {
        self.expr.is_none()
    }
    pub fn matches(&self, item: &dyn Bindings) -> Result<bool> {
        match &self.expr {
            None => Ok(true),
            Some(expr) => Ok(expr.eval(item)?.truthy()),
        }
    }
}

/// One-shot evaluation, compiling `query` on every call.
pub fn evaluate(item: &dyn Bindings, query: &str) -> Result<bool> {
    CompiledQuery::compile(query)?.matches(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        name: &'static str,
        member_type: &'static str,
        value_type: Option<&'static str>,
        inheritance: Vec<String>,
        deprecated: bool,
        hidden: bool,
        security: Option<&'static str>,
    }

    impl Bindings for Item {
        fn field(&self, field: Field) -> Value<'_> {
            match field {
                Field::Name => Value::str(self.name),
                Field::MemberType => Value::str(self.member_type),
                Field::ValueType => Value::opt_str(self.value_type),
                Field::ClassName => Value::str("Part"),
                Field::Inheritance => Value::List(&self.inheritance),
                Field::Unreplicated | Field::Unscriptable => Value::Bool(false),
                Field::Deprecated => Value::Bool(self.deprecated),
                Field::Hidden => Value::Bool(self.hidden),
                Field::Security => Value::opt_str(self.security),
            }
        }
    }

    fn item() -> Item {
        Item {
            name: "BrickColor",
            member_type: "Property",
            value_type: Some("BrickColor"),
            inheritance: vec!["BasePart".into(), "PVInstance".into(), "Instance".into()],
            deprecated: true,
            hidden: false,
            security: None,
        }
    }

    fn eval(query: &str) -> bool {
        evaluate(&item(), query).unwrap_or_else(|e| panic!("query {query} failed: {e}"))
    }

    #[test]
    fn blank_matches_everything() {
        assert!(eval(""));
        assert!(eval("   \t"));
        assert!(CompiledQuery::compile(" ").unwrap().matches_all());
    }

    #[test]
    fn boolean_fields() {
        assert!(eval("deprecated"));
        assert!(eval("deprecated == true"));
        assert!(!eval("hidden"));
        assert!(eval("!hidden"));
        assert!(eval("not hidden and deprecated"));
        assert!(eval("hidden || deprecated"));
        assert!(!eval("hidden OR NOT deprecated"));
    }

    #[test]
    fn equality_and_strings() {
        assert!(eval("type == \"Property\""));
        assert!(eval("memberType === 'Property'"));
        assert!(eval("type != 'Function'"));
        assert!(eval("name.includes(\"Color\")"));
        assert!(eval("name contains 'Brick' && className == 'Part'"));
        assert!(eval("name.startsWith('Brick') and name endswith 'Color'"));
        assert!(eval("name.toLowerCase() == 'brickcolor'"));
        assert!(eval("name.length == 10"));
        assert!(eval("name matches '^Br.*r$'"));
    }

    #[test]
    fn null_fields_are_falsy() {
        assert!(!eval("security"));
        assert!(eval("security == null"));
        assert!(!eval("security contains 'Plugin'"));
        assert!(!eval("security.includes('Plugin')"));
    }

    #[test]
    fn inheritance_list() {
        assert!(eval("inheritance"));
        assert!(eval("inheritance.includes('Instance')"));
        assert!(eval("inheritance contains 'PV'"));
        assert!(eval("inheritance == 'BasePart,PVInstance,Instance'"));
        assert!(eval("inheritance.length == 3"));
        assert!(!eval("inheritance contains 'Model'"));
    }

    #[test]
    fn comparisons_and_grouping() {
        assert!(eval("name > 'A' && name < 'C'"));
        assert!(eval("(hidden || deprecated) && type == 'Property'"));
        assert!(!eval("hidden || deprecated && type == 'Function'"));
        assert!(eval("name.length >= 10 && name.length <= 10"));
        assert!(!eval("valueType > 3"));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = evaluate(&item(), "window.alert('x')").unwrap_err();
        assert!(format!("{err}").contains("Unknown field 'window'"));
        let err = evaluate(&item(), "name.eval()").unwrap_err();
        assert!(format!("{err}").contains("Unknown method"));
        let err = evaluate(&item(), "name.size").unwrap_err();
        assert!(format!("{err}").contains("Unknown property"));
    }

    #[test]
    fn syntax_errors_carry_position() {
        let err = evaluate(&item(), "(deprecated && hidden").unwrap_err();
        match err {
            ApidexError::Query { line, col, .. } => {
                assert_eq!(line, Some(1));
                assert!(col.is_some());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(evaluate(&item(), "name ==").is_err());
        assert!(evaluate(&item(), "name matches '('").is_err());
    }

    #[test]
    fn not_keyword_negates_comparisons() {
        assert!(!eval("not name contains 'Brick'"));
        assert!(eval("not type == 'Function'"));
        assert!(eval("NOT hidden AND deprecated"));
        assert!(!eval("not deprecated and type == 'Property'"));
        assert!(eval("!hidden && !(type == 'Event')"));
        // `!` stays tight: this negates `name` before the comparison
        assert!(evaluate(&item(), "!name contains 'Brick'").is_err());
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = format!("{}hidden{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(!eval(&nested));
        assert!(eval(&format!("{}deprecated", "!!".repeat(MAX_NESTING / 4))));

        let too_deep = format!("{}hidden{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        let err = evaluate(&item(), &too_deep).unwrap_err();
        assert!(format!("{err}").contains("nested too deeply"));
        let negations = format!("{}deprecated", "not ".repeat(MAX_NESTING + 1));
        assert!(evaluate(&item(), &negations).unwrap_err().is_query());
        let chain = vec!["deprecated"; MAX_TOKENS].join(" && ");
        assert!(format!("{}", evaluate(&item(), &chain).unwrap_err()).contains("too long"));
        // parentheses inside strings do not count
        assert!(!eval(&format!("name == '{}'", "(".repeat(MAX_NESTING * 2))));
    }

    #[test]
    fn text_operations_on_booleans_fail_at_runtime() {
        let compiled = CompiledQuery::compile("deprecated.includes('x')").unwrap();
        let err = compiled.matches(&item()).unwrap_err();
        assert!(err.is_query());
    }

    #[test]
    fn numbers_compare_with_strings() {
        assert!(Value::Number(3.0).loose_eq(&Value::str("3")));
        assert!(!Value::Number(3.0).loose_eq(&Value::Bool(true)));
        assert_eq!(Value::Number(2.0).ordering(&Value::str("10")), Some(Ordering::Less));
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.5), "0.5");
    }
}
