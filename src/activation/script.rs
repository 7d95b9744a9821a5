// Nyseal — Module script runtime
//
// Interpreted modules decrypt to a small declarative language:
//
//   # comments run to end of line
//   use Glyph, SymbolicTrace              # names that must already be in scope
//   type SymbolicMemory(traces, library)  # record type
//   type CompositeTrace(parents) extends SymbolicTrace
//   let DEFAULT_DEPTH = 6
//   let seeds = ["Elun", "Depth"]
//   let config = { depth: DEFAULT_DEPTH, mode: "symbolic" }
//   let quote = "the \"first\" glyph\n"      # escapes: \" \\ \n \t
//   let origin = SymbolicTrace { glyphs: seeds, label: "origin" }
//
// Every name a script references must resolve against its namespace: the
// base environment, the module's declared imports, or its own earlier
// bindings.

use std::collections::BTreeMap;
use std::sync::Arc;

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while, take_while1},
    character::complete::{char, multispace1},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::{many0, separated_list0, separated_list1},
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

use super::value::{Instance, Namespace, TypeDef, Value};
use super::ScriptError;

// ─── Runtime ─────────────────────────────────────────────────────────────────

/// Executes decrypted module source against a namespace.
pub trait ModuleRuntime {
    fn execute(&self, module: &str, source: &str, namespace: &mut Namespace)
        -> Result<(), ScriptError>;
}

/// Runtime for the built-in module script language.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptRuntime;

impl ModuleRuntime for ScriptRuntime {
    fn execute(
        &self,
        module: &str,
        source: &str,
        namespace: &mut Namespace,
    ) -> Result<(), ScriptError> {
        let program = parse(source)?;
        tracing::trace!(module = %module, statements = program.len(), "Executing module script");
        for stmt in program {
            exec(stmt, namespace)?;
        }
        Ok(())
    }
}

fn exec(stmt: Stmt, ns: &mut Namespace) -> Result<(), ScriptError> {
    match stmt {
        Stmt::Use(names) => {
            if let Some(missing) = names.into_iter().find(|n| !ns.contains(n)) {
                return Err(ScriptError::Unresolved(missing));
            }
        }
        Stmt::Type {
            name,
            fields,
            parent,
        } => {
            let mut all = match parent {
                Some(ref p) => lookup_type(ns, p)?.fields.clone(),
                None => Vec::new(),
            };
            for field in fields {
                if !all.contains(&field) {
                    all.push(field);
                }
            }
            let def = TypeDef {
                name: name.clone(),
                fields: all,
                parent,
            };
            ns.insert(name, Arc::new(Value::Type(def)));
        }
        Stmt::Let { name, expr } => {
            let value = eval(&expr, ns)?;
            ns.insert(name, Arc::new(value));
        }
    }
    Ok(())
}

fn eval(expr: &Expr, ns: &Namespace) -> Result<Value, ScriptError> {
    Ok(match expr {
        Expr::Text(s) => Value::Text(s.clone()),
        Expr::Number(n) => Value::Number(*n),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::List(items) => Value::List(
            items
                .iter()
                .map(|item| eval(item, ns))
                .collect::<Result<_, _>>()?,
        ),
        Expr::Record(fields) => Value::Record(eval_fields(fields, ns)?),
        Expr::Ref(name) => ns
            .get(name)
            .map(|symbol| symbol.as_ref().clone())
            .ok_or_else(|| ScriptError::Unresolved(name.clone()))?,
        Expr::Instance { type_name, fields } => {
            let def = lookup_type(ns, type_name)?;
            if let Some((field, _)) = fields.iter().find(|(f, _)| !def.has_field(f)) {
                return Err(ScriptError::UnknownField {
                    type_name: type_name.clone(),
                    field: field.clone(),
                });
            }
            Value::Instance(Instance {
                type_name: def.name.clone(),
                fields: eval_fields(fields, ns)?,
            })
        }
    })
}

fn eval_fields(
    fields: &[(String, Expr)],
    ns: &Namespace,
) -> Result<BTreeMap<String, Value>, ScriptError> {
    fields
        .iter()
        .map(|(k, v)| eval(v, ns).map(|value| (k.clone(), value)))
        .collect()
}

fn lookup_type<'a>(ns: &'a Namespace, name: &str) -> Result<&'a TypeDef, ScriptError> {
    ns.get(name)
        .ok_or_else(|| ScriptError::Unresolved(name.to_string()))?
        .as_type()
        .ok_or_else(|| ScriptError::NotAType(name.to_string()))
}

// ─── AST ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Stmt {
    Use(Vec<String>),
    Type {
        name: String,
        fields: Vec<String>,
        parent: Option<String>,
    },
    Let {
        name: String,
        expr: Expr,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<Expr>),
    Record(Vec<(String, Expr)>),
    Ref(String),
    Instance {
        type_name: String,
        fields: Vec<(String, Expr)>,
    },
}

// ─── Parser ──────────────────────────────────────────────────────────────────

fn parse(source: &str) -> Result<Vec<Stmt>, ScriptError> {
    match program(source) {
        Ok((_, stmts)) => Ok(stmts),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let offset = source.len() - e.input.len();
            let line = source[..offset].matches('\n').count() + 1;
            let near = e
                .input
                .lines()
                .next()
                .unwrap_or_default()
                .chars()
                .take(40)
                .collect();
            Err(ScriptError::Syntax { line, near })
        }
        Err(nom::Err::Incomplete(_)) => Err(ScriptError::Syntax {
            line: source.lines().count(),
            near: String::new(),
        }),
    }
}

fn program(input: &str) -> IResult<&str, Vec<Stmt>> {
    all_consuming(terminated(
        many0(preceded(ws, alt((use_stmt, type_stmt, let_stmt)))),
        ws,
    ))(input)
}

/// Whitespace and `#` comments
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(char('#'), take_while(|c: char| c != '\n'))),
        ))),
    )(input)
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(kw), multispace1)
}

fn sep<'a>(c: char) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    delimited(ws, char(c), ws)
}

fn ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn idents(input: &str) -> IResult<&str, Vec<String>> {
    map(separated_list0(sep(','), ident), |names| {
        names.into_iter().map(str::to_string).collect()
    })(input)
}

fn use_stmt(input: &str) -> IResult<&str, Stmt> {
    map(
        preceded(keyword("use"), separated_list1(sep(','), ident)),
        |names| Stmt::Use(names.into_iter().map(str::to_string).collect()),
    )(input)
}

fn type_stmt(input: &str) -> IResult<&str, Stmt> {
    map(
        tuple((
            preceded(keyword("type"), ident),
            preceded(
                ws,
                delimited(pair(char('('), ws), idents, pair(ws, char(')'))),
            ),
            opt(preceded(pair(ws, keyword("extends")), ident)),
        )),
        |(name, fields, parent)| Stmt::Type {
            name: name.to_string(),
            fields,
            parent: parent.map(str::to_string),
        },
    )(input)
}

fn let_stmt(input: &str) -> IResult<&str, Stmt> {
    map(
        pair(preceded(keyword("let"), ident), preceded(sep('='), expr)),
        |(name, expr)| Stmt::Let {
            name: name.to_string(),
            expr,
        },
    )(input)
}

fn expr(input: &str) -> IResult<&str, Expr> {
    alt((
        map(string_lit, Expr::Text),
        map(number, Expr::Number),
        map(list, Expr::List),
        map(record_body, Expr::Record),
        name_or_instance,
    ))(input)
}

fn string_lit(input: &str) -> IResult<&str, String> {
    let body = escaped_transform(
        is_not("\\\""),
        '\\',
        alt((
            value("\\", char('\\')),
            value("\"", char('"')),
            value("\n", char('n')),
            value("\t", char('t')),
        )),
    );
    delimited(
        char('"'),
        map(opt(body), Option::unwrap_or_default),
        char('"'),
    )(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    map_res(recognize_float, str::parse::<f64>)(input)
}

fn list(input: &str) -> IResult<&str, Vec<Expr>> {
    delimited(
        pair(char('['), ws),
        separated_list0(sep(','), expr),
        pair(ws, char(']')),
    )(input)
}

fn field(input: &str) -> IResult<&str, (String, Expr)> {
    map(separated_pair(ident, sep(':'), expr), |(k, v)| {
        (k.to_string(), v)
    })(input)
}

fn record_body(input: &str) -> IResult<&str, Vec<(String, Expr)>> {
    delimited(
        pair(char('{'), ws),
        separated_list0(sep(','), field),
        pair(ws, char('}')),
    )(input)
}

fn name_or_instance(input: &str) -> IResult<&str, Expr> {
    let (rest, name) = ident(input)?;
    match name {
        "true" => return Ok((rest, Expr::Bool(true))),
        "false" => return Ok((rest, Expr::Bool(false))),
        _ => {}
    }
    if let Ok((after, fields)) = preceded(ws, record_body)(rest) {
        return Ok((
            after,
            Expr::Instance {
                type_name: name.to_string(),
                fields,
            },
        ));
    }
    Ok((rest, Expr::Ref(name.to_string())))
}
