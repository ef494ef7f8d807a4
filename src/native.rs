//! Conversion between host-native JSON values and terms.
//!
//! JSON has no notion of a logic variable, so `construct` only ever produces
//! ground terms and `deconstruct` refuses terms that still contain one.

use crate::error::{Error, Result};
use crate::term::{Constant, Record, Sequence, Term};
use serde_json::{Map, Number, Value};

/// Convert a JSON value into a term.
///
/// Arrays become proper sequences and objects become records. Integers must
/// fit in an `i64`.
///
/// Object keys are interned in the process-wide symbol table and never freed.
/// Repeated keys cost nothing, but ingesting JSON with unbounded distinct keys
/// grows memory for the life of the process.
pub fn construct(value: &Value) -> Result<Term> {
    Ok(match value {
        Value::Null => Term::unit(),
        Value::Bool(b) => Term::from(*b),
        Value::Number(n) => construct_number(n)?,
        Value::String(s) => Term::from(s.as_str()),
        Value::Array(items) => Term::list(
            items
                .iter()
                .map(construct)
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Object(fields) => Term::Record(Record::new(
            fields
                .iter()
                .map(|(k, v)| Ok((k.as_str(), construct(v)?)))
                .collect::<Result<Vec<_>>>()?,
        )),
    })
}

fn construct_number(n: &Number) -> Result<Term> {
    if let Some(i) = n.as_i64() {
        return Ok(Term::from(i));
    }
    if n.is_u64() {
        return Err(Error::NotConstructible(format!(
            "{} does not fit in a 64-bit signed integer",
            n
        )));
    }
    n.as_f64()
        .map(Term::from)
        .ok_or_else(|| Error::NotConstructible(format!("{} is not a representable number", n)))
}

/// Convert a term back into a JSON value.
pub fn deconstruct(term: &Term) -> Result<Value> {
    match term {
        Term::Const(c) => deconstruct_constant(c),
        Term::Var(v) => Err(Error::UnboundVariable(v.clone())),
        Term::Record(r) => {
            let mut out = Map::new();
            for (key, value) in r.iter() {
                out.insert(key.as_str().to_string(), deconstruct(value)?);
            }
            Ok(Value::Object(out))
        }
        Term::Seq(seq) => {
            let items = seq.iter().map(deconstruct).collect::<Result<Vec<_>>>()?;
            match seq.end() {
                Term::Seq(Sequence::Null) => Ok(Value::Array(items)),
                Term::Var(v) => Err(Error::UnboundVariable(v)),
                other => Err(Error::NotConstructible(format!(
                    "{} ends in {} instead of a list",
                    seq, other
                ))),
            }
        }
    }
}

fn deconstruct_constant(c: &Constant) -> Result<Value> {
    Ok(match c {
        Constant::Unit => Value::Null,
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Int(i) => Value::from(*i),
        Constant::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| Error::NotConstructible(format!("{} has no JSON form", f)))?,
        Constant::Str(s) => Value::String(s.to_string()),
    })
}

impl TryFrom<&Value> for Term {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        construct(value)
    }
}

impl TryFrom<&Term> for Value {
    type Error = Error;

    fn try_from(term: &Term) -> Result<Self> {
        deconstruct(term)
    }
}

#[cfg(test)]
#[path = "tests/native.rs"]
mod tests;
