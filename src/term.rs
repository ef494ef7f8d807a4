use crate::error::{Error, Result};
use crate::symbol::Symbol;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An ordered set of variables.
///
/// Ordered so that anything derived from iterating one (injected goals,
/// solution maps, rendered equalities) is reproducible.
pub type VarSet = BTreeSet<Variable>;

/// An immutable scalar value.
#[derive(Clone, Debug)]
pub enum Constant {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
}

impl Constant {
    /// NaN is the only constant that cannot key a fixed class.
    pub fn is_hashable(&self) -> bool {
        !matches!(self, Constant::Float(f) if f.is_nan())
    }
}

impl Constant {
    /// Value equality as the unifier sees it: NaN matches nothing, itself
    /// included.
    pub fn same_value(&self, other: &Constant) -> bool {
        match (self, other) {
            (Constant::Float(a), Constant::Float(b)) => a == b,
            _ => self == other,
        }
    }
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constant::Unit, Constant::Unit) => true,
            (Constant::Bool(a), Constant::Bool(b)) => a == b,
            (Constant::Int(a), Constant::Int(b)) => a == b,
            // Reflexive on NaN so that `Eq` holds; NaN never reaches a
            // fixed class anyway.
            (Constant::Float(a), Constant::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Constant::Str(a), Constant::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Constant {}

impl Hash for Constant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Constant::Unit => {}
            Constant::Bool(b) => b.hash(state),
            Constant::Int(i) => i.hash(state),
            Constant::Float(f) => {
                // 0.0 == -0.0 and all NaNs are equal, so normalise both.
                let bits = if *f == 0.0 {
                    0.0f64.to_bits()
                } else if f.is_nan() {
                    f64::NAN.to_bits()
                } else {
                    f.to_bits()
                };
                bits.hash(state)
            }
            Constant::Str(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Unit => f.write_str("null"),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Float(x) => write!(f, "{:?}", x),
            Constant::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// A logic variable.
///
/// Identity is the name plus the frame the variable was renamed into; the
/// rest flag only affects how list literals are built and is not part of
/// identity.
#[derive(Clone)]
pub struct Variable {
    name: Symbol,
    frame: Option<u64>,
    rest: bool,
}

fn valid_variable_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| !c.is_lowercase())
}

impl Variable {
    /// Create a variable. Lowercase-initial names are atoms, not variables.
    pub fn new(name: &str) -> Result<Self> {
        if !valid_variable_name(name) {
            return Err(Error::InvalidVariableName(name.to_string()));
        }
        Ok(Self {
            name: Symbol::intern(name),
            frame: None,
            rest: false,
        })
    }

    /// Create several variables at once.
    pub fn factory<const N: usize>(names: [&str; N]) -> Result<[Variable; N]> {
        if let Some(bad) = names.iter().find(|n| !valid_variable_name(n)) {
            return Err(Error::InvalidVariableName(bad.to_string()));
        }
        Ok(names.map(|name| Self {
            name: Symbol::intern(name),
            frame: None,
            rest: false,
        }))
    }

    pub fn name(&self) -> &'static str {
        self.name.as_str()
    }

    pub fn symbol(&self) -> Symbol {
        self.name
    }

    pub fn frame(&self) -> Option<u64> {
        self.frame
    }

    pub fn is_rest(&self) -> bool {
        self.rest
    }

    /// The same variable, marked to capture the remainder of a list.
    pub fn rest(&self) -> Variable {
        Self {
            rest: true,
            ..self.clone()
        }
    }

    /// The same variable renamed into an activation frame.
    pub fn with_frame(&self, frame: u64) -> Variable {
        Self {
            frame: Some(frame),
            ..self.clone()
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.frame == other.frame
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.frame.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.frame.cmp(&other.frame))
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rest {
            f.write_str("*")?;
        }
        f.write_str(self.name.as_str())?;
        if let Some(frame) = self.frame {
            write!(f, ":{}", frame)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An immutable string-keyed mapping of terms.
///
/// Keys are kept sorted, which makes iteration, hashing, and unification
/// order independent of construction order.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Record {
    fields: Arc<BTreeMap<Symbol, Term>>,
}

impl Record {
    pub fn new<K: AsRef<str>>(fields: impl IntoIterator<Item = (K, Term)>) -> Self {
        Self::from_symbols(
            fields
                .into_iter()
                .map(|(key, value)| (Symbol::intern(key.as_ref()), value)),
        )
    }

    pub(crate) fn from_symbols(fields: impl IntoIterator<Item = (Symbol, Term)>) -> Self {
        Self {
            fields: Arc::new(fields.into_iter().collect()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Term> {
        self.fields.get(&Symbol::get(key)?)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Term> + '_ {
        self.fields.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &Term)> + '_ {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn same_keys(&self, other: &Record) -> bool {
        self.fields.len() == other.fields.len() && self.fields.keys().eq(other.fields.keys())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// One cell of a [`Sequence`].
///
/// The tail is normally another sequence. The last tail may instead be a
/// rest variable standing for the remainder of the list.
#[derive(Debug)]
pub struct Cons {
    head: Term,
    tail: Term,
}

// Unlink the tail chain one cell at a time so long lists do not drop
// recursively.
impl Drop for Cons {
    fn drop(&mut self) {
        let mut tail = std::mem::replace(&mut self.tail, Term::null());
        while let Term::Seq(Sequence::Cons(cell)) = tail {
            tail = match Arc::try_unwrap(cell) {
                Ok(mut cell) => std::mem::replace(&mut cell.tail, Term::null()),
                Err(_) => break,
            };
        }
    }
}

impl Cons {
    pub fn head(&self) -> &Term {
        &self.head
    }

    pub fn tail(&self) -> &Term {
        &self.tail
    }
}

/// A persistent cons list.
///
/// Comparison, hashing and drop walk the cells in a loop, so list length is
/// not bounded by the call stack.
#[derive(Clone)]
pub enum Sequence {
    Null,
    Cons(Arc<Cons>),
}

impl Sequence {
    pub fn cons(head: Term, tail: Term) -> Self {
        Sequence::Cons(Arc::new(Cons { head, tail }))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Sequence::Null)
    }

    /// The elements of the fixed prefix.
    pub fn iter(&self) -> SequenceIter<'_> {
        SequenceIter { current: Some(self) }
    }

    /// Number of cons cells before the end (or the open tail).
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.is_null()
    }

    /// The term after the last cons cell: `Null` for a proper list, the rest
    /// variable (or whatever it was bound to) otherwise.
    pub fn end(&self) -> Term {
        self.open_tail().cloned().unwrap_or_else(Term::null)
    }

    /// The non-list tail after the last cons cell, if there is one.
    pub fn open_tail(&self) -> Option<&Term> {
        let mut current = self;
        loop {
            match current {
                Sequence::Null => return None,
                Sequence::Cons(cell) => match &cell.tail {
                    Term::Seq(next) => current = next,
                    other => return Some(other),
                },
            }
        }
    }

    pub fn is_proper(&self) -> bool {
        self.open_tail().is_none()
    }

    /// Append `other` to this list. Only proper lists can be extended.
    pub fn concat(&self, other: &Sequence) -> Result<Sequence> {
        if !self.is_proper() {
            return Err(Error::NotConstructible(format!(
                "cannot append to {} because its tail is open",
                self
            )));
        }
        let items: Vec<&Term> = self.iter().collect();
        let mut out = other.clone();
        for item in items.into_iter().rev() {
            out = Sequence::cons(item.clone(), Term::Seq(out));
        }
        Ok(out)
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        let (mut a, mut b) = (self, other);
        loop {
            match (a, b) {
                (Sequence::Null, Sequence::Null) => return true,
                (Sequence::Cons(ca), Sequence::Cons(cb)) => {
                    if Arc::ptr_eq(ca, cb) {
                        return true;
                    }
                    if ca.head != cb.head {
                        return false;
                    }
                    match (&ca.tail, &cb.tail) {
                        (Term::Seq(na), Term::Seq(nb)) => {
                            a = na;
                            b = nb;
                        }
                        (ta, tb) => return ta == tb,
                    }
                }
                _ => return false,
            }
        }
    }
}

impl Eq for Sequence {}

impl Hash for Sequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut len = 0usize;
        for item in self.iter() {
            item.hash(state);
            len += 1;
        }
        len.hash(state);
        self.open_tail().hash(state);
    }
}

pub struct SequenceIter<'a> {
    current: Option<&'a Sequence>,
}

impl<'a> Iterator for SequenceIter<'a> {
    type Item = &'a Term;

    fn next(&mut self) -> Option<Self::Item> {
        match self.current? {
            Sequence::Null => {
                self.current = None;
                None
            }
            Sequence::Cons(cell) => {
                self.current = match &cell.tail {
                    Term::Seq(next) => Some(next),
                    _ => None,
                };
                Some(&cell.head)
            }
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", item)?;
        }
        match self.end() {
            Term::Seq(Sequence::Null) => {}
            open => write!(f, " | {}", open)?,
        }
        f.write_str("]")
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A term: constant, variable, record, or sequence.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    Const(Constant),
    Var(Variable),
    Record(Record),
    Seq(Sequence),
}

impl Term {
    pub fn unit() -> Term {
        Term::Const(Constant::Unit)
    }

    pub fn null() -> Term {
        Term::Seq(Sequence::Null)
    }

    pub fn record<K: AsRef<str>>(fields: impl IntoIterator<Item = (K, Term)>) -> Term {
        Term::Record(Record::new(fields))
    }

    /// Build a list term. A rest variable in last position becomes the open
    /// tail instead of an element, so `[*T]` on its own is just `T`.
    pub fn list(items: impl IntoIterator<Item = Term>) -> Term {
        let mut items: Vec<Term> = items.into_iter().collect();
        let tail = match items.last() {
            Some(Term::Var(v)) if v.is_rest() => items.pop().unwrap_or_else(Term::null),
            _ => Term::null(),
        };
        Term::list_with_tail(items, tail)
    }

    /// Cons `items` onto `tail`, last item first. With no items this is just
    /// `tail`.
    pub fn list_with_tail(items: Vec<Term>, tail: Term) -> Term {
        items
            .into_iter()
            .rev()
            .fold(tail, |tail, item| Term::Seq(Sequence::cons(item, tail)))
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Term::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Term::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Term::Seq(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Term::Const(Constant::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Term::Const(Constant::Float(f)) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Term::Const(Constant::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Term::Const(Constant::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// The integer value, or [`Error::TypeMismatch`]. For use inside host
    /// functions.
    pub fn to_int(&self) -> Result<i64> {
        self.as_int().ok_or_else(|| self.type_mismatch("integer"))
    }

    pub fn to_float(&self) -> Result<f64> {
        self.as_float().ok_or_else(|| self.type_mismatch("float"))
    }

    pub fn to_bool(&self) -> Result<bool> {
        self.as_bool().ok_or_else(|| self.type_mismatch("bool"))
    }

    pub fn to_sequence(&self) -> Result<&Sequence> {
        self.as_sequence().ok_or_else(|| self.type_mismatch("list"))
    }

    fn type_mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            found: self.clone(),
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    /// True if no variable occurs anywhere in the term.
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Const(_) => true,
            Term::Var(_) => false,
            Term::Record(r) => r.values().all(Term::is_ground),
            Term::Seq(s) => {
                s.iter().all(Term::is_ground) && s.open_tail().map_or(true, Term::is_ground)
            }
        }
    }

    /// False if a NaN occurs anywhere in the term.
    pub fn is_hashable(&self) -> bool {
        match self {
            Term::Const(c) => c.is_hashable(),
            Term::Var(_) => true,
            Term::Record(r) => r.values().all(Term::is_hashable),
            Term::Seq(s) => {
                s.iter().all(Term::is_hashable) && s.open_tail().map_or(true, Term::is_hashable)
            }
        }
    }

    /// All variables occurring in the term.
    pub fn variables(&self) -> VarSet {
        let mut out = VarSet::new();
        self.collect_variables(&mut out);
        out
    }

    pub fn collect_variables(&self, out: &mut VarSet) {
        match self {
            Term::Const(_) => {}
            Term::Var(v) => {
                if !out.contains(v) {
                    out.insert(v.clone());
                }
            }
            Term::Record(r) => {
                for value in r.values() {
                    value.collect_variables(out);
                }
            }
            Term::Seq(s) => {
                for item in s.iter() {
                    item.collect_variables(out);
                }
                if let Some(tail) = s.open_tail() {
                    tail.collect_variables(out);
                }
            }
        }
    }

    /// Rename every variable into `frame`.
    pub fn with_frame(&self, frame: u64) -> Term {
        match self {
            Term::Const(_) => self.clone(),
            Term::Var(v) => Term::Var(v.with_frame(frame)),
            Term::Record(r) => Term::Record(Record::from_symbols(
                r.iter().map(|(k, v)| (k, v.with_frame(frame))),
            )),
            Term::Seq(s) => Term::list_with_tail(
                s.iter().map(|item| item.with_frame(frame)).collect(),
                s.open_tail()
                    .map_or_else(Term::null, |tail| tail.with_frame(frame)),
            ),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Const(c) => fmt::Display::fmt(c, f),
            Term::Var(v) => fmt::Display::fmt(v, f),
            Term::Record(r) => fmt::Display::fmt(r, f),
            Term::Seq(s) => fmt::Display::fmt(s, f),
        }
    }
}

impl From<Constant> for Term {
    fn from(c: Constant) -> Self {
        Term::Const(c)
    }
}

impl From<bool> for Term {
    fn from(b: bool) -> Self {
        Term::Const(Constant::Bool(b))
    }
}

impl From<i64> for Term {
    fn from(i: i64) -> Self {
        Term::Const(Constant::Int(i))
    }
}

impl From<i32> for Term {
    fn from(i: i32) -> Self {
        Term::Const(Constant::Int(i64::from(i)))
    }
}

impl From<f64> for Term {
    fn from(f: f64) -> Self {
        Term::Const(Constant::Float(f))
    }
}

impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Term::Const(Constant::Str(Arc::from(s)))
    }
}

impl From<String> for Term {
    fn from(s: String) -> Self {
        Term::Const(Constant::Str(Arc::from(s)))
    }
}

impl From<Variable> for Term {
    fn from(v: Variable) -> Self {
        Term::Var(v)
    }
}

impl From<&Variable> for Term {
    fn from(v: &Variable) -> Self {
        Term::Var(v.clone())
    }
}

impl From<Record> for Term {
    fn from(r: Record) -> Self {
        Term::Record(r)
    }
}

impl From<Sequence> for Term {
    fn from(s: Sequence) -> Self {
        Term::Seq(s)
    }
}

#[cfg(test)]
#[path = "tests/term.rs"]
mod tests;
