use lasso::{Spur, ThreadedRodeo};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Process-wide interner for variable names and record keys.
///
/// Terms are built without an explicit store in scope, so the rodeo lives in
/// a static. It only ever grows: every distinct variable name and record key
/// stays allocated until the process exits.
fn rodeo() -> &'static ThreadedRodeo {
    static RODEO: OnceLock<ThreadedRodeo> = OnceLock::new();
    RODEO.get_or_init(ThreadedRodeo::new)
}

/// An interned name.
///
/// Equality and hashing use the interned key. Ordering compares the
/// underlying strings, so sorted collections of symbols do not depend on the
/// order in which names happened to be interned.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(Spur);

impl Symbol {
    /// Intern a name, returning the existing symbol if it was seen before.
    pub fn intern(name: &str) -> Self {
        Symbol(rodeo().get_or_intern(name))
    }

    /// Look up a name without interning it.
    pub fn get(name: &str) -> Option<Self> {
        rodeo().get(name).map(Symbol)
    }

    pub fn as_str(self) -> &'static str {
        rodeo().resolve(&self.0)
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            return Ordering::Equal;
        }
        self.as_str().cmp(other.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::intern(name)
    }
}

#[cfg(test)]
#[path = "tests/symbol.rs"]
mod tests;
