//! A small logic-programming engine.
//!
//! Programs are databases of [`Rule`]s over [`Term`]s (constants, variables,
//! records and cons lists). A query term is answered by depth-first
//! resolution, producing one [`Solution`] per proof: the native values of the
//! query's variables.

pub mod equality;
pub mod error;
pub mod metrics;
pub mod native;
pub mod rule;
pub mod search;
pub mod symbol;
pub mod term;
pub mod trace;
pub mod unify;

#[cfg(test)]
pub(crate) mod test_utils;

pub use equality::{Equality, Solution};
pub use error::{Error, Result};
pub use native::{construct, deconstruct};
pub use rule::{Assert, Assign, Predicate, Rule};
pub use search::{search, Database, Search, SearchConfig};
pub use term::{Constant, Record, Sequence, Term, VarSet, Variable};
pub use unify::unify;
