use crate::equality::Equality;
use crate::error::{Error, Result};
use crate::term::{Sequence, Term};
use smallvec::SmallVec;

#[cfg(feature = "tracing")]
use crate::trace::{debug_span, trace};

/// Unify two terms under `equality`, returning the extended store.
///
/// Records are matched key by key in sorted key order and sequences cell by
/// cell; everything else is handed to [`Equality::add`]. The first failing
/// pair determines the error. `equality` itself is never modified.
///
/// Uses an explicit worklist to avoid recursion.
pub fn unify(left: &Term, right: &Term, equality: &Equality) -> Result<Equality> {
    #[cfg(feature = "tracing")]
    let _span = debug_span!("unify", %left, %right).entered();

    let mut eq = equality.clone();
    let mut worklist: SmallVec<[(&Term, &Term); 32]> = SmallVec::new();
    worklist.push((left, right));

    while let Some((a, b)) = worklist.pop() {
        match (a, b) {
            (Term::Record(ra), Term::Record(rb)) => {
                if !ra.same_keys(rb) {
                    #[cfg(feature = "tracing")]
                    trace!("unify_key_mismatch");
                    return Err(Error::KeyMismatch {
                        left: ra.keys().map(str::to_string).collect(),
                        right: rb.keys().map(str::to_string).collect(),
                    });
                }
                // Reversed so the first key is popped first.
                let pairs: SmallVec<[(&Term, &Term); 8]> = ra.values().zip(rb.values()).collect();
                worklist.extend(pairs.into_iter().rev());
            }
            (Term::Seq(Sequence::Cons(ca)), Term::Seq(Sequence::Cons(cb))) => {
                worklist.push((ca.tail(), cb.tail()));
                worklist.push((ca.head(), cb.head()));
            }
            (Term::Seq(Sequence::Cons(_)), Term::Seq(Sequence::Null))
            | (Term::Seq(Sequence::Null), Term::Seq(Sequence::Cons(_))) => {
                #[cfg(feature = "tracing")]
                trace!("unify_length_mismatch");
                return Err(Error::LengthMismatch);
            }
            _ => {
                eq = match eq.add_owned(a, b) {
                    Ok(next) => next,
                    Err(e) => {
                        #[cfg(feature = "tracing")]
                        trace!(error = %e, "unify_add_failed");
                        return Err(e);
                    }
                };
            }
        }
    }

    #[cfg(feature = "tracing")]
    trace!(bindings = %eq, "unify_success");

    Ok(eq)
}

#[cfg(test)]
#[path = "tests/unify.rs"]
mod tests;
