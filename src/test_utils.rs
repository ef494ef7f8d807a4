use crate::equality::Solution;
use crate::error::Error;
use crate::rule::{Assert, Assign, Predicate, Rule};
use crate::search::Database;
use crate::term::{Term, Variable};
use serde_json::Value;

pub(crate) fn vars<const N: usize>(names: [&str; N]) -> [Variable; N] {
    Variable::factory(names).expect("test variable names are valid")
}

pub(crate) fn int_list(items: &[i64]) -> Term {
    Term::list(items.iter().map(|&i| Term::from(i)))
}

pub(crate) fn int_arg(args: &[Term], i: usize) -> Result<i64, Error> {
    args[i].to_int()
}

/// Collect every solution, panicking on a hard error.
pub(crate) fn all_solutions(db: &Database, query: &Term) -> Vec<Solution> {
    db.search(query)
        .collect::<Result<Vec<_>, Error>>()
        .expect("search should not fail")
}

/// Solutions rendered as `{"NAME": value}` maps for terse assertions.
pub(crate) fn named(solutions: &[Solution]) -> Vec<Value> {
    solutions
        .iter()
        .map(|s| {
            Value::Object(
                s.iter()
                    .map(|(k, v)| (k.name().to_string(), v.clone()))
                    .collect(),
            )
        })
        .collect()
}

fn parent(p: impl Into<Term>, c: impl Into<Term>) -> Term {
    Term::record([("parent", p.into()), ("child", c.into())])
}

fn ancestor(a: impl Into<Term>, d: impl Into<Term>) -> Term {
    Term::record([("ancestor", a.into()), ("descendant", d.into())])
}

/// G is the parent of A, A is the parent of O, plus the usual two ancestor
/// rules.
pub(crate) fn family_db() -> Database {
    let [x, y, z] = vars(["X", "Y", "Z"]);
    Database::new([
        Rule::fact(parent("G", "A")),
        Rule::fact(parent("A", "O")),
        Rule::new(ancestor(&x, &z), [Predicate::from(parent(&x, &z))]),
        Rule::new(
            ancestor(&x, &z),
            [
                Predicate::from(parent(&x, &y)),
                Predicate::from(ancestor(&y, &z)),
            ],
        ),
    ])
}

pub(crate) fn ancestor_query(p: impl Into<Term>, c: impl Into<Term>) -> Term {
    ancestor(p, c)
}

pub(crate) fn gcd_term(a: impl Into<Term>, b: impl Into<Term>, g: impl Into<Term>) -> Term {
    Term::record([("a", a.into()), ("b", b.into()), ("gcd", g.into())])
}

/// Euclid's algorithm as two rules.
pub(crate) fn gcd_rules() -> Vec<Rule> {
    let [x, y, z, g] = vars(["X", "Y", "Z", "G"]);
    let positive = |name: &str| {
        Assert::new(&[name], |args| Ok(int_arg(args, 0)? > 0)).expect("valid parameter")
    };
    let remainder = Assign::new(z.clone(), &["X", "Y"], |args| {
        Ok(Term::from(int_arg(args, 0)? % int_arg(args, 1)?))
    })
    .expect("valid parameters");
    vec![
        Rule::new(gcd_term(&x, 0, &x), [Predicate::from(positive("X"))]),
        Rule::new(
            gcd_term(&x, &y, &g),
            [
                Predicate::from(positive("Y")),
                Predicate::from(remainder),
                Predicate::from(gcd_term(&y, &z, &g)),
            ],
        ),
    ]
}
