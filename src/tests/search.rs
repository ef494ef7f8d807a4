use super::*;
use crate::rule::{Assert, Assign};
use crate::test_utils::{
    all_solutions, ancestor_query, family_db, gcd_rules, gcd_term, int_arg, int_list, named,
    vars,
};
use serde_json::json;

// ========== ORDER ==========

#[test]
fn ancestor_solutions_in_depth_first_order() {
    let [p, c] = vars(["P", "C"]);
    let db = family_db();
    let got = all_solutions(&db, &ancestor_query(&p, &c));
    assert_eq!(
        named(&got),
        vec![
            json!({"P": "G", "C": "O"}),
            json!({"P": "G", "C": "A"}),
            json!({"P": "A", "C": "O"}),
        ]
    );
}

#[test]
fn ancestor_search_is_reproducible() {
    let [p, c] = vars(["P", "C"]);
    let db = family_db();
    let query = ancestor_query(&p, &c);
    let first = all_solutions(&db, &query);
    let second = all_solutions(&db, &query);
    assert_eq!(first, second);

    let shifted = db
        .search_with(
            &query,
            SearchConfig {
                first_frame: 1000,
                ..SearchConfig::default()
            },
        )
        .collect::<Result<Vec<_>>>()
        .unwrap();
    assert_eq!(first, shifted);
}

#[test]
fn partially_bound_query() {
    let [c] = vars(["C"]);
    let db = family_db();
    let got = all_solutions(&db, &ancestor_query("G", &c));
    assert_eq!(named(&got), vec![json!({"C": "O"}), json!({"C": "A"})]);
}

#[test]
fn ground_query_yields_empty_solution() {
    let db = family_db();
    let got = all_solutions(&db, &ancestor_query("G", "O"));
    assert_eq!(got, vec![Solution::new()]);
    assert!(all_solutions(&db, &ancestor_query("O", "G")).is_empty());
}

#[test]
fn empty_database_has_no_solutions() {
    let [p, c] = vars(["P", "C"]);
    let db = Database::default();
    assert!(db.is_empty());
    assert!(search(&db, &ancestor_query(&p, &c)).next().is_none());
}

// ========== ARITHMETIC ==========

fn check(params: &[&str], f: fn(&[Term]) -> Result<bool>) -> Predicate {
    Predicate::from(Assert::new(params, f).unwrap())
}

fn has_factor(n: Term, l: Term) -> Term {
    Term::record([("has_factor", n), ("x", l)])
}

fn is_prime(p: Term) -> Term {
    Term::record([("is_prime", p)])
}

fn is_prime_db() -> Database {
    let [n, l, l2, p] = vars(["N", "L", "L2", "P"]);
    Database::new([
        Rule::fact(is_prime(Term::from(2))),
        Rule::fact(is_prime(Term::from(3))),
        Rule::new(
            is_prime(Term::from(&p)),
            [
                check(&["P"], |a| Ok(a[0].as_int().is_some())),
                check(&["P"], |a| Ok(int_arg(a, 0)? > 3)),
                check(&["P"], |a| Ok(int_arg(a, 0)? % 2 != 0)),
                Predicate::from(has_factor(Term::from(&p), Term::from(3))),
            ],
        ),
        Rule::new(
            has_factor(Term::from(&n), Term::from(&l)),
            [check(&["N", "L"], |a| Ok(int_arg(a, 0)? % int_arg(a, 1)? != 0))],
        ),
        Rule::new(
            has_factor(Term::from(&n), Term::from(&l)),
            [
                check(&["L", "N"], |a| Ok(int_arg(a, 0)?.pow(2) < int_arg(a, 1)?)),
                Predicate::from(
                    Assign::new(l2.clone(), &["L"], |a| Ok(Term::from(int_arg(a, 0)? + 2)))
                        .unwrap(),
                ),
                Predicate::from(has_factor(Term::from(&n), Term::from(&l2))),
            ],
        ),
    ])
}

#[test]
fn primality() {
    let db = is_prime_db();
    let query = is_prime;
    assert_eq!(all_solutions(&db, &query(Term::from(3))), vec![Solution::new()]);
    assert!(all_solutions(&db, &query(Term::from(3.5))).is_empty());
    assert!(all_solutions(&db, &query(Term::from(4))).is_empty());
    assert_eq!(all_solutions(&db, &query(Term::from(5))), vec![Solution::new()]);
    assert!(all_solutions(&db, &query(Term::from(6))).is_empty());
    assert_eq!(all_solutions(&db, &query(Term::from(7))), vec![Solution::new()]);
}

#[test]
fn no_answer_is_not_an_error() {
    let db = is_prime_db();
    let mut results = db.search(&is_prime(Term::from(4)));
    assert!(results.next().is_none());
    assert!(results.next().is_none());
}

#[test]
fn gcd() {
    let [q] = vars(["Q"]);
    let db = Database::new(gcd_rules());
    let got = all_solutions(&db, &gcd_term(36, 63, &q));
    assert_eq!(named(&got), vec![json!({"Q": 9})]);
}

#[test]
fn coprime() {
    let [x, y, q] = vars(["X", "Y", "Q"]);
    let mut db = Database::new(gcd_rules());
    db.push(Rule::new(
        Term::record([
            ("a", Term::from(&x)),
            ("b", Term::from(&y)),
            ("coprime", Term::from(true)),
        ]),
        [Predicate::from(gcd_term(&x, &y, 1))],
    ));
    let query = Term::record([
        ("a", Term::from(15)),
        ("b", Term::from(4)),
        ("coprime", Term::from(&q)),
    ]);
    assert_eq!(named(&all_solutions(&db, &query)), vec![json!({"Q": true})]);
}

// ========== LISTS ==========

#[test]
fn last_element() {
    let [x, l, w, q] = vars(["X", "L", "_W", "Q"]);
    let last = |x: Term, list: Term| Term::record([("last", x), ("list", list)]);
    let db = Database::new([
        Rule::fact(last(Term::from(&x), Term::list([Term::from(&x)]))),
        Rule::new(
            last(
                Term::from(&x),
                Term::list([Term::from(&w), Term::from(l.rest())]),
            ),
            [Predicate::from(last(Term::from(&x), Term::from(&l)))],
        ),
    ]);
    let query = last(
        Term::from(&q),
        Term::list([Term::from("a"), Term::from("b"), Term::from("c")]),
    );
    let first = db.search(&query).next().unwrap().unwrap();
    assert_eq!(first[&q], json!("c"));
}

#[test]
fn last_but_one_element() {
    let [x, y, ys, w, q] = vars(["X", "Y", "Ys", "_W", "Q"]);
    let lbo = |x: Term, list: Term| Term::record([("last_but_one", x), ("list", list)]);
    let db = Database::new([
        Rule::fact(lbo(
            Term::from(&x),
            Term::list([Term::from(&x), Term::from(&w)]),
        )),
        Rule::new(
            lbo(
                Term::from(&x),
                Term::list([Term::from(&w), Term::from(&y), Term::from(ys.rest())]),
            ),
            [Predicate::from(lbo(
                Term::from(&x),
                Term::list([Term::from(&y), Term::from(ys.rest())]),
            ))],
        ),
    ]);
    let query = lbo(
        Term::from(&q),
        Term::list([Term::from("a"), Term::from("b"), Term::from("c")]),
    );
    let first = db.search(&query).next().unwrap().unwrap();
    assert_eq!(first[&q], json!("b"));
}

#[test]
fn list_length() {
    let [n, n1, l, w, q] = vars(["N", "N1", "L", "_W", "Q"]);
    let length = |n: Term, list: Term| Term::record([("my_length", n), ("list", list)]);
    let db = Database::new([
        Rule::fact(length(Term::from(0), Term::null())),
        Rule::new(
            length(
                Term::from(&n),
                Term::list([Term::from(&w), Term::from(l.rest())]),
            ),
            [
                Predicate::from(length(Term::from(&n1), Term::from(&l))),
                Predicate::from(
                    Assign::new(n.clone(), &["N1"], |a| Ok(Term::from(int_arg(a, 0)? + 1)))
                        .unwrap(),
                ),
            ],
        ),
    ]);
    let query = length(Term::from(&q), int_list(&[1, 2, 3]));
    let first = db.search(&query).next().unwrap().unwrap();
    assert_eq!(first[&q], json!(3));
}

// ========== FAILURE ==========

fn nan_db() -> Database {
    let [x] = vars(["X"]);
    Database::new([
        Rule::fact(Term::record([("k", Term::from(1))])),
        Rule::new(
            Term::record([("k", Term::from(&x))]),
            [Predicate::from(
                Assign::new(x.clone(), &[], |_| Ok(Term::from(f64::NAN))).unwrap(),
            )],
        ),
    ])
}

#[test]
fn hard_error_follows_earlier_solutions_then_fuses() {
    let [q] = vars(["Q"]);
    let db = nan_db();
    let mut results = db.search(&Term::record([("k", Term::from(&q))]));

    let first = results.next().unwrap().unwrap();
    assert_eq!(first[&q], json!(1));

    let err = results.next().unwrap().unwrap_err();
    assert!(matches!(err, Error::NotHashable(_)));

    assert!(results.next().is_none());
    assert!(results.next().is_none());
}

fn inc(x: impl Into<Term>, y: impl Into<Term>) -> Term {
    Term::record([("inc", x.into()), ("out", y.into())])
}

fn inc_db() -> Database {
    let [x, y] = vars(["X", "Y"]);
    let add_one =
        Assign::new(y.clone(), &["X"], |a| Ok(Term::from(int_arg(a, 0)? + 1))).unwrap();
    Database::new([Rule::new(inc(&x, &y), [Predicate::from(add_one)])])
}

#[test]
fn host_type_error_ends_search() {
    let [q] = vars(["Q"]);
    let db = inc_db();
    assert_eq!(named(&all_solutions(&db, &inc(4, &q))), vec![json!({"Q": 5})]);

    let mut results = db.search(&inc("abc", &q));
    assert_eq!(
        results.next(),
        Some(Err(Error::TypeMismatch {
            expected: "integer",
            found: Term::from("abc"),
        }))
    );
    assert!(results.next().is_none());
}

#[test]
fn branch_local_host_error_prunes() {
    let [x, q] = vars(["X", "Q"]);
    let item = |v: Term| Term::record([("item", v)]);
    let positive = |v: Term| Term::record([("positive", v)]);
    let lenient = Assert::new(&["X"], |a| match a[0].to_int() {
        Ok(n) => Ok(n > 0),
        Err(e) => Err(Error::AssertionFailed(e.to_string())),
    })
    .unwrap();
    let db = Database::new([
        Rule::fact(item(Term::from("abc"))),
        Rule::fact(item(Term::from(3))),
        Rule::new(
            positive(Term::from(&x)),
            [Predicate::from(item(Term::from(&x))), Predicate::from(lenient)],
        ),
    ]);
    let got = all_solutions(&db, &positive(Term::from(&q)));
    assert_eq!(named(&got), vec![json!({"Q": 3})]);
}

#[test]
fn conjunction_splits_off_first_predicate() {
    let p = |i: i64| Predicate::from(Term::from(i));
    let goal = Goal::from_conjunction(vec![p(1), p(2), p(3)]).unwrap();
    assert_eq!(goal.predicate, p(1));
    assert_eq!(goal.body, VecDeque::from(vec![p(2), p(3)]));
    assert!(Goal::from_conjunction(Vec::<Predicate>::new()).is_none());
}

#[test]
fn step_limit_stops_runaway_search() {
    let [p, c] = vars(["P", "C"]);
    let db = family_db();
    let config = SearchConfig {
        max_steps: Some(1),
        ..SearchConfig::default()
    };
    let mut results = db.search_with(&ancestor_query(&p, &c), config);
    assert_eq!(results.next(), Some(Err(Error::StepLimitExceeded(1))));
    assert_eq!(results.next(), None);
    assert_eq!(results.steps(), 1);
}

#[test]
fn generous_step_limit_changes_nothing() {
    let [p, c] = vars(["P", "C"]);
    let db = family_db();
    let config = SearchConfig {
        max_steps: Some(10_000),
        ..SearchConfig::default()
    };
    let limited = db
        .search_with(&ancestor_query(&p, &c), config)
        .collect::<Result<Vec<_>>>()
        .unwrap();
    assert_eq!(limited, all_solutions(&db, &ancestor_query(&p, &c)));
}

#[test]
fn to_solve_for_is_query_variables() {
    let [p, c] = vars(["P", "C"]);
    let db = family_db();
    let results = db.search(&ancestor_query(&p, &c));
    let expected: VarSet = [c, p].into_iter().collect();
    assert_eq!(results.to_solve_for(), &expected);
}

#[cfg(feature = "tracing")]
#[test]
fn metrics_count_search_work() {
    let [p, c] = vars(["P", "C"]);
    let db = family_db();
    let mut results = db.search(&ancestor_query(&p, &c));
    let n = results.by_ref().count();
    let report = results.metrics();
    assert_eq!(report.solutions_yielded, n as u64);
    assert_eq!(report.steps, results.steps() as u64);
    assert!(report.rule_activations >= report.unifications);
}
