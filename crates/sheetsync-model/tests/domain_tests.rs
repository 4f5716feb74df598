use proptest::prelude::*;
use serde_json::{json, Value};
use sheetsync_model::{Domain, DomainTerm, Operator, Record};

fn record(amount: i64, active: bool, owner: Option<i64>) -> Record {
    let owner = owner.map_or(Value::Bool(false), |id| json!([id, "Owner"]));
    match json!({ "amount": amount, "active": active, "owner_id": owner }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn leaf() -> impl Strategy<Value = Domain> {
    prop_oneof![
        (prop_oneof![Just(Operator::Gt), Just(Operator::Le), Just(Operator::Eq)], 0..20i64)
            .prop_map(|(op, n)| Domain::leaf("amount", op, n)),
        any::<bool>().prop_map(|b| Domain::leaf("active", Operator::Eq, b)),
        (1..4i64).prop_map(|id| Domain::leaf("owner_id", Operator::Eq, id)),
    ]
}

/// Implicitly AND-ed leaves, or an explicit OR of two leaves
fn domain() -> impl Strategy<Value = Domain> {
    prop_oneof![
        Just(Domain::default()),
        proptest::collection::vec(leaf(), 1..4).prop_map(|leaves| {
            Domain::new(leaves.into_iter().flat_map(|d| d.terms().to_vec()).collect())
        }),
        (leaf(), leaf()).prop_map(|(a, b)| {
            let mut terms = vec![DomainTerm::Or];
            terms.extend(a.terms().iter().cloned());
            terms.extend(b.terms().iter().cloned());
            Domain::new(terms)
        }),
    ]
}

proptest! {
    #[test]
    fn prop_and_is_conjunction(
        a in domain(),
        b in domain(),
        amount in 0..20i64,
        active in any::<bool>(),
        owner in proptest::option::of(1..4i64),
    ) {
        let record = record(amount, active, owner);
        let joined = Domain::and([&a, &b]);
        let expected = a.matches(&record).unwrap() && b.matches(&record).unwrap();
        prop_assert_eq!(joined.matches(&record).unwrap(), expected);
        prop_assert!(joined.expression_count() <= 1);
    }
}

#[test]
fn test_empty_domain_matches_everything() {
    assert!(Domain::default().matches(&record(0, false, None)).unwrap());
    assert!(Domain::and([&Domain::default(), &Domain::default()]).is_empty());
}
