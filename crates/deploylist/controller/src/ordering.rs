//! Deterministic ordering of fetched records

use serde_json::Value;

/// Numeric identity of a record, if it carries an integer id
///
/// Widened to `i128` so the full `u64` range and negative ids share one
/// total order.
pub fn record_id(record: &Value) -> Option<i128> {
    let id = record.get("id")?;
    id.as_u64()
        .map(i128::from)
        .or_else(|| id.as_i64().map(i128::from))
}

/// Sort records ascending by id
///
/// The sort is stable; records without a numeric id keep their relative
/// order after every identified record.
pub fn order_records(mut records: Vec<Value>) -> Vec<Value> {
    records.sort_by_key(|record| match record_id(record) {
        Some(id) => (false, id),
        None => (true, 0),
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn ids(records: &[Value]) -> Vec<Option<i128>> {
        records.iter().map(record_id).collect()
    }

    #[test]
    fn test_orders_ascending() {
        let records = vec![json!({"id": 30}), json!({"id": 10}), json!({"id": 20})];
        assert_eq!(ids(&order_records(records)), vec![Some(10), Some(20), Some(30)]);
    }

    #[test]
    fn test_missing_ids_sort_last_in_input_order() {
        let records = vec![
            json!({"name": "b"}),
            json!({"id": 2}),
            json!(null),
            json!({"id": "not-a-number", "name": "c"}),
            json!({"id": 1}),
        ];
        let ordered = order_records(records);
        assert_eq!(ordered[0], json!({"id": 1}));
        assert_eq!(ordered[1], json!({"id": 2}));
        assert_eq!(ordered[2], json!({"name": "b"}));
        assert_eq!(ordered[3], json!(null));
        assert_eq!(ordered[4]["name"], "c");
    }

    #[test]
    fn test_ids_beyond_i64_are_ordered() {
        let huge = i64::MAX as u64 + 10;
        let records = vec![
            json!({"id": u64::MAX}),
            json!({"id": "n/a"}),
            json!({"id": huge}),
            json!({"id": -1}),
            json!({"id": 3}),
        ];
        assert_eq!(
            ids(&order_records(records)),
            vec![
                Some(-1),
                Some(3),
                Some(i128::from(huge)),
                Some(i128::from(u64::MAX)),
                None,
            ]
        );
    }

    #[test]
    fn test_duplicate_ids_keep_input_order() {
        let records = vec![
            json!({"id": 5, "tag": "first"}),
            json!({"id": 1}),
            json!({"id": 5, "tag": "second"}),
        ];
        let ordered = order_records(records);
        assert_eq!(ordered[1]["tag"], "first");
        assert_eq!(ordered[2]["tag"], "second");
    }

    fn permuted_records() -> impl Strategy<Value = (Vec<Value>, Vec<Value>)> {
        prop::collection::hash_set(any::<u64>(), 0..50).prop_flat_map(|id_set| {
            let records: Vec<Value> = id_set.iter().map(|id| json!({"id": id})).collect();
            (Just(records.clone()), Just(records).prop_shuffle())
        })
    }

    proptest! {
        #[test]
        fn order_independent_of_input_permutation((records, shuffled) in permuted_records()) {
            let a = order_records(records);
            let b = order_records(shuffled);
            prop_assert_eq!(&a, &b);

            let sorted = ids(&a);
            prop_assert!(sorted.iter().all(Option::is_some));
            prop_assert!(sorted.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
