//! Fulfilment values produced from a completion's trailing results.

use serde_json::Value;

/// A value type a [`Deferred`](crate::Deferred) can fulfil with when the
/// completion callback reports zero, one or many results.
pub trait CallbackValue: Sized {
    /// The value used when the callback reports no results.
    fn absent() -> Self;

    /// The value used when the callback reports two or more results.
    fn sequence(values: Vec<Self>) -> Self;
}

impl CallbackValue for Value {
    fn absent() -> Self {
        Value::Null
    }

    fn sequence(values: Vec<Self>) -> Self {
        Value::Array(values)
    }
}

/// Collapse trailing callback results into a single fulfilment value.
///
/// Zero results give [`CallbackValue::absent`], one result is passed through
/// as-is, and two or more are kept in call order via [`CallbackValue::sequence`].
pub fn collapse<V: CallbackValue>(mut values: Vec<V>) -> V {
    match values.len() {
        0 => V::absent(),
        1 => values.remove(0),
        _ => V::sequence(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_results_is_absent() {
        assert_eq!(collapse::<Value>(vec![]), Value::Null);
    }

    #[test]
    fn single_result_is_not_wrapped() {
        assert_eq!(collapse(vec![json!(42)]), json!(42));
        // a lone array stays the array itself
        assert_eq!(collapse(vec![json!([1, 2])]), json!([1, 2]));
    }

    #[test]
    fn many_results_keep_call_order() {
        assert_eq!(collapse(vec![json!("foo"), json!("bar")]), json!(["foo", "bar"]));
        assert_eq!(
            collapse(vec![json!(3), json!(1), json!(2)]),
            json!([3, 1, 2])
        );
    }
}
