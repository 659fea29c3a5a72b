//! Test assertion helpers

use helenus::{HelenusError, HelenusResult};

use crate::RecordingExecutor;

/// Assert that an optional value is Some
pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
    value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
}

/// Assert the number of statements an executor has sent
pub fn assert_round_trips(executor: &RecordingExecutor, expected: usize, context: &str) {
    assert_eq!(
        executor.round_trips(),
        expected,
        "{}: expected {} round trips, statements were {:?}",
        context,
        expected,
        executor.statements()
    );
}

/// Assert a result failed with a construction error mentioning `fragment`
pub fn assert_construction_error<T: std::fmt::Debug>(
    result: HelenusResult<T>,
    fragment: &str,
) -> HelenusError {
    let err = result.expect_err("expected a construction error");
    assert!(
        err.is_construction_error(),
        "expected a construction error, got {err:?}"
    );
    assert!(
        err.to_string().contains(fragment),
        "error {:?} does not mention {:?}",
        err.to_string(),
        fragment
    );
    err
}
