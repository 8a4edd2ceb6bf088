//! Negative-test corpus (§8): programs that must fail typechecking.
use std::path::Path;

use test_utils::check_failing_type_checking;

#[test]
fn assigning_to_a_const_is_rejected() {
    check_failing_type_checking(Path::new("demos/bad_const_assign.wb")).unwrap();
}

#[test]
fn mismatched_initializer_type_is_rejected() {
    check_failing_type_checking(Path::new("demos/bad_init_type.wb")).unwrap();
}

#[test]
fn break_outside_loop_is_rejected() {
    check_failing_type_checking(Path::new("demos/bad_break_scope.wb")).unwrap();
}

#[test]
fn non_bool_if_condition_is_rejected() {
    check_failing_type_checking(Path::new("demos/bad_if_cond.wb")).unwrap();
}

#[test]
fn calling_an_undefined_function_is_rejected() {
    check_failing_type_checking(Path::new("demos/bad_undefined_call.wb")).unwrap();
}
