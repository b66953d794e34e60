use runtime::RuntimeError;

#[test]
fn second_init_is_an_error() {
    runtime::logging::init(Some("runtime=debug,game_core=trace")).expect("first init succeeds");

    let err = runtime::logging::init(None).unwrap_err();
    assert!(matches!(err, RuntimeError::Logging(_)));
}
