use std::{cell::RefCell, rc::Rc, str::from_utf8};

use peer_ledger::{
    bin_utils::{ScriptError, Service},
    config::LedgerConfig,
    error::ErrorKind,
};

const SCRIPT: &str = "\
op,principal,counterpart,amount,request,action,description
open,alice,,,,,
open,bob,,,,,
deposit,alice,,100,,,salary
deposit,bob,,50,,,
transfer,alice,bob,30,,,rent
transfer,alice,bob,-5,,,
transfer,bob,carol,1,,,
request,bob,alice,40,,,lunch
handle,alice,,,1,accept,
handle,alice,,,1,accept,
request,alice,bob,500,,,
handle,bob,,,2,accept,
handle,bob,,,2,reject,
handle,bob,,,2,later,
";

#[test]
fn replay_script() {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let mut output = Vec::new();
    let service = Service {
        input: SCRIPT.as_bytes(),
        output: &mut output,
        config: LedgerConfig::default(),
        error_printer: Box::new({
            let errors = errors.clone();
            move |line, err| match err {
                ScriptError::Ledger(err) => errors.borrow_mut().push((line, err.kind())),
                ScriptError::Parse(err) => panic!("unexpected parse error at {line}: {err}"),
            }
        }),
    };
    service.run().unwrap();

    let kinds: Vec<ErrorKind> = errors.borrow().iter().map(|(_, kind)| *kind).collect();
    assert_eq!(
        kinds,
        vec![
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::NotFound,
            ErrorKind::InsufficientFunds,
            ErrorKind::Validation,
        ]
    );

    let lines: Vec<&str> = from_utf8(&output).unwrap().lines().collect();
    assert_eq!(
        lines,
        vec![
            "owner,balance,credited,debited",
            "alice,30,100,70",
            "bob,120,120,0",
        ]
    );
}

#[test]
fn malformed_rows_are_reported_and_skipped() {
    let script = "\
op,principal,counterpart,amount,request,action,description
open,alice,,,,,
withdraw,alice,,10,,,
deposit,alice,,ten,,,
deposit,alice,,10,,,
";
    let parse_errors = Rc::new(RefCell::new(0));
    let mut output = Vec::new();
    let service = Service {
        input: script.as_bytes(),
        output: &mut output,
        config: LedgerConfig::default(),
        error_printer: Box::new({
            let parse_errors = parse_errors.clone();
            move |_, err| {
                assert!(matches!(err, ScriptError::Parse(_)));
                *parse_errors.borrow_mut() += 1;
            }
        }),
    };
    service.run().unwrap();

    assert_eq!(*parse_errors.borrow(), 2);
    let lines: Vec<&str> = from_utf8(&output).unwrap().lines().collect();
    assert_eq!(lines, vec!["owner,balance,credited,debited", "alice,10,10,0"]);
}
