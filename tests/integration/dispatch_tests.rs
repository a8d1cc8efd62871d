//! Inbound dispatch through the session: one message per poll, each class
//! reaching exactly one handler callback.

use simpleiot::protocol::messages::{DiagType, UpdateType, ValueType};

use super::mock_ports::{Call, MODEL, PROJECT, SERIAL, adm_topic, sim_session};

fn monitor(name: &str) -> String {
    format!("simpleiot_v1/app/monitor/{PROJECT}/{MODEL}/{SERIAL}/{name}")
}

#[test]
fn one_message_per_poll() {
    let (mut s, mut p) = sim_session();
    s.transport_mut()
        .inject(&monitor("a"), br#"{"name":"a","value":"1"}"#);
    s.transport_mut()
        .inject(&monitor("b"), br#"{"name":"b","value":"2"}"#);

    s.poll(&mut p).unwrap();
    assert_eq!(s.handler().calls.len(), 1);
    assert_eq!(s.transport().pending(), 1);

    s.poll(&mut p).unwrap();
    assert_eq!(s.handler().calls.len(), 2);
}

#[test]
fn data_type_hints() {
    let (mut s, _p) = sim_session();
    for (hint, expected) in [
        ("integer", ValueType::Int),
        ("int", ValueType::Int),
        ("float", ValueType::Float),
        ("double", ValueType::Double),
        ("bool", ValueType::Boolean),
        ("str", ValueType::Str),
        ("matrix", ValueType::Str),
    ] {
        s.handle_inbound(
            &monitor("x"),
            format!(r#"{{"name":"x","value":"1","type":"{hint}"}}"#).as_bytes(),
        );
        let Some(Call::Data(m)) = s.handler().calls.last() else {
            panic!("expected data callback for {hint}");
        };
        assert_eq!(m.value_type, expected, "hint {hint}");
    }
}

#[test]
fn missing_fields_are_absent_not_defaulted() {
    let (mut s, _p) = sim_session();
    s.handle_inbound(&monitor("x"), b"{}");
    let Some(Call::Data(m)) = s.handler().calls.last() else {
        panic!("data callback expected");
    };
    assert_eq!(m.name, None);
    assert_eq!(m.value, None);
    assert_eq!(m.value_type, ValueType::Str);
}

#[test]
fn malformed_payload_is_dropped() {
    let (mut s, _p) = sim_session();
    s.handle_inbound(&monitor("x"), b"{\"name\":");
    s.handle_inbound(&monitor("x"), b"[1,2,3]");
    s.handle_inbound(&adm_topic("update"), b"");
    assert!(s.handler().calls.is_empty());
}

#[test]
fn trigger_defaults_and_addressing() {
    let (mut s, _p) = sim_session();
    s.handle_inbound(&adm_topic("update"), br#"{"version":"3.1","url":"u"}"#);
    s.handle_inbound(
        &adm_topic("update"),
        br#"{"device":"TIE-DEMO01","version":"3.2","url":"u","md5":"abc","force":false,"type":"config"}"#,
    );
    s.handle_inbound(
        &adm_topic("update"),
        br#"{"device":"SOMEONE-ELSE","version":"9","url":"u"}"#,
    );

    let triggers = s.handler().triggers();
    assert_eq!(triggers.len(), 2);
    assert!(triggers[0].force);
    assert_eq!(triggers[0].update_type, UpdateType::Firmware);
    assert_eq!(triggers[0].content_md5, None);
    assert!(!triggers[1].force);
    assert_eq!(triggers[1].update_type, UpdateType::Config);
    assert_eq!(triggers[1].content_md5.as_deref(), Some("abc"));
}

#[test]
fn diagnostic_result_goes_to_extension_point() {
    let (mut s, _p) = sim_session();
    s.handler_mut().diag_reply = Some("pong".into());
    s.handle_inbound(
        &format!("simpleiot_v1/sys/diag/heartbeat/{PROJECT}/{MODEL}/{SERIAL}"),
        br#"{"id":"42","data":"ping","type":0}"#,
    );

    let calls = &s.handler().calls;
    let Call::Diagnostic(req) = &calls[0] else {
        panic!("diagnostic callback expected, got {:?}", calls[0]);
    };
    assert_eq!(req.id.as_deref(), Some("42"));
    assert_eq!(req.diag_type, Some(DiagType::Heartbeat));
    assert_eq!(calls[1], Call::DiagnosticResult("pong".into()));
    // Nothing is published for the echo.
    assert!(s.transport().published.is_empty());
}

#[test]
fn unknown_diag_code_is_absent() {
    let (mut s, _p) = sim_session();
    s.handle_inbound(
        &format!("simpleiot_v1/adm/diag/x/{PROJECT}/{MODEL}/{SERIAL}"),
        br#"{"id":"1","type":99}"#,
    );
    let Some(Call::Diagnostic(req)) = s.handler().calls.first() else {
        panic!("diagnostic callback expected");
    };
    assert_eq!(req.diag_type, None);
}

#[test]
fn admin_goes_to_admin_handler_with_op() {
    let (mut s, _p) = sim_session();
    s.handle_inbound(&adm_topic("provision"), br#"{"a":1,"b":2}"#);
    assert_eq!(
        s.handler().calls,
        vec![Call::Admin("provision".into(), 2)]
    );
}
