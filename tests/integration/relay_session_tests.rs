//! Session over the gateway relay: records framed onto a byte link.

use simpleiot::adapters::relay::{RelayKind, RelayRecord, RelayTransport, decode_record};
use simpleiot::adapters::sim::SimPlatform;
use simpleiot::link::FrameDecoder;
use simpleiot::link::transport::MemoryLink;

use super::mock_ports::{Call, session_with};

/// Split everything the device wrote into relay records.
fn written(tx: &[u8]) -> Vec<RelayRecord> {
    let mut dec = FrameDecoder::new();
    let mut out = Vec::new();
    let mut rest = tx;
    while !rest.is_empty() {
        let (used, frame) = dec.feed(rest);
        if let Some(f) = frame {
            out.push(decode_record(f).unwrap());
        }
        rest = &rest[used..];
    }
    out
}

#[test]
fn start_and_set_are_framed_records() {
    let mut s = session_with(RelayTransport::new(MemoryLink::default()));
    s.start().unwrap();
    s.set("temp", 21.5f32).unwrap();

    let records = written(&s.transport().link().tx);
    let kinds: Vec<_> = records.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![RelayKind::Subscribe, RelayKind::Subscribe, RelayKind::Publish]
    );
    assert_eq!(
        records[2].topic,
        "simpleiot_v1/app/data/set/Sunshine/M1/TIE-DEMO01"
    );
    let body = String::from_utf8(records[2].payload.clone()).unwrap();
    assert!(body.contains(r#""value":"21.5""#), "{body}");
    assert_eq!(s.handler().calls[0], Call::Ready(0, "Ready".into()));
}

#[test]
fn gateway_delivery_reaches_handler() {
    let mut s = session_with(RelayTransport::new(MemoryLink::default()));
    let frame = RelayRecord {
        kind: RelayKind::Deliver,
        topic: "simpleiot_v1/app/monitor/Sunshine/M1/TIE-DEMO01/led".into(),
        payload: br#"{"name":"led","value":"on"}"#.to_vec(),
    }
    .to_frame()
    .unwrap();

    // Deliver in two halves to exercise partial reads.
    let (a, b) = frame.split_at(frame.len() / 2);
    s.transport_mut().link_mut().rx.extend(a.iter().copied());
    let mut p = SimPlatform::new();
    s.poll(&mut p).unwrap();
    assert!(s.handler().calls.is_empty());

    s.transport_mut().link_mut().rx.extend(b.iter().copied());
    s.poll(&mut p).unwrap();
    let Some(Call::Data(m)) = s.handler().calls.first() else {
        panic!("data callback expected");
    };
    assert_eq!(m.value.as_deref(), Some("on"));
}

#[test]
fn gateway_uplink_carries_the_session() {
    use simpleiot::adapters::sim::SimBroker;
    use simpleiot::adapters::uplink::Uplink;

    let uplink: Uplink<SimBroker, _> =
        Uplink::Gateway(RelayTransport::new(MemoryLink::default()));
    let mut s = session_with(uplink);
    s.start().unwrap();
    s.set("temp", 20).unwrap();

    let Uplink::Gateway(relay) = s.transport() else {
        panic!("gateway uplink expected");
    };
    let records = written(&relay.link().tx);
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].kind, RelayKind::Publish);
    assert_eq!(records[2].payload.first(), Some(&b'{'));
}
