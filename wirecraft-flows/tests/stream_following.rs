use core::time::Duration;
use std::cell::RefCell;
use std::rc::Rc;
use wirecraft::*;
use wirecraft_flows::{FlowState, StreamFollower};

const CLIENT: [u8; 4] = [10, 0, 0, 1];
const SERVER: [u8; 4] = [10, 0, 0, 2];
const CLIENT_PORT: u16 = 40000;
const SERVER_PORT: u16 = 80;

fn ts(seconds: u64) -> Duration {
    Duration::from_secs(seconds)
}

fn client_packet(build: impl FnOnce(&mut Tcp), payload: &[u8]) -> Layer {
    let mut tcp = Tcp::new(CLIENT_PORT, SERVER_PORT);
    build(&mut tcp);
    let mut layer = Ethernet2::new(
        MacAddr::new([2, 2, 2, 2, 2, 2]),
        MacAddr::new([1, 1, 1, 1, 1, 1]),
    ) / Ipv4::new(CLIENT.into(), SERVER.into(), 64)
        / tcp;
    if !payload.is_empty() {
        layer.push_inner(RawPayload::new(payload.to_vec()).into());
    }
    layer
}

fn server_packet(build: impl FnOnce(&mut Tcp), payload: &[u8]) -> Layer {
    let mut tcp = Tcp::new(SERVER_PORT, CLIENT_PORT);
    build(&mut tcp);
    let mut layer = Ethernet2::new(
        MacAddr::new([1, 1, 1, 1, 1, 1]),
        MacAddr::new([2, 2, 2, 2, 2, 2]),
    ) / Ipv4::new(SERVER.into(), CLIENT.into(), 64)
        / tcp;
    if !payload.is_empty() {
        layer.push_inner(RawPayload::new(payload.to_vec()).into());
    }
    layer
}

/// SYN / SYN|ACK / ACK with client initial sequence 1000 and server
/// initial sequence 2000.
fn handshake(follower: &mut StreamFollower) {
    follower
        .process_packet(
            &client_packet(
                |tcp| {
                    tcp.syn = true;
                    tcp.sequence = 1000;
                },
                b"",
            ),
            ts(0),
        )
        .unwrap();
    follower
        .process_packet(
            &server_packet(
                |tcp| {
                    tcp.syn = true;
                    tcp.ack = true;
                    tcp.sequence = 2000;
                    tcp.acknowledgment = 1001;
                },
                b"",
            ),
            ts(0),
        )
        .unwrap();
    follower
        .process_packet(
            &client_packet(
                |tcp| {
                    tcp.ack = true;
                    tcp.sequence = 1001;
                    tcp.acknowledgment = 2001;
                },
                b"",
            ),
            ts(0),
        )
        .unwrap();
}

#[test]
fn handshake_reaches_established() {
    let mut follower = StreamFollower::new();
    follower.new_stream_callback(|_| {});
    handshake(&mut follower);

    let stream = follower
        .find_stream(CLIENT.into(), CLIENT_PORT, SERVER.into(), SERVER_PORT)
        .unwrap();
    assert_eq!(FlowState::Established, stream.client_flow().state());
    // the server flow saw its SYN|ACK and waits for data or an ACK
    assert_eq!(FlowState::SynSent, stream.server_flow().state());
    assert_eq!(1001, stream.client_flow().sequence_number());
    assert_eq!(2001, stream.server_flow().sequence_number());

    // the server's first ACK brings its flow up as well
    follower
        .process_packet(
            &server_packet(
                |tcp| {
                    tcp.ack = true;
                    tcp.sequence = 2001;
                    tcp.acknowledgment = 1001;
                },
                b"",
            ),
            ts(1),
        )
        .unwrap();
    let stream = follower
        .find_stream(CLIENT.into(), CLIENT_PORT, SERVER.into(), SERVER_PORT)
        .unwrap();
    assert_eq!(FlowState::Established, stream.server_flow().state());
}

#[test]
fn permuted_chunks_deliver_in_order() {
    let mut follower = StreamFollower::new();
    let collected = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&collected);
    follower.new_stream_callback(move |stream| {
        let sink = Rc::clone(&sink);
        stream.client_data_callback(move |stream| {
            sink.borrow_mut().extend_from_slice(stream.client_payload());
        });
    });
    handshake(&mut follower);

    // a 200 byte payload in 40 chunks of 5 bytes, permuted
    let payload: Vec<u8> = (0..200u8).collect();
    let mut order: Vec<usize> = (0..40).collect();
    // deterministic shuffle
    for index in 0..order.len() {
        let swap_with = (index * 17 + 11) % order.len();
        order.swap(index, swap_with);
    }
    for chunk_index in order {
        let start = chunk_index * 5;
        follower
            .process_packet(
                &client_packet(
                    |tcp| {
                        tcp.ack = true;
                        tcp.sequence = 1001 + start as u32;
                        tcp.acknowledgment = 2001;
                    },
                    &payload[start..start + 5],
                ),
                ts(1),
            )
            .unwrap();
    }

    assert_eq!(payload, *collected.borrow());
    let stream = follower
        .find_stream(CLIENT.into(), CLIENT_PORT, SERVER.into(), SERVER_PORT)
        .unwrap();
    assert_eq!(0, stream.client_flow().total_buffered_bytes());
    assert_eq!(0, stream.client_flow().buffered_chunk_count());
    assert_eq!(1201, stream.client_flow().sequence_number());
}

#[cfg(feature = "ack-tracker")]
#[test]
fn sack_aware_ack_tracking() {
    let mut follower = StreamFollower::new();
    follower.new_stream_callback(|stream| {
        stream.enable_ack_tracking().unwrap();
    });
    handshake(&mut follower);

    // client sends 100 bytes at sequence 1001
    let payload = vec![0x61u8; 100];
    follower
        .process_packet(
            &client_packet(
                |tcp| {
                    tcp.ack = true;
                    tcp.sequence = 1001;
                    tcp.acknowledgment = 2001;
                },
                &payload,
            ),
            ts(1),
        )
        .unwrap();

    // the server acknowledges 1001 cumulatively and SACKs [1051, 1101)
    follower
        .process_packet(
            &server_packet(
                |tcp| {
                    tcp.ack = true;
                    tcp.sequence = 2001;
                    tcp.acknowledgment = 1001;
                    tcp.set_options(&[TlvOption::new(tcp_option::SACK, {
                        let mut data = Vec::new();
                        data.extend_from_slice(&1051u32.to_be_bytes());
                        data.extend_from_slice(&1101u32.to_be_bytes());
                        data
                    })])
                    .unwrap();
                },
                b"",
            ),
            ts(1),
        )
        .unwrap();

    {
        let stream = follower
            .find_stream(CLIENT.into(), CLIENT_PORT, SERVER.into(), SERVER_PORT)
            .unwrap();
        // the server's acknowledgments of client data are tracked by the
        // flow that processes server packets
        let tracker = stream.server_flow().ack_tracker().unwrap();
        assert_eq!(1001, tracker.ack_number());
        assert_eq!(1, tracker.interval_count());
        assert_eq!(
            Some((&1051u32, &1100u32)),
            tracker.acked_intervals().iter().next()
        );
        assert!(tracker.is_segment_acked(1051, 50));
        assert!(!tracker.is_segment_acked(1001, 50));
    }

    // a follow-up cumulative ACK covering the SACKed block empties the
    // interval set
    follower
        .process_packet(
            &server_packet(
                |tcp| {
                    tcp.ack = true;
                    tcp.sequence = 2001;
                    tcp.acknowledgment = 1101;
                },
                b"",
            ),
            ts(2),
        )
        .unwrap();
    let stream = follower
        .find_stream(CLIENT.into(), CLIENT_PORT, SERVER.into(), SERVER_PORT)
        .unwrap();
    let tracker = stream.server_flow().ack_tracker().unwrap();
    assert_eq!(1101, tracker.ack_number());
    assert_eq!(0, tracker.interval_count());
}

#[test]
fn recovery_mode_bridges_holes_within_window() {
    let mut follower = StreamFollower::new();
    let delivered = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&delivered);
    follower.new_stream_callback(move |stream| {
        stream.enable_recovery_mode(1000);
        let sink = Rc::clone(&sink);
        stream.client_data_callback(move |stream| {
            sink.borrow_mut().extend_from_slice(stream.client_payload());
        });
    });
    handshake(&mut follower);

    // a segment inside the window: the hole before it is bridged
    follower
        .process_packet(
            &client_packet(
                |tcp| {
                    tcp.ack = true;
                    tcp.sequence = 1501;
                    tcp.acknowledgment = 2001;
                },
                b"bridged",
            ),
            ts(1),
        )
        .unwrap();
    assert_eq!(b"bridged".to_vec(), *delivered.borrow());

    // a segment outside the window ends recovery; its data is buffered
    follower
        .process_packet(
            &client_packet(
                |tcp| {
                    tcp.ack = true;
                    tcp.sequence = 40_000;
                    tcp.acknowledgment = 2001;
                },
                b"too far",
            ),
            ts(2),
        )
        .unwrap();
    assert_eq!(b"bridged".to_vec(), *delivered.borrow());
    let stream = follower
        .find_stream(CLIENT.into(), CLIENT_PORT, SERVER.into(), SERVER_PORT)
        .unwrap();
    assert_eq!(7, stream.client_flow().total_buffered_bytes());
}

#[test]
fn fin_from_both_sides_closes_the_stream() {
    let mut follower = StreamFollower::new();
    follower.new_stream_callback(|_| {});
    handshake(&mut follower);
    assert_eq!(1, follower.stream_count());

    follower
        .process_packet(
            &client_packet(
                |tcp| {
                    tcp.fin = true;
                    tcp.ack = true;
                    tcp.sequence = 1001;
                },
                b"",
            ),
            ts(1),
        )
        .unwrap();
    assert_eq!(1, follower.stream_count());

    follower
        .process_packet(
            &server_packet(
                |tcp| {
                    tcp.fin = true;
                    tcp.ack = true;
                    tcp.sequence = 2001;
                },
                b"",
            ),
            ts(2),
        )
        .unwrap();
    assert_eq!(0, follower.stream_count());
}
