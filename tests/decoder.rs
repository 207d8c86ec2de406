// tests/decoder.rs
use depthfeed::book::Symbol;
use depthfeed::decoder::{Body, FrameDecoder, FrameError, Record};

fn header(seq: u32, size: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    out.extend_from_slice(&seq.to_le_bytes());
    out.extend_from_slice(&size.to_le_bytes());
    out
}

fn add_frame(seq: u32, sym: &[u8; 3], order_id: u64, side: u8, volume: u64, price: i32) -> Vec<u8> {
    let mut f = header(seq, 32);
    f.push(b'A');
    f.extend_from_slice(sym);
    f.extend_from_slice(&order_id.to_le_bytes());
    f.push(side);
    f.extend_from_slice(&[0; 3]);
    f.extend_from_slice(&volume.to_le_bytes());
    f.extend_from_slice(&price.to_le_bytes());
    f.extend_from_slice(&[0; 4]);
    f
}

fn update_frame(seq: u32, sym: &[u8; 3], order_id: u64, side: u8, volume: u64, price: i32) -> Vec<u8> {
    let mut f = add_frame(seq, sym, order_id, side, volume, price);
    f[8] = b'U';
    f
}

fn delete_frame(seq: u32, sym: &[u8; 3], order_id: u64, side: u8) -> Vec<u8> {
    let mut f = header(seq, 13);
    f.push(b'D');
    f.extend_from_slice(sym);
    f.extend_from_slice(&order_id.to_le_bytes());
    f.push(side);
    f
}

fn execute_frame(seq: u32, sym: &[u8; 3], order_id: u64, side: u8, traded_qty: u64) -> Vec<u8> {
    let mut f = header(seq, 24);
    f.push(b'E');
    f.extend_from_slice(sym);
    f.extend_from_slice(&order_id.to_le_bytes());
    f.push(side);
    f.extend_from_slice(&[0; 3]);
    f.extend_from_slice(&traded_qty.to_le_bytes());
    f
}

#[test]
fn decodes_each_record_type() {
    let mut dec = FrameDecoder::new();
    dec.push(&add_frame(1, b"ABC", 7, b'B', 10, 100));
    dec.push(&update_frame(2, b"ABC", 7, b'B', 5, -101));
    dec.push(&delete_frame(3, b"XYZ", 9, b'S'));
    dec.push(&execute_frame(4, b"XYZ", 9, b'S', 3));

    assert_eq!(
        dec.next_record().unwrap(),
        Some(Record {
            seq: 1,
            body: Body::Add {
                symbol: Symbol(*b"ABC"),
                order_id: 7,
                side: b'B',
                volume: 10,
                price: 100,
            },
        })
    );
    assert_eq!(
        dec.next_record().unwrap(),
        Some(Record {
            seq: 2,
            body: Body::Update {
                symbol: Symbol(*b"ABC"),
                order_id: 7,
                side: b'B',
                volume: 5,
                price: -101,
            },
        })
    );
    assert_eq!(
        dec.next_record().unwrap(),
        Some(Record {
            seq: 3,
            body: Body::Delete {
                symbol: Symbol(*b"XYZ"),
                order_id: 9,
                side: b'S',
            },
        })
    );
    assert_eq!(
        dec.next_record().unwrap(),
        Some(Record {
            seq: 4,
            body: Body::Execute {
                symbol: Symbol(*b"XYZ"),
                order_id: 9,
                side: b'S',
                traded_qty: 3,
            },
        })
    );
    assert_eq!(dec.next_record().unwrap(), None);
    dec.finish().unwrap();
}

#[test]
fn reassembles_frames_across_chunk_boundaries() {
    let frame = add_frame(42, b"ABC", 1, b'B', 10, 100);

    let mut dec = FrameDecoder::new();
    for &b in &frame[..frame.len() - 1] {
        dec.push(&[b]);
        assert_eq!(dec.next_record().unwrap(), None);
    }
    dec.push(&frame[frame.len() - 1..]);

    let rec = dec.next_record().unwrap().expect("complete record");
    assert_eq!(rec.seq, 42);
    assert_eq!(rec.body.symbol(), Symbol(*b"ABC"));
    dec.finish().unwrap();
}

#[test]
fn yields_every_record_in_one_chunk() {
    let mut feed = Vec::new();
    for seq in 1..=5u32 {
        feed.extend_from_slice(&add_frame(seq, b"ABC", seq as u64, b'B', 1, 100 + seq as i32));
    }

    let mut dec = FrameDecoder::new();
    dec.push(&feed);

    let mut seqs = Vec::new();
    while let Some(rec) = dec.next_record().unwrap() {
        seqs.push(rec.seq);
    }
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    dec.finish().unwrap();
}

#[test]
fn rejects_unknown_type_byte() {
    let mut frame = add_frame(1, b"ABC", 1, b'B', 10, 100);
    frame[8] = b'X';

    let mut dec = FrameDecoder::new();
    dec.push(&frame);
    assert!(matches!(
        dec.next_record(),
        Err(FrameError::UnknownType(b'X'))
    ));
}

#[test]
fn rejects_header_size_mismatch() {
    let mut frame = add_frame(1, b"ABC", 1, b'B', 10, 100);
    // shrink the advertised size without touching the body
    frame[4..8].copy_from_slice(&30u32.to_le_bytes());

    let mut dec = FrameDecoder::new();
    dec.push(&frame);
    assert!(matches!(
        dec.next_record(),
        Err(FrameError::SizeMismatch { header: 30, expected: 31 })
    ));
}

#[test]
fn finish_distinguishes_truncation_from_clean_eof() {
    let dec = FrameDecoder::new();
    dec.finish().expect("empty stream is a clean eof");

    let frame = add_frame(1, b"ABC", 1, b'B', 10, 100);
    let mut dec = FrameDecoder::new();
    dec.push(&frame[..frame.len() - 3]);
    assert_eq!(dec.next_record().unwrap(), None);
    assert!(matches!(dec.finish(), Err(FrameError::Truncated { .. })));
}

#[test]
fn longer_header_skips_padding() {
    // a 10-byte header carries two bytes of padding after seq and size
    let frame = add_frame(1, b"ABC", 1, b'B', 10, 100);
    let mut padded = frame[..8].to_vec();
    padded.extend_from_slice(&[0xEE, 0xEE]);
    padded.extend_from_slice(&frame[8..]);

    let mut dec = FrameDecoder::with_header_len(10);
    dec.push(&padded);
    let rec = dec.next_record().unwrap().expect("complete record");
    assert_eq!(rec.seq, 1);
    dec.finish().unwrap();
}
