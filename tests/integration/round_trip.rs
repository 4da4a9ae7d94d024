use crate::*;

use chunkio_core::{ChunkConfig, IoQuaternion, IoVector2, IoVector3, IoVector4, RecordReadMode};

#[test]
fn test_nested_tree_round_trips() -> Result<()> {
    let tree = vec![
        branch(
            0x0000_0001,
            vec![
                leaf(0x0000_0002, b"mesh header"),
                branch(0x0000_0003, vec![leaf(0x0000_0004, &[0u8; 40])]),
                leaf(0x0000_0005, b""),
            ],
        ),
        leaf(0x0000_0100, b"trailing sibling"),
    ];

    let bytes = encode(&tree)?;
    let total: u32 = tree.iter().map(Node::wire_len).sum();
    assert_eq!(bytes.len(), total as usize);

    let mut cur = Cursor::new(bytes);
    let mut r = ChunkReader::new(&mut cur);
    let back = read_tree(&mut r, &tree)?;
    assert_eq!(back, tree);
    assert_eq!(r.depth(), 0);
    Ok(())
}

#[test]
fn test_random_trees_round_trip() -> Result<()> {
    for seed in 1..=64u64 {
        let mut rng = Rng::new(seed);
        let tree = random_tree(&mut rng, 4, 4);

        let bytes = encode(&tree)?;
        let mut cur = Cursor::new(bytes);
        let mut r = ChunkReader::new(&mut cur);
        let back = read_tree(&mut r, &tree).with_context(|| format!("seed {seed}"))?;
        assert_eq!(back, tree, "seed {seed}");

        // Nothing may follow the last top-level chunk.
        assert!(r.open_chunk().is_err(), "seed {seed}");
    }
    Ok(())
}

#[test]
fn test_size_propagates_through_every_level() -> Result<()> {
    let p = 13usize;
    let tree = vec![branch(
        0xA,
        vec![branch(0xB, vec![branch(0xC, vec![leaf(0xD, &vec![1u8; p])])])],
    )];
    let bytes = encode(&tree)?;

    // Headers sit back to back: A at 0, B at 8, C at 16, D at 24.
    assert_eq!(header_at(&bytes, 24), (0xD, p as u32));
    assert_eq!(header_at(&bytes, 16), (0xC, (p + 8) as u32));
    assert_eq!(header_at(&bytes, 8), (0xB, (p + 16) as u32));
    assert_eq!(header_at(&bytes, 0), (0xA, (p + 24) as u32));
    Ok(())
}

#[test]
fn test_parent_with_children_keeps_flag_clear() -> Result<()> {
    // Beginning a child clears the parent's nested flag rather than setting
    // it. Files from the legacy tools rely on this exact bit pattern.
    let tree = vec![branch(0x10, vec![leaf(0x11, b"a"), leaf(0x12, b"b")])];
    let bytes = encode(&tree)?;
    let (_, raw) = header_at(&bytes, 0);
    assert_eq!(raw & 0x8000_0000, 0);

    let mut cur = Cursor::new(bytes);
    let mut r = ChunkReader::new(&mut cur);
    r.open_chunk()?;
    assert!(!r.contains_chunks());
    Ok(())
}

#[test]
fn test_records_round_trip_in_exact_mode() -> Result<()> {
    let v2 = IoVector2 { x: 1.5, y: -0.25 };
    let v3 = IoVector3 { x: 10.0, y: 20.0, z: 30.0 };
    let v4 = IoVector4 { x: 0.1, y: 0.2, z: 0.3, w: 0.4 };
    let q = IoQuaternion { q: [0.0, 0.7071, 0.0, 0.7071] };

    let mut cur = Cursor::new(Vec::new());
    let mut w = ChunkWriter::new(&mut cur);
    w.begin_chunk(0x0301)?;
    w.write_record(&v2)?;
    w.write_record(&v3)?;
    w.write_record(&v4)?;
    w.write_record(&q)?;
    w.end_chunk()?;
    assert_eq!(header_at(cur.get_ref(), 0), (0x0301, 8 + 12 + 16 + 16));

    cur.set_position(0);
    let config = ChunkConfig {
        record_read: RecordReadMode::Exact,
        ..ChunkConfig::default()
    };
    let mut r = ChunkReader::with_config(&mut cur, &config);
    r.open_chunk()?;
    let (mut a, mut b, mut c, mut d) = (
        IoVector2::default(),
        IoVector3::default(),
        IoVector4::default(),
        IoQuaternion::default(),
    );
    r.read_record(&mut a)?;
    r.read_record(&mut b)?;
    r.read_record(&mut c)?;
    r.read_record(&mut d)?;
    assert_eq!((a, b, c, d), (v2, v3, v4, q));
    assert_eq!(r.remaining(), 0);
    r.close_chunk()?;
    Ok(())
}

#[test]
fn test_legacy_record_reads_consume_four_bytes() -> Result<()> {
    let v3 = IoVector3 { x: 4.0, y: 5.0, z: 6.0 };
    let mut cur = Cursor::new(Vec::new());
    let mut w = ChunkWriter::new(&mut cur);
    w.begin_chunk(1)?;
    w.write_record(&v3)?;
    w.write(b"tail")?;
    w.end_chunk()?;
    cur.set_position(0);

    let mut r = ChunkReader::new(&mut cur);
    r.open_chunk()?;
    let mut got = IoVector3::default();
    assert_eq!(r.read_record(&mut got)?, 4);
    assert_eq!(got, IoVector3 { x: 4.0, y: 0.0, z: 0.0 });
    assert_eq!(r.remaining(), 8 + 4);

    // Closing still lands on the sibling boundary.
    r.close_chunk()?;
    assert_eq!(cur.position(), 8 + 12 + 4);
    Ok(())
}
