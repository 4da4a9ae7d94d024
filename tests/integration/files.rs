use crate::*;

use chunkio_core::{BiasedStream, ChunkConfig};

/// Write a tree to a real file, then read it back from a fresh handle.
#[test]
fn test_file_round_trip() -> Result<()> {
    let tmp = TempFile::new("round-trip.w3d");
    let tree = vec![
        branch(0x0000_0000, vec![leaf(0x0000_0001, b"header"), leaf(0x0000_0002, &[3u8; 300])]),
        Node::Micro {
            id: 0x0000_0700,
            micros: vec![(1, b"name".to_vec()), (2, 7u32.to_ne_bytes().to_vec())],
        },
    ];

    {
        let mut file = tmp.open_rw()?;
        let mut w = ChunkWriter::new(&mut file);
        write_tree(&mut w, &tree)?;
    }

    let on_disk = tmp.read_all()?;
    assert_eq!(on_disk, encode(&tree)?);

    let mut file = std::fs::File::open(&tmp.path)?;
    let mut r = ChunkReader::with_config(&mut file, &ChunkConfig::default());
    assert_eq!(read_tree(&mut r, &tree)?, tree);
    Ok(())
}

/// A chunk file written into the middle of an archive-like buffer does not
/// disturb the bytes around it and reads back through the same window.
#[test]
fn test_chunks_inside_bias_window() -> Result<()> {
    let tree = vec![branch(0x55, vec![leaf(0x56, b"embedded")])];
    let prefix = vec![0xAAu8; 100];
    let mut archive = Cursor::new(prefix.clone());

    {
        let mut window = BiasedStream::new(&mut archive, 100, 0)?;
        let mut w = ChunkWriter::new(&mut window);
        write_tree(&mut w, &tree)?;
        drop(w);
        assert_eq!(window.window_len(), tree[0].wire_len() as u64);
    }
    archive.get_mut().extend_from_slice(&[0xBB; 16]);

    let bytes = archive.get_ref().clone();
    assert_eq!(&bytes[..100], &prefix[..]);
    assert_eq!(&bytes[100..100 + 24], &encode(&tree)?[..]);
    assert!(bytes[124..].iter().all(|&b| b == 0xBB));

    let len = tree[0].wire_len() as u64;
    let mut window = BiasedStream::new(&mut archive, 100, len)?;
    let mut r = ChunkReader::new(&mut window);
    assert_eq!(read_tree(&mut r, &tree)?, tree);

    // The window ends where the chunk file ends; the trailing 0xBB bytes
    // are invisible to the reader.
    assert!(matches!(
        r.open_chunk(),
        Err(ChunkError::ShortRead { wanted: 8, got: 0 })
    ));
    Ok(())
}

/// A header cut off by the end of the window is a short read, even though
/// the underlying stream has more bytes.
#[test]
fn test_window_truncates_header() -> Result<()> {
    let bytes = encode(&[leaf(1, b"abc")])?;
    let mut archive = Cursor::new(bytes);
    let mut window = BiasedStream::new(&mut archive, 0, 5)?;
    let mut r = ChunkReader::new(&mut window);
    assert!(matches!(
        r.open_chunk(),
        Err(ChunkError::ShortRead { wanted: 8, got: 5 })
    ));
    Ok(())
}

/// A window cut inside a chunk: closing it cannot skip the declared
/// remainder, but the chunk is still closed and counted in its parent.
#[test]
fn test_close_past_window_end_is_short_seek() -> Result<()> {
    let tree = vec![branch(1, vec![leaf(2, &[7u8; 20])])];
    let bytes = encode(&tree)?;
    let mut archive = Cursor::new(bytes);
    let mut window = BiasedStream::new(&mut archive, 0, 8 + 8 + 4)?;
    let mut r = ChunkReader::new(&mut window);

    r.open_chunk()?;
    r.open_chunk()?;
    let mut buf = [0u8; 4];
    r.read(&mut buf)?;

    match r.close_chunk() {
        Err(ChunkError::ShortSeek { wanted: 16, moved: 0 }) => {}
        other => bail!("expected short seek, got {other:?}"),
    }
    assert_eq!(r.depth(), 1);
    assert_eq!(r.remaining(), 0);
    assert!(matches!(r.open_chunk(), Err(ChunkError::EndOfChunk)));
    Ok(())
}

#[test]
fn test_close_micro_past_window_end_is_short_seek() -> Result<()> {
    let tree = vec![Node::Micro {
        id: 1,
        micros: vec![(2, vec![9u8; 10])],
    }];
    let bytes = encode(&tree)?;
    let mut archive = Cursor::new(bytes);
    let mut window = BiasedStream::new(&mut archive, 0, 8 + 8 + 3)?;
    let mut r = ChunkReader::new(&mut window);

    r.open_chunk()?;
    r.open_micro_chunk()?;
    match r.close_micro_chunk() {
        Err(ChunkError::ShortSeek { wanted: 10, moved: 3 }) => {}
        other => bail!("expected short seek, got {other:?}"),
    }
    assert!(!r.in_micro_chunk());
    assert_eq!(r.depth(), 1);
    assert_eq!(r.remaining(), 0);
    Ok(())
}
