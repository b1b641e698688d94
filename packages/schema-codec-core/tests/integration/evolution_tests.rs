//! Schema evolution tests: skip safety, frame exactness and cache reuse.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use schema_codec_core::wire::{check_layout, inspect_frames, FRAME_PREFIX_LEN};
use schema_codec_core::{Activation, CodecError};

use super::helpers::{triple_codec, triple_primary, triple_skipping_f2, Triple};

fn random_triple(rng: &mut StdRng) -> Triple {
    let len = rng.gen_range(0..512);
    let f2 = (0..len).map(|_| rng.gen()).collect();
    let f3_len = rng.gen_range(0..32);
    let f3 = (0..f3_len)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect();
    Triple {
        f1: rng.gen(),
        f2,
        f3,
    }
}

#[test]
fn test_round_trip_under_stable_schema() -> anyhow::Result<()> {
    let (_metadata, codec) = triple_codec();
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..64 {
        let value = random_triple(&mut rng);
        let bytes = codec.to_vec(&value)?;
        let mut decoded = Triple::default();
        let mut cursor = 0;
        codec.decode(&bytes, &mut cursor, &mut decoded)?;
        assert_eq!(decoded, value);
        assert_eq!(cursor, bytes.len());
    }
    Ok(())
}

#[test]
fn test_skip_member_recovers_neighbours() -> anyhow::Result<()> {
    let (metadata, codec) = triple_codec();
    let mut rng = StdRng::seed_from_u64(42);

    let values: Vec<Triple> = (0..32).map(|_| random_triple(&mut rng)).collect();
    let mut buf = Vec::new();
    let mut cursor = 0;
    for value in &values {
        codec.encode(&mut buf, &mut cursor, value)?;
    }

    metadata.publish(triple_skipping_f2())?;

    let mut cursor = 0;
    for value in &values {
        let mut target = Triple {
            f1: 0,
            f2: vec![0xAB; 3],
            f3: String::new(),
        };
        codec.decode(&buf, &mut cursor, &mut target)?;
        assert_eq!(target.f1, value.f1);
        assert_eq!(target.f3, value.f3);
        assert_eq!(target.f2, vec![0xAB; 3]);
    }
    assert_eq!(cursor, buf.len());
    Ok(())
}

#[test]
fn test_length_prefixes_match_payloads() -> anyhow::Result<()> {
    let (_metadata, codec) = triple_codec();
    let value = Triple {
        f1: 1,
        f2: vec![1, 2, 3, 4, 5],
        f3: "hello".to_string(),
    };
    let bytes = codec.to_vec(&value)?;

    let frames = inspect_frames(&bytes, 0, None)?;
    let lens: Vec<usize> = frames.iter().map(|f| f.len).collect();
    assert_eq!(lens, vec![8, 5, 5]);
    assert_eq!(frames[1].offset, frames[0].end());
    assert_eq!(frames[2].end(), bytes.len());
    assert_eq!(check_layout(&bytes, &triple_primary())?, 1);
    Ok(())
}

#[test]
fn test_corrupted_skipped_payload_does_not_shift_cursor() -> anyhow::Result<()> {
    let (metadata, codec) = triple_codec();
    let value = Triple {
        f1: 99,
        f2: b"nested-looking \x00\x00\x00\xFF content".to_vec(),
        f3: "after".to_string(),
    };
    let mut bytes = codec.to_vec(&value)?;

    // Scribble over the f2 payload, prefix left intact.
    let f2 = inspect_frames(&bytes, 0, None)?[1];
    let payload = f2.offset + FRAME_PREFIX_LEN..f2.end();
    for byte in &mut bytes[payload] {
        *byte = 0xFF;
    }

    metadata.publish(triple_skipping_f2())?;
    let mut decoded = Triple::default();
    let mut cursor = 0;
    codec.decode(&bytes, &mut cursor, &mut decoded)?;
    assert_eq!(decoded.f1, 99);
    assert_eq!(decoded.f3, "after");
    assert_eq!(cursor, bytes.len());

    // With f2 live the corrupted bytes are still just bytes; the cursor lands
    // on f3 all the same.
    metadata.restore_primary("Triple")?;
    let mut decoded = Triple::default();
    codec.decode(&bytes, &mut 0, &mut decoded)?;
    assert_eq!(decoded.f2, vec![0xFF; value.f2.len()]);
    assert_eq!(decoded.f3, "after");
    Ok(())
}

#[test]
fn test_truncated_buffer_reports_offset() {
    let (_metadata, codec) = triple_codec();
    let bytes = codec
        .to_vec(&Triple {
            f1: 5,
            f2: vec![1; 10],
            f3: "x".to_string(),
        })
        .unwrap();
    let truncated = &bytes[..bytes.len() - 1];

    let err = codec
        .decode(truncated, &mut 0, &mut Triple::default())
        .unwrap_err();
    assert!(matches!(
        err,
        CodecError::UnexpectedEof {
            needed: 1,
            available: 0,
            ..
        }
    ));
}

#[test]
fn test_alternating_schemas_reuse_cached_procedures() -> anyhow::Result<()> {
    let (metadata, codec) = triple_codec();
    let value = Triple {
        f1: 3,
        f2: vec![9],
        f3: "z".to_string(),
    };
    let bytes = codec.to_vec(&value)?;

    for _ in 0..10 {
        metadata.publish(triple_skipping_f2())?;
        let mut old_reader = Triple::default();
        codec.decode(&bytes, &mut 0, &mut old_reader)?;
        assert!(old_reader.f2.is_empty());

        metadata.restore_primary("Triple")?;
        let mut new_reader = Triple::default();
        codec.decode(&bytes, &mut 0, &mut new_reader)?;
        assert_eq!(new_reader, value);
    }

    assert_eq!(codec.generation_count(), 2);
    assert_eq!(codec.cached_schemas(), 2);
    assert_eq!(codec.activate(&triple_primary())?, Activation::Unchanged);
    Ok(())
}
