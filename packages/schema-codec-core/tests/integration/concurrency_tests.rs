//! Decodes on several threads while schemas change underneath them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use ntest::timeout;

use schema_codec_core::Activation;

use super::helpers::{triple_codec, triple_primary, triple_skipping_f2, Triple};

#[test]
#[timeout(10000)]
fn test_decode_during_schema_toggling() {
    let (metadata, codec) = triple_codec();
    let value = Triple {
        f1: 7,
        f2: vec![1, 2, 3],
        f3: "ok".to_string(),
    };
    let bytes = Arc::new(codec.to_vec(&value).unwrap());
    let stop = Arc::new(AtomicBool::new(false));
    let decoded = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let codec = codec.clone();
            let bytes = bytes.clone();
            let stop = stop.clone();
            let decoded = decoded.clone();
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let mut target = Triple::default();
                    let mut cursor = 0;
                    codec.decode(&bytes, &mut cursor, &mut target).unwrap();
                    assert_eq!(cursor, bytes.len());
                    assert_eq!(target.f1, 7);
                    assert_eq!(target.f3, "ok");
                    // Either whole schema applies; never a mix of the two.
                    assert!(target.f2.is_empty() || target.f2 == vec![1, 2, 3]);
                    decoded.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for _ in 0..200 {
        metadata.publish(triple_skipping_f2()).unwrap();
        metadata.restore_primary("Triple").unwrap();
    }
    stop.store(true, Ordering::Relaxed);

    for reader in readers {
        reader.join().unwrap();
    }

    assert!(decoded.load(Ordering::Relaxed) > 0);
    assert_eq!(codec.generation_count(), 2);
    assert_eq!(codec.activate(&triple_primary()).unwrap(), Activation::Unchanged);
}

#[test]
#[timeout(10000)]
fn test_concurrent_activation_generates_once() {
    let (_metadata, codec) = triple_codec();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let codec = codec.clone();
            thread::spawn(move || codec.activate(&triple_skipping_f2()).unwrap())
        })
        .collect();
    let outcomes: Vec<Activation> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(codec.generation_count(), 2);
    assert_eq!(
        outcomes
            .iter()
            .filter(|a| **a == Activation::Generated)
            .count(),
        1
    );
    assert!(outcomes
        .iter()
        .all(|a| matches!(a, Activation::Generated | Activation::Unchanged)));
    assert!(!codec.is_writable());
}

#[test]
#[timeout(10000)]
fn test_encoders_share_one_codec() {
    let (_metadata, codec) = triple_codec();

    let handles: Vec<_> = (0..4u64)
        .map(|i| {
            let codec = codec.clone();
            thread::spawn(move || {
                let value = Triple {
                    f1: i,
                    f2: vec![i as u8; i as usize],
                    f3: format!("t{}", i),
                };
                let bytes = codec.to_vec(&value).unwrap();
                let mut back = Triple::default();
                codec.decode(&bytes, &mut 0, &mut back).unwrap();
                assert_eq!(back, value);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
