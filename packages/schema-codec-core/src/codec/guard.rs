//! Decode recursion tracking per thread and codec instance.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CodecError;

static NEXT_CODEC_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // (codec id, depth) for every codec with a decode on this thread's stack
    static DECODE_DEPTHS: RefCell<Vec<(u64, usize)>> = const { RefCell::new(Vec::new()) };
}

/// Tracks how many decodes of one codec are on the current call stack.
#[derive(Debug)]
pub(crate) struct ReentrancyGuard {
    codec_id: u64,
}

impl ReentrancyGuard {
    pub(crate) fn new() -> Self {
        Self {
            codec_id: NEXT_CODEC_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Decode depth of this codec on the current thread.
    pub(crate) fn depth(&self) -> usize {
        DECODE_DEPTHS.with(|depths| {
            depths
                .borrow()
                .iter()
                .find(|(id, _)| *id == self.codec_id)
                .map(|(_, depth)| *depth)
                .unwrap_or(0)
        })
    }

    /// Marks a decode as entered. The returned scope leaves it on drop,
    /// including when the decode returns early with an error or unwinds.
    pub(crate) fn enter(&self) -> DecodeScope {
        DECODE_DEPTHS.with(|depths| {
            let mut depths = depths.borrow_mut();
            match depths.iter_mut().find(|(id, _)| *id == self.codec_id) {
                Some((_, depth)) => *depth += 1,
                None => depths.push((self.codec_id, 1)),
            }
        });
        DecodeScope {
            codec_id: self.codec_id,
            _not_send: PhantomData,
        }
    }

    /// Builds the veto error for a migration requested at `depth`.
    pub(crate) fn refuse(&self, type_id: &str, changed_type: &str, depth: usize) -> CodecError {
        tracing::warn!(
            "Refusing schema change of '{}' for '{}': decode depth {}",
            changed_type,
            type_id,
            depth
        );
        CodecError::UnsafeMigration {
            type_id: type_id.to_string(),
            changed_type: changed_type.to_string(),
            depth,
        }
    }
}

/// RAII marker of one decode in progress.
pub(crate) struct DecodeScope {
    codec_id: u64,
    // Bound to the thread-local it incremented
    _not_send: PhantomData<*const ()>,
}

impl Drop for DecodeScope {
    fn drop(&mut self) {
        // try_with: the thread-local may already be gone during thread teardown
        let _ = DECODE_DEPTHS.try_with(|depths| {
            let mut depths = depths.borrow_mut();
            if let Some(index) = depths.iter().position(|(id, _)| *id == self.codec_id) {
                if depths[index].1 <= 1 {
                    depths.swap_remove(index);
                } else {
                    depths[index].1 -= 1;
                }
            }
        });
    }
}
