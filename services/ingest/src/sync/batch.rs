use std::num::NonZeroUsize;

/// Split `ids` into consecutive batches of at most `batch_size`, preserving order.
/// Only the last batch may be shorter.
pub fn chunk<T: Clone>(ids: &[T], batch_size: NonZeroUsize) -> Vec<Vec<T>> {
    ids.chunks(batch_size.get()).map(<[T]>::to_vec).collect()
}
