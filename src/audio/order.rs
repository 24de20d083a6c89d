//! Play-order policy: where the cursor goes next.
//!
//! These are pure functions of the current index, the track count and the
//! mode. Randomness is passed in so callers (and tests) control the source.

use rand::Rng;

use super::types::{PlayOrder, Step};

/// Index after `current` under `order`.
pub fn next_index<R: Rng + ?Sized>(
    current: usize,
    count: usize,
    order: PlayOrder,
    rng: &mut R,
) -> Step {
    if count == 0 {
        return Step::End;
    }
    match order {
        PlayOrder::Normal => {
            if current + 1 < count {
                Step::Moved(current + 1)
            } else {
                Step::End
            }
        }
        PlayOrder::RepeatAll => Step::Moved((current + 1) % count),
        PlayOrder::RepeatOne => Step::Moved(current.min(count - 1)),
        PlayOrder::Shuffle => Step::Moved(random_other(current, count, rng)),
    }
}

/// Index before `current` under `order`.
pub fn previous_index<R: Rng + ?Sized>(
    current: usize,
    count: usize,
    order: PlayOrder,
    rng: &mut R,
) -> Step {
    if count == 0 {
        return Step::End;
    }
    match order {
        PlayOrder::Normal => {
            if current == 0 || current >= count {
                Step::End
            } else {
                Step::Moved(current - 1)
            }
        }
        PlayOrder::RepeatAll => {
            if current == 0 || current >= count {
                Step::Moved(count - 1)
            } else {
                Step::Moved(current - 1)
            }
        }
        PlayOrder::RepeatOne => Step::Moved(current.min(count - 1)),
        PlayOrder::Shuffle => Step::Moved(random_other(current, count, rng)),
    }
}

/// Uniform pick over every index except `current`. With a single track that
/// track is the only choice.
fn random_other<R: Rng + ?Sized>(current: usize, count: usize, rng: &mut R) -> usize {
    if count == 1 {
        return 0;
    }
    if current >= count {
        return rng.gen_range(0..count);
    }
    let pick = rng.gen_range(0..count - 1);
    if pick >= current { pick + 1 } else { pick }
}
