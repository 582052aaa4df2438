//! Drawing the questions of one participant turn.

use rand::seq::index;
use rand::Rng;

/// Questions (and therefore rounds) per participant turn.
pub const ROUNDS_PER_TURN: usize = 3;

/// Draw `ROUNDS_PER_TURN` distinct indices into a pool of `pool_len` questions,
/// uniformly without replacement and in random order. Callers guarantee
/// `pool_len >= ROUNDS_PER_TURN`; a smaller pool yields every index once.
pub fn draw_round<R: Rng + ?Sized>(pool_len: usize, rng: &mut R) -> Vec<usize> {
  index::sample(rng, pool_len, ROUNDS_PER_TURN.min(pool_len)).into_vec()
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::collections::HashSet;

  #[test]
  fn draws_three_distinct_in_range() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
      let picked = draw_round(5, &mut rng);
      assert_eq!(picked.len(), ROUNDS_PER_TURN);
      assert!(picked.iter().all(|i| *i < 5));
      assert_eq!(picked.iter().collect::<HashSet<_>>().len(), ROUNDS_PER_TURN);
    }
  }

  #[test]
  fn exact_pool_uses_every_question() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut picked = draw_round(3, &mut rng);
    picked.sort_unstable();
    assert_eq!(picked, vec![0, 1, 2]);
  }

  #[test]
  fn every_question_eventually_drawn() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut seen = HashSet::new();
    for _ in 0..100 {
      seen.extend(draw_round(8, &mut rng));
    }
    assert_eq!(seen.len(), 8);
  }
}
