//! Chain selection rule.  Only accumulated weight counts, height is never
//! looked at.

use std::cmp::Ordering;

use canon_primitives::id::BlockId;

use crate::tip_tracker::ChainTip;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ForkChoiceDecision {
    /// Stay on the active tip.
    Keep,

    /// Switch the active chain to this tip.
    Switch(BlockId),
}

/// Total order over tips, `Greater` meaning `a` is preferred.  Heavier wins,
/// and equal weights go to the lexicographically smaller blkid so every node
/// picks the same tip regardless of the order it saw them in.
pub fn compare_tips(a: &ChainTip, b: &ChainTip) -> Ordering {
    a.weight
        .cmp(&b.weight)
        .then_with(|| b.blkid.cmp(&a.blkid))
}

/// Decides if we should leave `active` for `candidate`.
pub fn evaluate(active: &ChainTip, candidate: &ChainTip) -> ForkChoiceDecision {
    if active.blkid == candidate.blkid {
        return ForkChoiceDecision::Keep;
    }

    match compare_tips(candidate, active) {
        Ordering::Greater => ForkChoiceDecision::Switch(candidate.blkid),
        _ => ForkChoiceDecision::Keep,
    }
}

/// Picks the most preferred of a set of tips.
pub fn pick_best_tip<'t>(tips: impl IntoIterator<Item = &'t ChainTip>) -> Option<&'t ChainTip> {
    tips.into_iter().max_by(|a, b| compare_tips(a, b))
}

#[cfg(test)]
mod tests {
    use canon_primitives::weight::ChainWeight;
    use canon_test_utils::random_blkid;
    use rand::seq::SliceRandom;

    use super::*;

    fn tip(id: u8, height: u64, weight: u128) -> ChainTip {
        ChainTip::new(BlockId::from([id; 32]), height, ChainWeight::new(weight))
    }

    #[test]
    fn test_heavier_wins_over_taller() {
        let tall_light = tip(1, 10, 20);
        let short_heavy = tip(2, 3, 21);

        assert_eq!(
            evaluate(&tall_light, &short_heavy),
            ForkChoiceDecision::Switch(short_heavy.blkid)
        );
        assert_eq!(evaluate(&short_heavy, &tall_light), ForkChoiceDecision::Keep);
    }

    #[test]
    fn test_tie_goes_to_smaller_blkid() {
        let lo = tip(1, 5, 50);
        let hi = tip(2, 5, 50);

        assert_eq!(evaluate(&hi, &lo), ForkChoiceDecision::Switch(lo.blkid));
        assert_eq!(evaluate(&lo, &hi), ForkChoiceDecision::Keep);
    }

    #[test]
    fn test_evaluate_self_keeps() {
        let t = tip(3, 7, 9);
        assert_eq!(evaluate(&t, &t), ForkChoiceDecision::Keep);
    }

    #[test]
    fn test_pick_best_independent_of_order() {
        let mut tips = (0..32)
            .map(|i| ChainTip::new(random_blkid(), i, ChainWeight::new((i % 5) as u128)))
            .collect::<Vec<_>>();

        let expected = *pick_best_tip(&tips).unwrap();
        assert_eq!(expected.weight, ChainWeight::new(4));

        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            tips.shuffle(&mut rng);
            assert_eq!(pick_best_tip(&tips), Some(&expected));
        }

        // Whichever tip a node happens to be on, it ends up switching to the
        // same one.
        for t in &tips {
            match evaluate(t, &expected) {
                ForkChoiceDecision::Keep => assert_eq!(t.blkid, expected.blkid),
                ForkChoiceDecision::Switch(id) => assert_eq!(id, expected.blkid),
            }
        }
    }

    #[test]
    fn test_pick_best_empty() {
        assert_eq!(pick_best_tip(&Vec::<ChainTip>::new()), None);
    }
}
