//! Deterministic step names.
//!
//! Every node carries a sequence value. The trigger holds [`ROOT_SEQUENCE`];
//! a child's value is derived from its parent's and its role, so the value
//! of a node is its path from the root written in base 3 behind a leading 1.
//! Two distinct paths therefore never share a value, and no shared counter is
//! needed while walking the tree. Values are unbounded, so this holds at any
//! depth.

use num_bigint::BigUint;
use num_traits::ToPrimitive;

/// A node's sequence value.
pub type Sequence = BigUint;

/// Sequence value held by the trigger.
pub const ROOT_SEQUENCE: u32 = 1;

/// Position of a child relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildRole {
    /// The step that runs after the parent (`3n`).
    Next,
    /// First step of a branch's failure arm (`3n + 1`).
    FailureArm,
    /// First step of a branch's success arm (`3n + 2`).
    SuccessArm,
}

impl ChildRole {
    fn offset(self) -> u32 {
        match self {
            ChildRole::Next => 0,
            ChildRole::FailureArm => 1,
            ChildRole::SuccessArm => 2,
        }
    }
}

pub fn root_sequence() -> Sequence {
    Sequence::from(ROOT_SEQUENCE)
}

/// Sequence value of a child.
pub fn sequence_value(parent: &Sequence, role: ChildRole) -> Sequence {
    parent * 3u32 + role.offset()
}

pub fn step_name(sequence: &Sequence) -> String {
    format!("step-{}", sequence)
}

/// Inverse of [`sequence_value`]: the parent value and role a value was
/// derived from. `None` for the root and for values no node can hold.
pub fn parent_of(sequence: &Sequence) -> Option<(Sequence, ChildRole)> {
    if *sequence < Sequence::from(3u32) {
        return None;
    }
    let role = match (sequence % 3u32).to_u32()? {
        0 => ChildRole::Next,
        1 => ChildRole::FailureArm,
        _ => ChildRole::SuccessArm,
    };
    Some((sequence / 3u32, role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn seq(value: u64) -> Sequence {
        Sequence::from(value)
    }

    #[test]
    fn test_sequence_value_roles() {
        let root = root_sequence();
        assert_eq!(sequence_value(&root, ChildRole::Next), seq(3));
        assert_eq!(sequence_value(&root, ChildRole::FailureArm), seq(4));
        assert_eq!(sequence_value(&root, ChildRole::SuccessArm), seq(5));
        assert_eq!(sequence_value(&seq(7), ChildRole::Next), seq(21));
        assert_eq!(sequence_value(&seq(7), ChildRole::FailureArm), seq(22));
        assert_eq!(sequence_value(&seq(7), ChildRole::SuccessArm), seq(23));
    }

    #[test]
    fn test_step_name() {
        assert_eq!(step_name(&seq(3)), "step-3");
        assert_eq!(step_name(&root_sequence()), "step-1");
    }

    #[test]
    fn test_names_stay_exact_past_machine_integers() {
        // 3^100 is far beyond u128.
        let mut value = root_sequence();
        for _ in 0..100 {
            value = sequence_value(&value, ChildRole::Next);
        }
        assert_eq!(
            step_name(&value),
            "step-515377520732011331036461129765621272702107522001"
        );

        let mut depth = 0;
        while let Some((parent, role)) = parent_of(&value) {
            assert_eq!(role, ChildRole::Next);
            value = parent;
            depth += 1;
        }
        assert_eq!(depth, 100);
        assert_eq!(value, root_sequence());
    }

    #[test]
    fn test_parent_of_inverts_sequence_value() {
        for parent in 1..500u64 {
            for role in [ChildRole::Next, ChildRole::FailureArm, ChildRole::SuccessArm] {
                let child = sequence_value(&seq(parent), role);
                assert_eq!(parent_of(&child), Some((seq(parent), role)));
            }
        }
        assert_eq!(parent_of(&root_sequence()), None);
        assert_eq!(parent_of(&seq(2)), None);
    }

    #[test]
    fn test_all_paths_up_to_depth_are_distinct() {
        // Every path of length <= 7 from the root, all three roles at each level.
        let mut seen = HashSet::from([root_sequence()]);
        let mut frontier = vec![root_sequence()];
        for _ in 0..7 {
            let mut next_frontier = Vec::new();
            for value in &frontier {
                for role in [ChildRole::Next, ChildRole::FailureArm, ChildRole::SuccessArm] {
                    let child = sequence_value(value, role);
                    assert!(seen.insert(child.clone()), "collision at {}", child);
                    next_frontier.push(child);
                }
            }
            frontier = next_frontier;
        }
        assert_eq!(seen.len(), (3usize.pow(8) - 1) / 2);
    }
}
