use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{AtmError, AtmResult};

pub type Denomination = u64;
pub type NoteCount = u64;

/// Notes taken per denomination. A breakdown produced by
/// [`CashInventory::breakdown`] always sums to the requested amount exactly.
pub type Breakdown = BTreeMap<Denomination, NoteCount>;

pub fn breakdown_total(notes: &Breakdown) -> u64 {
    notes.iter().map(|(denom, count)| denom * count).sum()
}

/// Renders a breakdown as `1x500, 2x100`, largest notes first.
pub fn format_breakdown(notes: &Breakdown) -> String {
    let parts: Vec<String> = notes
        .iter()
        .rev()
        .map(|(denom, count)| format!("{}x{}", count, denom))
        .collect();
    parts.join(", ")
}

/// The machine's stock of notes per denomination.
///
/// The denomination set is fixed at construction; counts change over the
/// inventory's life but denominations are never added or removed, and no
/// count ever goes negative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CashInventory {
    counts: BTreeMap<Denomination, NoteCount>,
}

impl CashInventory {
    pub fn new(denominations: &[Denomination]) -> CashInventory {
        let counts = denominations.iter().map(|&denom| (denom, 0)).collect();
        CashInventory { counts }
    }

    /// Greedy note selection for an exact amount, largest denomination first.
    ///
    /// At each denomination it takes `min(remaining / denom, available)`
    /// notes and succeeds only if nothing remains afterwards; a partial
    /// cover is discarded, never returned. The inventory itself is not
    /// touched. This is a feasibility check, not a change-making solver:
    /// when large notes are scarce relative to smaller ones, an amount a
    /// different note mix could cover may still be reported infeasible.
    pub fn breakdown(&self, amount: u64) -> Option<Breakdown> {
        let mut notes = Breakdown::new();
        let mut remaining = amount;

        for (&denom, &available) in self.counts.iter().rev() {
            if remaining == 0 {
                break;
            }
            let take = (remaining / denom).min(available);
            if take > 0 {
                notes.insert(denom, take);
                remaining -= denom * take;
            }
        }

        if remaining == 0 {
            Some(notes)
        } else {
            None
        }
    }

    /// Removes the notes of a breakdown from stock.
    ///
    /// Re-checks every count before mutating anything, so a failure leaves
    /// the inventory exactly as it was.
    pub fn apply(&mut self, notes: &Breakdown) -> AtmResult<()> {
        for (&denom, &needed) in notes {
            match self.counts.get(&denom) {
                None => return Err(AtmError::UnknownDenomination(denom)),
                Some(&available) if available < needed => {
                    return Err(AtmError::InsufficientInventory {
                        denom,
                        needed,
                        available,
                    })
                }
                Some(_) => {}
            }
        }
        for (&denom, &needed) in notes {
            if let Some(count) = self.counts.get_mut(&denom) {
                *count -= needed;
            }
        }
        Ok(())
    }

    /// Loads `count` notes of `denom` into the machine.
    pub fn add(&mut self, denom: Denomination, count: NoteCount) -> AtmResult<()> {
        if count == 0 {
            return Err(AtmError::InvalidCount);
        }
        match self.counts.get_mut(&denom) {
            Some(current) => {
                *current += count;
                Ok(())
            }
            None => Err(AtmError::UnknownDenomination(denom)),
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|(denom, count)| denom * count).sum()
    }

    /// Current stock, denomination descending.
    pub fn stock(&self) -> impl Iterator<Item = (Denomination, NoteCount)> + '_ {
        self.counts.iter().rev().map(|(&denom, &count)| (denom, count))
    }

    pub fn count(&self, denom: Denomination) -> Option<NoteCount> {
        self.counts.get(&denom).copied()
    }

    /// Overwrites one count when rebuilding state from a store.
    pub(crate) fn set_count(&mut self, denom: Denomination, count: NoteCount) -> AtmResult<()> {
        match self.counts.get_mut(&denom) {
            Some(current) => {
                *current = count;
                Ok(())
            }
            None => Err(AtmError::UnknownDenomination(denom)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const DENOMS: [Denomination; 4] = [500, 200, 100, 50];

    #[fixture]
    fn stocked() -> CashInventory {
        let mut inventory = CashInventory::new(&DENOMS);
        inventory.add(500, 2).unwrap();
        inventory.add(200, 3).unwrap();
        inventory.add(100, 5).unwrap();
        inventory.add(50, 10).unwrap();
        inventory
    }

    #[rstest]
    #[case(500, &[(500, 1)])]
    #[case(1000, &[(500, 2)])]
    #[case(1250, &[(500, 2), (200, 1), (50, 1)])]
    #[case(50, &[(50, 1)])]
    #[case(2600, &[(500, 2), (200, 3), (100, 5), (50, 10)])]
    fn takes_largest_notes_first(
        stocked: CashInventory,
        #[case] amount: u64,
        #[case] expected: &[(Denomination, NoteCount)],
    ) {
        let notes = stocked.breakdown(amount).unwrap();
        assert_eq!(notes, expected.iter().copied().collect::<Breakdown>());
        assert_eq!(breakdown_total(&notes), amount);
    }

    #[rstest]
    #[case(30)]
    #[case(525)]
    #[case(2650)]
    fn rejects_unrepresentable_amounts(stocked: CashInventory, #[case] amount: u64) {
        assert_eq!(stocked.breakdown(amount), None);
    }

    /// 600 is coverable as 3x200, but the pass takes the 500 note first
    /// and is left with a remainder of 100 it cannot cover. The engine
    /// reports infeasible instead of backtracking.
    #[test]
    fn misses_feasible_split_when_large_notes_scarce() {
        let mut inventory = CashInventory::new(&DENOMS);
        inventory.add(500, 1).unwrap();
        inventory.add(200, 3).unwrap();

        assert_eq!(inventory.breakdown(600), None);
        assert_eq!(inventory.breakdown(500), Some([(500, 1)].into()));
        assert_eq!(
            inventory.breakdown(1100),
            Some([(500, 1), (200, 3)].into())
        );
    }

    #[test]
    fn reports_infeasible_rather_than_guessing() {
        let mut inventory = CashInventory::new(&DENOMS);
        inventory.add(200, 1).unwrap();
        inventory.add(50, 1).unwrap();

        // 150 has no cover at all in {200:1, 50:1}; no partial result leaks
        assert_eq!(inventory.breakdown(150), None);
        assert_eq!(inventory.breakdown(250), Some([(200, 1), (50, 1)].into()));
    }

    #[rstest]
    fn breakdown_does_not_mutate(stocked: CashInventory) {
        let before = stocked.clone();
        stocked.breakdown(1250).unwrap();
        assert_eq!(stocked.breakdown(33), None);
        assert_eq!(stocked, before);
    }

    #[rstest]
    fn apply_removes_notes(mut stocked: CashInventory) {
        let notes = stocked.breakdown(1250).unwrap();
        let total_before = stocked.total();

        stocked.apply(&notes).unwrap();

        assert_eq!(stocked.total(), total_before - 1250);
        assert_eq!(stocked.count(500), Some(0));
        assert_eq!(stocked.count(200), Some(2));
        assert_eq!(stocked.count(50), Some(9));
    }

    #[rstest]
    fn apply_refuses_overdraw_and_leaves_stock_untouched(mut stocked: CashInventory) {
        let before = stocked.clone();
        let notes: Breakdown = [(500, 3)].into();

        let err = stocked.apply(&notes).unwrap_err();

        assert!(matches!(
            err,
            AtmError::InsufficientInventory { denom: 500, needed: 3, available: 2 }
        ));
        assert_eq!(stocked, before);
    }

    #[rstest]
    fn apply_refuses_unknown_denomination(mut stocked: CashInventory) {
        let notes: Breakdown = [(20, 1)].into();
        let err = stocked.apply(&notes).unwrap_err();
        assert!(matches!(err, AtmError::UnknownDenomination(20)));
    }

    #[test]
    fn add_validates_denomination_and_count() {
        let mut inventory = CashInventory::new(&DENOMS);

        assert!(matches!(
            inventory.add(20, 5),
            Err(AtmError::UnknownDenomination(20))
        ));
        assert!(matches!(inventory.add(100, 0), Err(AtmError::InvalidCount)));

        inventory.add(100, 5).unwrap();
        assert_eq!(inventory.count(100), Some(5));
        assert_eq!(inventory.total(), 500);
    }

    #[rstest]
    fn stock_lists_denominations_descending(stocked: CashInventory) {
        let denoms: Vec<Denomination> = stocked.stock().map(|(denom, _)| denom).collect();
        assert_eq!(denoms, vec![500, 200, 100, 50]);
    }

    #[rstest]
    fn can_format(stocked: CashInventory) {
        let notes = stocked.breakdown(1250).unwrap();
        assert_eq!(format_breakdown(&notes), "2x500, 1x200, 1x50");
    }
}
