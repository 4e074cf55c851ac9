//! Field definitions and the [`FieldSet`] bitmask.

use crate::id::FieldId;

/// Definition of a per-cell scalar field held by the field grid.
///
/// Every Cumulus field is a non-negative `f32` scalar. `FieldId(n)` is the
/// index of the definition in the registration list.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    /// Human-readable name for logging.
    pub name: String,
    /// Unit annotation (e.g. `"mm"`).
    pub units: String,
    /// Whether the field may only increase between resets.
    ///
    /// The field grid raises any staged decrease back to the previous
    /// generation when it sanitizes a substep.
    pub monotone: bool,
}

impl FieldDef {
    /// A freely evolving scalar field.
    pub fn scalar(name: &str, units: &str) -> Self {
        Self {
            name: name.to_string(),
            units: units.to_string(),
            monotone: false,
        }
    }

    /// A monotonically non-decreasing accumulator field.
    pub fn accumulator(name: &str, units: &str) -> Self {
        Self {
            monotone: true,
            ..Self::scalar(name, units)
        }
    }
}

/// A set of field IDs packed into a single 64-bit mask.
///
/// Used by propagators to declare which fields they read and write so the
/// pipeline can be validated at engine start. Only IDs below
/// [`FieldSet::CAPACITY`] can be represented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldSet {
    mask: u64,
}

impl FieldSet {
    /// Number of distinct field IDs a set can hold.
    pub const CAPACITY: u32 = 64;

    /// Create an empty field set.
    pub const fn empty() -> Self {
        Self { mask: 0 }
    }

    /// Insert a field ID into the set.
    ///
    /// Returns `false` if the ID is outside [`FieldSet::CAPACITY`] and was
    /// not stored.
    pub fn insert(&mut self, field: FieldId) -> bool {
        if field.0 >= Self::CAPACITY {
            return false;
        }
        self.mask |= 1u64 << field.0;
        true
    }

    /// Check whether the set contains a field ID.
    pub fn contains(&self, field: FieldId) -> bool {
        field.0 < Self::CAPACITY && self.mask & (1u64 << field.0) != 0
    }

    /// Return the union of two sets (`self | other`).
    pub fn union(&self, other: &Self) -> Self {
        Self {
            mask: self.mask | other.mask,
        }
    }

    /// Elements in `self` but not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        Self {
            mask: self.mask & !other.mask,
        }
    }

    /// Returns `true` if the set contains no fields.
    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// Returns the number of fields in the set.
    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    /// Iterate over the field IDs in the set, in ascending order.
    pub fn iter(&self) -> FieldSetIter {
        FieldSetIter { rest: self.mask }
    }
}

impl FromIterator<FieldId> for FieldSet {
    fn from_iter<I: IntoIterator<Item = FieldId>>(iter: I) -> Self {
        let mut set = Self::empty();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

impl IntoIterator for &FieldSet {
    type Item = FieldId;
    type IntoIter = FieldSetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over field IDs in a [`FieldSet`], yielding IDs in ascending order.
#[derive(Clone, Debug)]
pub struct FieldSetIter {
    rest: u64,
}

impl Iterator for FieldSetIter {
    type Item = FieldId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest == 0 {
            return None;
        }
        let bit = self.rest.trailing_zeros();
        self.rest &= self.rest - 1;
        Some(FieldId(bit))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.rest.count_ones() as usize;
        (n, Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_field_set() -> impl Strategy<Value = FieldSet> {
        prop::collection::vec(0u32..64, 0..16)
            .prop_map(|ids| ids.into_iter().map(FieldId).collect::<FieldSet>())
    }

    #[test]
    fn out_of_range_insert_is_refused() {
        let mut set = FieldSet::empty();
        assert!(!set.insert(FieldId(64)));
        assert!(set.is_empty());
        assert!(!set.contains(FieldId(200)));
    }

    #[test]
    fn accumulator_is_monotone() {
        assert!(FieldDef::accumulator("rain", "mm").monotone);
        assert!(!FieldDef::scalar("moisture", "kg/m3").monotone);
    }

    proptest! {
        #[test]
        fn union_commutative(a in arb_field_set(), b in arb_field_set()) {
            prop_assert_eq!(a.union(&b), b.union(&a));
        }

        #[test]
        fn difference_removes_common(a in arb_field_set(), b in arb_field_set()) {
            for field in a.difference(&b).iter() {
                prop_assert!(a.contains(field));
                prop_assert!(!b.contains(field));
            }
        }

        #[test]
        fn union_contains_both(a in arb_field_set(), b in arb_field_set()) {
            let u = a.union(&b);
            for field in a.iter().chain(b.iter()) {
                prop_assert!(u.contains(field));
            }
            prop_assert!(u.difference(&a).difference(&b).is_empty());
        }

        #[test]
        fn iter_ascending_and_counted(a in arb_field_set()) {
            let ids: Vec<u32> = a.iter().map(|f| f.0).collect();
            prop_assert_eq!(ids.len(), a.len());
            prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
