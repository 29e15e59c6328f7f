//! Object pairs checked for interference.

use std::fmt;

use hashbrown::{HashMap, HashSet};
use packing_types::{ObjectKind, PortRef, SpatialObject};

/// Interference pair categories, each aggregated into one constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PairCategory {
    /// Two components.
    ComponentComponent,
    /// A component and an interconnect not attached to it.
    ComponentInterconnect,
    /// Two interconnects.
    InterconnectInterconnect,
    /// A fixed structure and a movable object.
    Structure,
}

impl PairCategory {
    /// All categories in constraint order.
    pub const ALL: [Self; 4] = [
        Self::ComponentComponent,
        Self::ComponentInterconnect,
        Self::InterconnectInterconnect,
        Self::Structure,
    ];

    const fn of(a: ObjectKind, b: ObjectKind) -> Option<Self> {
        match (a, b) {
            (ObjectKind::Structure, ObjectKind::Structure) => None,
            (ObjectKind::Structure, _) | (_, ObjectKind::Structure) => Some(Self::Structure),
            (ObjectKind::Component, ObjectKind::Component) => Some(Self::ComponentComponent),
            (ObjectKind::Interconnect, ObjectKind::Interconnect) => {
                Some(Self::InterconnectInterconnect)
            }
            _ => Some(Self::ComponentInterconnect),
        }
    }
}

impl fmt::Display for PairCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ComponentComponent => "component-component",
            Self::ComponentInterconnect => "component-interconnect",
            Self::InterconnectInterconnect => "interconnect-interconnect",
            Self::Structure => "structure",
        };
        f.write_str(name)
    }
}

/// Unordered object index pairs per category.
///
/// Pairs are stored as `(i, j)` with `i < j`. There are no self pairs, no
/// duplicates, no pairs between two fixed structures, no pairs between an
/// interconnect and a component it attaches to and no pairs between two
/// interconnects leaving from or arriving at the same port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairSets {
    pairs: [Vec<(usize, usize)>; 4],
}

impl PairSets {
    /// Builds the pair sets for `objects`, indexed by position.
    #[must_use]
    pub fn build(objects: &[SpatialObject]) -> Self {
        let index: HashMap<&str, usize> = objects
            .iter()
            .enumerate()
            .map(|(i, o)| (o.name(), i))
            .collect();

        let resolve = |reference: &PortRef| -> Option<(usize, usize)> {
            let &object = index.get(reference.object.as_str())?;
            let port = objects[object].as_component()?.port_index(&reference.port)?;
            Some((object, port))
        };

        let mut attached: HashSet<(usize, usize)> = HashSet::new();
        let mut endpoints: Vec<[Option<(usize, usize)>; 2]> = vec![[None, None]; objects.len()];
        for (i, object) in objects.iter().enumerate() {
            if let Some(interconnect) = object.as_interconnect() {
                let ends = [interconnect.start(), interconnect.end()];
                for (slot, end) in ends.into_iter().enumerate() {
                    if let Some(&c) = index.get(end.object.as_str()) {
                        attached.insert((i.min(c), i.max(c)));
                    }
                    endpoints[i][slot] = resolve(end);
                }
            }
        }
        // Routes sharing a port node always touch there.
        let share_port = |i: usize, j: usize| {
            endpoints[i]
                .iter()
                .flatten()
                .any(|e| endpoints[j].iter().flatten().any(|f| e == f))
        };

        let mut pairs: [Vec<(usize, usize)>; 4] = Default::default();
        for i in 0..objects.len() {
            for j in i + 1..objects.len() {
                if attached.contains(&(i, j)) || share_port(i, j) {
                    continue;
                }
                if let Some(category) = PairCategory::of(objects[i].kind(), objects[j].kind()) {
                    pairs[category as usize].push((i, j));
                }
            }
        }
        Self { pairs }
    }

    /// Pairs of one category.
    #[must_use]
    pub fn get(&self, category: PairCategory) -> &[(usize, usize)] {
        &self.pairs[category as usize]
    }

    /// Categories with at least one pair, in constraint order.
    #[must_use]
    pub fn active_categories(&self) -> Vec<PairCategory> {
        PairCategory::ALL
            .into_iter()
            .filter(|c| !self.get(*c).is_empty())
            .collect()
    }

    /// Total number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.iter().map(Vec::len).sum()
    }

    /// Returns `true` if no pair is checked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over `(category, pairs)`.
    pub fn iter(&self) -> impl Iterator<Item = (PairCategory, &[(usize, usize)])> {
        PairCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}
