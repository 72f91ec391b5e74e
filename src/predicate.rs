/// Where a predicate may appear in a generated rule.
///
/// Ordering matters: [`ChainCollection`](crate::collection::ChainCollection)
/// sorts chains by this type ascending, so `Condition` sorts before `Both`
/// which sorts before `Focus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PredicateType {
    Condition = 1,
    Both = 2,
    Focus = 3,
}

impl PredicateType {
    pub fn from_flags(is_condition: bool, is_focus: bool) -> Option<Self> {
        match (is_condition, is_focus) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::Condition),
            (false, true) => Some(Self::Focus),
            (false, false) => None,
        }
    }

    pub fn is_condition(self) -> bool {
        self != Self::Focus
    }

    pub fn is_focus(self) -> bool {
        self != Self::Condition
    }
}

/// Identity of a single input column: its 1-based id, display name, the
/// roles it may take in a generated clause, and its disjoint-group
/// membership (0 meaning "ungrouped").
#[derive(Debug, Clone)]
pub struct Predicate {
    pub id: usize,
    pub name: String,
    pub role: PredicateType,
    pub disjoint_group: usize,
}

impl Predicate {
    pub fn new(id: usize, name: impl Into<String>, role: PredicateType, disjoint_group: usize) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            disjoint_group,
        }
    }
}
