use craftspace_common::Material;
use std::collections::BTreeSet;

use crate::predicate::MaterialPredicate;

/// Mutable accumulator for a [`MaterialPredicate`].
///
/// Once a match-everything predicate is absorbed the builder discards what it
/// held and ignores every later addition.
#[derive(Debug, Clone, Default)]
pub struct PredicateBuilder {
    all: bool,
    materials: BTreeSet<Material>,
    pairs: BTreeSet<(Material, u8)>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn material(&mut self, material: Material) -> &mut Self {
        if !self.all {
            self.materials.insert(material);
        }
        self
    }

    pub fn pair(&mut self, material: Material, variant: u8) -> &mut Self {
        if !self.all {
            self.pairs.insert((material, variant));
        }
        self
    }

    /// Absorb the contents of another predicate.
    pub fn predicate(&mut self, other: &MaterialPredicate) -> &mut Self {
        if self.all {
            return self;
        }
        match other {
            MaterialPredicate::None => {}
            MaterialPredicate::All => {
                self.all = true;
                self.materials.clear();
                self.pairs.clear();
            }
            MaterialPredicate::Single(m) => {
                self.materials.insert(*m);
            }
            MaterialPredicate::SinglePair(m, v) => {
                self.pairs.insert((*m, *v));
            }
            MaterialPredicate::Many { materials, pairs } => {
                self.materials.extend(materials.iter().copied());
                self.pairs.extend(pairs.iter().copied());
            }
        }
        self
    }

    pub fn build(&self) -> MaterialPredicate {
        if self.all {
            return MaterialPredicate::All;
        }
        MaterialPredicate::from_parts(self.materials.clone(), self.pairs.clone())
    }
}
