use craftspace_common::{BlockState, Material, ParseMaterialError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::builder::PredicateBuilder;

/// Token that stands for "every non-air material" in rendered and serialised form.
pub(crate) const ALL_TOKEN: &str = "*";

/// Errors from predicate construction and parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredicateError {
    #[error("a multi-material predicate needs at least two elements, got {count}")]
    TooFewElements { count: usize },
    #[error(transparent)]
    Parse(#[from] ParseMaterialError),
}

/// Classifier over `(material, variant)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub enum MaterialPredicate {
    /// Matches nothing.
    #[default]
    None,
    /// Matches every material except air.
    All,
    /// Matches one material with any variant.
    Single(Material),
    /// Matches one material with one variant.
    SinglePair(Material, u8),
    /// Matches any listed material (any variant) or any listed pair.
    Many {
        materials: BTreeSet<Material>,
        pairs: BTreeSet<(Material, u8)>,
    },
}

impl MaterialPredicate {
    /// Checked constructor for the multi-element shape.
    ///
    /// Pairs already covered by a whole material are dropped first, then
    /// fewer than two remaining elements is an error. Use
    /// [`MaterialPredicate::from_parts`] when the size is not known up front.
    pub fn many(
        materials: BTreeSet<Material>,
        mut pairs: BTreeSet<(Material, u8)>,
    ) -> Result<Self, PredicateError> {
        pairs.retain(|(m, _)| !materials.contains(m));
        let count = materials.len() + pairs.len();
        if count < 2 {
            return Err(PredicateError::TooFewElements { count });
        }
        Ok(Self::Many { materials, pairs })
    }

    /// Normalise a material set and a pair set into the smallest shape.
    ///
    /// Pairs whose material is already matched as a whole are dropped.
    pub fn from_parts(materials: BTreeSet<Material>, mut pairs: BTreeSet<(Material, u8)>) -> Self {
        pairs.retain(|(m, _)| !materials.contains(m));
        match (materials.len(), pairs.len()) {
            (0, 0) => Self::None,
            (1, 0) => materials.into_iter().next().map_or(Self::None, Self::Single),
            (0, 1) => pairs
                .into_iter()
                .next()
                .map_or(Self::None, |(m, v)| Self::SinglePair(m, v)),
            _ => Self::Many { materials, pairs },
        }
    }

    pub fn of(material: Material) -> Self {
        Self::Single(material)
    }

    /// Predicate over a list of materials, normalised.
    pub fn of_all(materials: impl IntoIterator<Item = Material>) -> Self {
        Self::from_parts(materials.into_iter().collect(), BTreeSet::new())
    }

    pub fn builder() -> PredicateBuilder {
        PredicateBuilder::new()
    }

    pub fn matches(&self, material: Material, variant: u8) -> bool {
        match self {
            Self::None => false,
            Self::All => !material.is_air(),
            Self::Single(m) => *m == material,
            Self::SinglePair(m, v) => *m == material && *v == variant,
            Self::Many { materials, pairs } => {
                materials.contains(&material) || pairs.contains(&(material, variant))
            }
        }
    }

    pub fn matches_state(&self, state: BlockState) -> bool {
        self.matches(state.material, state.variant)
    }

    /// True only for the predicate that can never match.
    pub fn is_trivial(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Rendered elements in stable order: whole materials, then pairs.
    fn tokens(&self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::All => vec![ALL_TOKEN.to_string()],
            Self::Single(m) => vec![m.to_string()],
            Self::SinglePair(m, v) => vec![format!("{m}:{v}")],
            Self::Many { materials, pairs } => materials
                .iter()
                .map(|m| m.to_string())
                .chain(pairs.iter().map(|(m, v)| format!("{m}:{v}")))
                .collect(),
        }
    }
}

impl fmt::Display for MaterialPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.tokens().join(", "))
    }
}

impl From<MaterialPredicate> for Vec<String> {
    fn from(p: MaterialPredicate) -> Self {
        p.tokens()
    }
}

impl TryFrom<Vec<String>> for MaterialPredicate {
    type Error = PredicateError;

    /// Parse `"WOOD"`, `"WOOL:14"`, `"35"` or `"*"` entries through the builder.
    fn try_from(entries: Vec<String>) -> Result<Self, Self::Error> {
        let mut builder = PredicateBuilder::new();
        for entry in &entries {
            let entry = entry.trim();
            if entry == ALL_TOKEN {
                builder.predicate(&MaterialPredicate::All);
            } else if entry.contains(':') {
                let state: BlockState = entry.parse()?;
                builder.pair(state.material, state.variant);
            } else {
                builder.material(entry.parse()?);
            }
        }
        Ok(builder.build())
    }
}
