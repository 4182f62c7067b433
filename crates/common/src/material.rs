use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric block material identity.
///
/// A handful of well-known materials carry names so configuration files and
/// diagnostics stay readable; any other id is still a valid material and
/// renders as its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Material(pub u16);

impl Material {
    pub const AIR: Material = Material(0);
    pub const STONE: Material = Material(1);
    pub const GRASS: Material = Material(2);
    pub const DIRT: Material = Material(3);
    pub const COBBLESTONE: Material = Material(4);
    pub const WOOD: Material = Material(5);
    pub const WATER: Material = Material(9);
    pub const LAVA: Material = Material(11);
    pub const SAND: Material = Material(12);
    pub const LOG: Material = Material(17);
    pub const GLASS: Material = Material(20);
    pub const DISPENSER: Material = Material(23);
    pub const WOOL: Material = Material(35);
    pub const IRON_BLOCK: Material = Material(42);
    pub const TNT: Material = Material(46);
    pub const FURNACE: Material = Material(61);
    pub const SIGN: Material = Material(63);
    pub const WALL_SIGN: Material = Material(68);
    pub const LEVER: Material = Material(69);
    pub const SNOW_LAYER: Material = Material(78);
    pub const ICE: Material = Material(79);
    pub const FENCE: Material = Material(85);
    pub const REDSTONE_BLOCK: Material = Material(152);

    const NAMED: [(Material, &'static str); 23] = [
        (Self::AIR, "AIR"),
        (Self::STONE, "STONE"),
        (Self::GRASS, "GRASS"),
        (Self::DIRT, "DIRT"),
        (Self::COBBLESTONE, "COBBLESTONE"),
        (Self::WOOD, "WOOD"),
        (Self::WATER, "WATER"),
        (Self::LAVA, "LAVA"),
        (Self::SAND, "SAND"),
        (Self::LOG, "LOG"),
        (Self::GLASS, "GLASS"),
        (Self::DISPENSER, "DISPENSER"),
        (Self::WOOL, "WOOL"),
        (Self::IRON_BLOCK, "IRON_BLOCK"),
        (Self::TNT, "TNT"),
        (Self::FURNACE, "FURNACE"),
        (Self::SIGN, "SIGN"),
        (Self::WALL_SIGN, "WALL_SIGN"),
        (Self::LEVER, "LEVER"),
        (Self::SNOW_LAYER, "SNOW_LAYER"),
        (Self::ICE, "ICE"),
        (Self::FENCE, "FENCE"),
        (Self::REDSTONE_BLOCK, "REDSTONE_BLOCK"),
    ];

    /// Air is the only material that counts as "no block".
    pub fn is_air(self) -> bool {
        self == Self::AIR
    }

    /// Well-known name, if this id has one.
    pub fn name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(m, _)| *m == self)
            .map(|(_, name)| *name)
    }

    /// Look up a well-known material by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMED
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(m, _)| *m)
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Error parsing a material name or id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseMaterialError {
    #[error("unknown material name: {0}")]
    UnknownName(String),
    #[error("invalid variant in {0:?}")]
    BadVariant(String),
}

impl FromStr for Material {
    type Err = ParseMaterialError;

    /// Accepts a well-known name (`"wool"`) or a decimal id (`"35"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u16>() {
            return Ok(Material(id));
        }
        Material::from_name(s).ok_or_else(|| ParseMaterialError::UnknownName(s.to_string()))
    }
}

/// Material plus the sub-variant byte (colour, orientation, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockState {
    pub material: Material,
    pub variant: u8,
}

impl BlockState {
    pub const AIR: BlockState = BlockState {
        material: Material::AIR,
        variant: 0,
    };

    pub const fn new(material: Material, variant: u8) -> Self {
        Self { material, variant }
    }

    pub const fn of(material: Material) -> Self {
        Self {
            material,
            variant: 0,
        }
    }

    pub fn is_air(self) -> bool {
        self.material.is_air()
    }
}

impl From<Material> for BlockState {
    fn from(material: Material) -> Self {
        Self::of(material)
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.material, self.variant)
    }
}

impl FromStr for BlockState {
    type Err = ParseMaterialError;

    /// `"WOOL"` or `"WOOL:14"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((material, variant)) => {
                let variant = variant
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| ParseMaterialError::BadVariant(s.to_string()))?;
                Ok(BlockState::new(material.parse()?, variant))
            }
            None => Ok(BlockState::of(s.parse()?)),
        }
    }
}

/// An item stack dropped into the world when a block is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub material: Material,
    pub count: u32,
}
