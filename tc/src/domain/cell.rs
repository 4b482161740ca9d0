//! Grid cells and world positions

use serde::{Deserialize, Serialize};

/// Side length of a grid cell in world units
pub const CELL_SIZE: i32 = 16;

/// A column of the world grid, addressed by its horizontal coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    pub x: i32,
    pub z: i32,
}

impl CellPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The four grid-adjacent cells (east, west, south, north)
    pub fn neighbors(self) -> [CellPos; 4] {
        [
            CellPos::new(self.x + 1, self.z),
            CellPos::new(self.x - 1, self.z),
            CellPos::new(self.x, self.z + 1),
            CellPos::new(self.x, self.z - 1),
        ]
    }

    /// World-space centre of the cell at the given height
    pub fn center(self, y: f64) -> Vec3 {
        let half = CELL_SIZE as f64 / 2.0;
        Vec3::new(
            (self.x * CELL_SIZE) as f64 + half,
            y,
            (self.z * CELL_SIZE) as f64 + half,
        )
    }

    /// Squared distance in the horizontal plane from `pos` to the cell centre
    pub fn horizontal_distance_sq(self, pos: Vec3) -> f64 {
        let c = self.center(pos.y);
        let dx = c.x - pos.x;
        let dz = c.z - pos.z;
        dx * dx + dz * dz
    }

    /// Chebyshev distance between two cells, in cells
    pub fn grid_distance(self, other: CellPos) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

impl std::fmt::Display for CellPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// A position in world space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The grid cell containing this position
    pub fn cell(self) -> CellPos {
        let size = CELL_SIZE as f64;
        CellPos::new((self.x / size).floor() as i32, (self.z / size).floor() as i32)
    }

    pub fn distance(self, other: Vec3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Terrain type of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    #[default]
    Plains,
    Forest,
    Desert,
    Swamp,
    Mountains,
    Ocean,
}

impl Terrain {
    pub const ALL: [Terrain; 6] = [
        Terrain::Plains,
        Terrain::Forest,
        Terrain::Desert,
        Terrain::Swamp,
        Terrain::Mountains,
        Terrain::Ocean,
    ];
}

impl std::fmt::Display for Terrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plains => write!(f, "plains"),
            Self::Forest => write!(f, "forest"),
            Self::Desert => write!(f, "desert"),
            Self::Swamp => write!(f, "swamp"),
            Self::Mountains => write!(f, "mountains"),
            Self::Ocean => write!(f, "ocean"),
        }
    }
}

impl std::str::FromStr for Terrain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plains" => Ok(Self::Plains),
            "forest" => Ok(Self::Forest),
            "desert" => Ok(Self::Desert),
            "swamp" => Ok(Self::Swamp),
            "mountains" => Ok(Self::Mountains),
            "ocean" => Ok(Self::Ocean),
            _ => Err(format!("Unknown terrain: {}", s)),
        }
    }
}

/// Observable contents of a loaded cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellData {
    pub terrain: Terrain,
    /// Standing here hurts the agent (fire, lava, ...)
    pub hazard: bool,
}

impl CellData {
    pub fn new(terrain: Terrain) -> Self {
        Self { terrain, hazard: false }
    }
}

/// Identifier of the world region the agent is in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionId(pub String);

impl RegionId {
    pub fn overworld() -> Self {
        Self("overworld".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RegionId {
    fn default() -> Self {
        Self::overworld()
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
