//! Catalog record models
//!
//! Species and starship entries as stored in the relational store and as
//! served by the read API.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Starship category
///
/// Partitions the family-resolution space: resolution only ever compares
/// records within the same category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Starfighter,
    Transport,
    Capital,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Starfighter, Category::Transport, Category::Capital];

    /// Tag as stored in the `category` column
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Starfighter => "starfighter",
            Category::Transport => "transport",
            Category::Capital => "capital",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starfighter" => Ok(Category::Starfighter),
            "transport" => Ok(Category::Transport),
            "capital" => Ok(Category::Capital),
            other => Err(Error::InvalidInput(format!("Unknown category: {}", other))),
        }
    }
}

/// Family membership of a starship: `parent` + `isVariant`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage {
    pub parent: Option<String>,
    pub is_variant: bool,
}

impl Lineage {
    /// Lineage of a family base record
    pub fn base() -> Self {
        Self {
            parent: None,
            is_variant: false,
        }
    }

    /// Lineage of a variant belonging to the family named `parent`
    pub fn variant_of(parent: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            is_variant: true,
        }
    }
}

/// Species record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Species {
    pub slug: String,
    pub name: String,
    pub classification: Option<String>,
    pub homeworld: Option<String>,
    pub description: Option<String>,
    /// Free-form attribute object (stored as JSON text)
    pub properties: serde_json::Value,
    pub image_url: Option<String>,
    #[serde(skip)]
    pub created_at: Option<NaiveDateTime>,
}

/// Starship record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Starship {
    pub slug: String,
    pub name: String,
    pub category: Category,
    pub craft: Option<String>,
    pub affiliation: Option<String>,
    #[serde(rename = "type")]
    pub ship_type: Option<String>,
    pub scale: Option<String>,
    pub length: Option<String>,
    pub crew: Option<String>,
    pub passengers: Option<String>,
    pub cargo_capacity: Option<String>,
    pub consumables: Option<String>,
    pub cost: Option<String>,
    pub hyperdrive: Option<String>,
    pub maneuverability: Option<String>,
    pub space: Option<String>,
    pub atmosphere: Option<String>,
    pub hull: Option<String>,
    pub shields: Option<String>,
    #[serde(default)]
    pub weapons: Vec<serde_json::Value>,
    pub sensors: Option<serde_json::Value>,
    #[serde(default)]
    pub sources: Vec<serde_json::Value>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub image_filename: Option<String>,
    pub parent: Option<String>,
    #[serde(default)]
    pub is_variant: bool,
}

impl Starship {
    /// Bare record with every optional field empty
    pub fn new(slug: impl Into<String>, name: impl Into<String>, category: Category) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            category,
            craft: None,
            affiliation: None,
            ship_type: None,
            scale: None,
            length: None,
            crew: None,
            passengers: None,
            cargo_capacity: None,
            consumables: None,
            cost: None,
            hyperdrive: None,
            maneuverability: None,
            space: None,
            atmosphere: None,
            hull: None,
            shields: None,
            weapons: Vec::new(),
            sensors: None,
            sources: Vec::new(),
            description: None,
            image_url: None,
            image_filename: None,
            parent: None,
            is_variant: false,
        }
    }

    pub fn lineage(&self) -> Lineage {
        Lineage {
            parent: self.parent.clone(),
            is_variant: self.is_variant,
        }
    }

    pub fn set_lineage(&mut self, lineage: &Lineage) {
        self.parent = lineage.parent.clone();
        self.is_variant = lineage.is_variant;
    }

    /// Mutable access to a patchable text field
    pub fn field_mut(&mut self, field: ShipField) -> &mut Option<String> {
        match field {
            ShipField::Craft => &mut self.craft,
            ShipField::Affiliation => &mut self.affiliation,
            ShipField::Type => &mut self.ship_type,
            ShipField::Scale => &mut self.scale,
            ShipField::Length => &mut self.length,
            ShipField::Crew => &mut self.crew,
            ShipField::Passengers => &mut self.passengers,
            ShipField::CargoCapacity => &mut self.cargo_capacity,
            ShipField::Consumables => &mut self.consumables,
            ShipField::Cost => &mut self.cost,
            ShipField::Hyperdrive => &mut self.hyperdrive,
            ShipField::Maneuverability => &mut self.maneuverability,
            ShipField::Space => &mut self.space,
            ShipField::Atmosphere => &mut self.atmosphere,
            ShipField::Hull => &mut self.hull,
            ShipField::Shields => &mut self.shields,
            ShipField::Description => &mut self.description,
            ShipField::ImageUrl => &mut self.image_url,
            ShipField::ImageFilename => &mut self.image_filename,
        }
    }
}

/// Starship text field that the patch job may overwrite
///
/// `name`, `slug`, `category` and the lineage fields are not patchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShipField {
    Craft,
    Affiliation,
    Type,
    Scale,
    Length,
    Crew,
    Passengers,
    CargoCapacity,
    Consumables,
    Cost,
    Hyperdrive,
    Maneuverability,
    Space,
    Atmosphere,
    Hull,
    Shields,
    Description,
    ImageUrl,
    ImageFilename,
}

impl ShipField {
    pub const ALL: [ShipField; 19] = [
        ShipField::Craft,
        ShipField::Affiliation,
        ShipField::Type,
        ShipField::Scale,
        ShipField::Length,
        ShipField::Crew,
        ShipField::Passengers,
        ShipField::CargoCapacity,
        ShipField::Consumables,
        ShipField::Cost,
        ShipField::Hyperdrive,
        ShipField::Maneuverability,
        ShipField::Space,
        ShipField::Atmosphere,
        ShipField::Hull,
        ShipField::Shields,
        ShipField::Description,
        ShipField::ImageUrl,
        ShipField::ImageFilename,
    ];

    /// Column name in the `starships` table (also the JSON field name)
    pub fn column(self) -> &'static str {
        match self {
            ShipField::Craft => "craft",
            ShipField::Affiliation => "affiliation",
            ShipField::Type => "type",
            ShipField::Scale => "scale",
            ShipField::Length => "length",
            ShipField::Crew => "crew",
            ShipField::Passengers => "passengers",
            ShipField::CargoCapacity => "cargoCapacity",
            ShipField::Consumables => "consumables",
            ShipField::Cost => "cost",
            ShipField::Hyperdrive => "hyperdrive",
            ShipField::Maneuverability => "maneuverability",
            ShipField::Space => "space",
            ShipField::Atmosphere => "atmosphere",
            ShipField::Hull => "hull",
            ShipField::Shields => "shields",
            ShipField::Description => "description",
            ShipField::ImageUrl => "imageUrl",
            ShipField::ImageFilename => "imageFilename",
        }
    }
}
