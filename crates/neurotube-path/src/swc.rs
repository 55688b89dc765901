//! SWC structural type tags.

use serde::{Deserialize, Serialize};

use crate::error::{PathError, Result};

/// An RGB display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Create a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Anatomical/structural tag carried by every path, following the SWC
/// morphology format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SwcType {
    /// No type assigned.
    #[default]
    Undefined,
    /// Cell body.
    Soma,
    /// Axon.
    Axon,
    /// Basal dendrite.
    Dendrite,
    /// Apical dendrite.
    ApicalDendrite,
    /// Fork point.
    ForkPoint,
    /// End point.
    EndPoint,
    /// User-defined.
    Custom,
}

impl SwcType {
    /// Every type, in SWC value order.
    pub const ALL: [SwcType; 8] = [
        SwcType::Undefined,
        SwcType::Soma,
        SwcType::Axon,
        SwcType::Dendrite,
        SwcType::ApicalDendrite,
        SwcType::ForkPoint,
        SwcType::EndPoint,
        SwcType::Custom,
    ];

    /// Numeric SWC value.
    pub fn value(self) -> i32 {
        match self {
            SwcType::Undefined => 0,
            SwcType::Soma => 1,
            SwcType::Axon => 2,
            SwcType::Dendrite => 3,
            SwcType::ApicalDendrite => 4,
            SwcType::ForkPoint => 5,
            SwcType::EndPoint => 6,
            SwcType::Custom => 7,
        }
    }

    /// Look up a type by its numeric SWC value.
    pub fn from_value(value: i32) -> Result<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| PathError::InvalidState(format!("unknown SWC type {value}")))
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            SwcType::Undefined => "undefined",
            SwcType::Soma => "soma",
            SwcType::Axon => "axon",
            SwcType::Dendrite => "(basal) dendrite",
            SwcType::ApicalDendrite => "apical dendrite",
            SwcType::ForkPoint => "fork point",
            SwcType::EndPoint => "end point",
            SwcType::Custom => "custom",
        }
    }

    /// Conventional display color, `None` for untyped paths.
    pub fn default_color(self) -> Option<Rgb> {
        match self {
            SwcType::Soma => Some(Rgb::new(0, 0, 255)),
            SwcType::Dendrite => Some(Rgb::new(0, 255, 0)),
            SwcType::ApicalDendrite => Some(Rgb::new(0, 255, 255)),
            SwcType::Axon => Some(Rgb::new(255, 0, 0)),
            SwcType::ForkPoint => Some(Rgb::new(255, 200, 0)),
            SwcType::EndPoint => Some(Rgb::new(255, 175, 175)),
            SwcType::Custom => Some(Rgb::new(255, 255, 0)),
            SwcType::Undefined => None,
        }
    }
}

impl TryFrom<i32> for SwcType {
    type Error = PathError;

    fn try_from(value: i32) -> Result<Self> {
        Self::from_value(value)
    }
}
