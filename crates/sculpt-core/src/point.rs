//! Component and point identifiers.

use kurbo::Point;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier of a component in the drawing.
///
/// The canvas is the root (`"0"`); every drawn shape is a child of it and
/// renders as `"0.<ordinal>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentId {
    Root,
    Child(u32),
}

impl ComponentId {
    /// Check if this is the root canvas.
    pub fn is_root(self) -> bool {
        self == ComponentId::Root
    }

    /// Ordinal of a child component.
    pub fn ordinal(self) -> Option<u32> {
        match self {
            ComponentId::Root => None,
            ComponentId::Child(n) => Some(n),
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentId::Root => write!(f, "0"),
            ComponentId::Child(n) => write!(f, "0.{}", n),
        }
    }
}

/// Error parsing a component or point identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError(pub String);

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid identifier: {}", self.0)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for ComponentId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            None if s == "0" => Ok(ComponentId::Root),
            Some(("0", ordinal)) => ordinal
                .parse()
                .map(ComponentId::Child)
                .map_err(|_| ParseIdError(s.to_string())),
            _ => Err(ParseIdError(s.to_string())),
        }
    }
}

impl Serialize for ComponentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ComponentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A named point on a specific component, e.g. `0.2:top left`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointRef {
    pub component: ComponentId,
    pub name: String,
}

impl PointRef {
    pub fn new(component: ComponentId, name: impl Into<String>) -> Self {
        Self {
            component,
            name: name.into(),
        }
    }

    /// Same point name on another component.
    pub fn with_component(&self, component: ComponentId) -> Self {
        Self {
            component,
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for PointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.component, self.name)
    }
}

impl FromStr for PointRef {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (component, name) = s.split_once(':').ok_or_else(|| ParseIdError(s.to_string()))?;
        Ok(Self::new(component.parse()?, name))
    }
}

/// A named point produced by a shape type from its props.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPoint {
    pub name: String,
    pub position: Point,
}

impl NamedPoint {
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            position: Point::new(x, y),
        }
    }
}

/// A point referenced by a step: a literal position, optionally locked onto
/// a snap point. The position is the coordinate observed when the step was
/// recorded; a snapped reference is re-resolved against current props when
/// the step is interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSpec {
    pub reference: Option<PointRef>,
    pub position: Point,
}

impl PointSpec {
    /// A free-standing coordinate.
    pub fn literal(position: Point) -> Self {
        Self {
            reference: None,
            position,
        }
    }

    /// A coordinate locked onto a snap point.
    pub fn snapped(reference: PointRef, position: Point) -> Self {
        Self {
            reference: Some(reference),
            position,
        }
    }

    /// Check if this point is locked onto a snap point.
    pub fn is_snapped(&self) -> bool {
        self.reference.is_some()
    }

    /// Name of the referenced snap point, if any.
    pub fn point_name(&self) -> Option<&str> {
        self.reference.as_ref().map(|r| r.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_id_format() {
        assert_eq!(ComponentId::Root.to_string(), "0");
        assert_eq!(ComponentId::Child(12).to_string(), "0.12");
    }

    #[test]
    fn test_component_id_parse() {
        assert_eq!("0".parse::<ComponentId>(), Ok(ComponentId::Root));
        assert_eq!("0.3".parse::<ComponentId>(), Ok(ComponentId::Child(3)));
        assert!("1.3".parse::<ComponentId>().is_err());
        assert!("0.x".parse::<ComponentId>().is_err());
        assert!("".parse::<ComponentId>().is_err());
    }

    #[test]
    fn test_point_ref_parse_keeps_spaces_in_name() {
        let point: PointRef = "0.4:top left".parse().unwrap();
        assert_eq!(point.component, ComponentId::Child(4));
        assert_eq!(point.name, "top left");
        assert_eq!(point.to_string(), "0.4:top left");
    }

    #[test]
    fn test_with_component_rewrites_only_component() {
        let point = PointRef::new(ComponentId::Child(1), "center");
        let moved = point.with_component(ComponentId::Child(7));
        assert_eq!(moved.to_string(), "0.7:center");
    }

    #[test]
    fn test_root_sorts_first() {
        let mut ids = vec![ComponentId::Child(2), ComponentId::Root, ComponentId::Child(0)];
        ids.sort();
        assert_eq!(ids, vec![ComponentId::Root, ComponentId::Child(0), ComponentId::Child(2)]);
    }
}
