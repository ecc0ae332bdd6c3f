//! Component property maps.

use crate::expression::Expression;
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An RGBA8 color property. Converts into a peniko [`Color`] for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl From<SerializableColor> for Color {
    fn from(c: SerializableColor) -> Self {
        Color::from_rgba8(c.r, c.g, c.b, c.a)
    }
}

/// A value bound to external data instead of a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Binding {
    /// Index into the drawing's parameters.
    Parameter(usize),
    /// Column index into the bound dataset; the row comes from the loop
    /// iteration or the dataset's active row.
    RowVariable(usize),
    /// Arithmetic over numbers, parameters and row variables.
    Expression(Expression),
}

impl From<Expression> for Binding {
    fn from(expression: Expression) -> Self {
        Binding::Expression(expression)
    }
}

/// A single property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropValue {
    Number(f64),
    Color(SerializableColor),
    Text(String),
    Flag(bool),
    Bound(Binding),
}

impl PropValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<SerializableColor> {
        match self {
            PropValue::Color(c) => Some(*c),
            _ => None,
        }
    }
}

impl From<f64> for PropValue {
    fn from(n: f64) -> Self {
        PropValue::Number(n)
    }
}

impl From<SerializableColor> for PropValue {
    fn from(c: SerializableColor) -> Self {
        PropValue::Color(c)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Flag(b)
    }
}

impl From<Binding> for PropValue {
    fn from(b: Binding) -> Self {
        PropValue::Bound(b)
    }
}

/// Declared type of an editable property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Number,
    Color,
    /// Not editable from the property panel.
    Opaque,
}

impl PropertyType {
    /// Check if a value may be assigned to a property of this type.
    /// Bindings are accepted for numeric properties.
    pub fn accepts(self, value: &PropValue) -> bool {
        match (self, value) {
            (PropertyType::Number, PropValue::Number(_) | PropValue::Bound(_)) => true,
            (PropertyType::Color, PropValue::Color(_)) => true,
            _ => false,
        }
    }
}

/// An ordered property map. Ordering keeps snapshots of replayed state
/// byte-for-byte comparable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Props(BTreeMap<String, PropValue>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<PropValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        self.0.remove(key)
    }

    /// Numeric value of a property.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PropValue::as_number)
    }

    /// Numeric value of a property, 0 when absent or not a number.
    pub fn number_or_zero(&self, key: &str) -> f64 {
        self.number(key).unwrap_or(0.0)
    }

    /// Shallow merge: keys in `partial` win.
    pub fn merge(&mut self, partial: &Props) {
        for (key, value) in &partial.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Shallow merge returning a new map.
    pub fn merged(&self, partial: &Props) -> Props {
        let mut out = self.clone();
        out.merge(partial);
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropValue)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut PropValue)> {
        self.0.iter_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, PropValue)> for Props {
    fn from_iter<T: IntoIterator<Item = (String, PropValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_new_keys_win() {
        let mut props = Props::new().with("x", 1.0).with("y", 2.0);
        props.merge(&Props::new().with("y", 5.0).with("width", 10.0));
        assert_eq!(props.number("x"), Some(1.0));
        assert_eq!(props.number("y"), Some(5.0));
        assert_eq!(props.number("width"), Some(10.0));
    }

    #[test]
    fn test_number_or_zero() {
        let props = Props::new().with("fill", SerializableColor::new(0, 0, 0, 255));
        assert!((props.number_or_zero("fill")).abs() < f64::EPSILON);
        assert!((props.number_or_zero("missing")).abs() < f64::EPSILON);
    }

    #[test]
    fn test_property_type_accepts() {
        let black = PropValue::Color(SerializableColor::new(0, 0, 0, 255));
        assert!(PropertyType::Number.accepts(&PropValue::Number(1.0)));
        assert!(PropertyType::Number.accepts(&PropValue::Bound(Binding::RowVariable(0))));
        assert!(PropertyType::Number.accepts(&PropValue::Bound(Expression::number(2.0).into())));
        assert!(!PropertyType::Number.accepts(&black));
        assert!(PropertyType::Color.accepts(&black));
        assert!(!PropertyType::Opaque.accepts(&PropValue::Number(1.0)));
    }

    #[test]
    fn test_color_into_peniko() {
        let color: Color = SerializableColor::new(10, 20, 30, 40).into();
        let rgba = color.to_rgba8();
        assert_eq!((rgba.r, rgba.g, rgba.b, rgba.a), (10, 20, 30, 40));
    }
}
