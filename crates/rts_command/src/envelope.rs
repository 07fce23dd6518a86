//! Command envelopes and their wire form.
//!
//! An envelope is what a player's client sends: a command type, the
//! selected entities and an optional target and parameter. On the wire it
//! is a package of exactly six individually typed fields:
//!
//! | Index | Kind       | Content                                  |
//! |-------|------------|------------------------------------------|
//! | 0     | `Text`     | command type, `""` for the smart command |
//! | 1     | `IntArray` | recipient ids                            |
//! | 2     | `Long`     | target x, raw `I32F32` bits              |
//! | 3     | `Long`     | target y, raw `I32F32` bits              |
//! | 4     | `Int`      | target entity, `-1` for none             |
//! | 5     | `Text`     | parameter, `""` for none                 |

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::{CommandError, Result};
use crate::math::{Fixed, Vec2Fixed};

/// Wire sentinel for "no target entity".
pub const NO_ENTITY: i32 = -1;

/// Number of fields in a package.
pub const PACKAGE_FIELDS: usize = 6;

/// A player order as received from outside the simulation. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandEnvelope {
    command_type: Option<String>,
    recipients: Vec<EntityId>,
    target_position: Vec2Fixed,
    target_entity: Option<EntityId>,
    parameter: Option<String>,
}

impl CommandEnvelope {
    /// Build an envelope. Blank command types become the smart command.
    pub fn new(command_type: Option<&str>, recipients: Vec<EntityId>) -> Result<Self> {
        if recipients.is_empty() {
            return Err(CommandError::EmptyRecipients);
        }
        Ok(Self {
            command_type: command_type
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            recipients,
            target_position: Vec2Fixed::ZERO,
            target_entity: None,
            parameter: None,
        })
    }

    /// Set the target position.
    #[must_use]
    pub fn with_target_position(mut self, position: Vec2Fixed) -> Self {
        self.target_position = position;
        self
    }

    /// Set the target entity.
    #[must_use]
    pub fn with_target_entity(mut self, entity: EntityId) -> Self {
        self.target_entity = Some(entity);
        self
    }

    /// Set the parameter. Empty strings mean no parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: &str) -> Self {
        self.parameter = Some(parameter).filter(|p| !p.is_empty()).map(str::to_string);
        self
    }

    /// Command type, `None` for the smart command.
    #[must_use]
    pub fn command_type(&self) -> Option<&str> {
        self.command_type.as_deref()
    }

    /// Recipient ids in selection order.
    #[must_use]
    pub fn recipients(&self) -> &[EntityId] {
        &self.recipients
    }

    /// Target position, zero when undefined.
    #[must_use]
    pub const fn target_position(&self) -> Vec2Fixed {
        self.target_position
    }

    /// Target entity.
    #[must_use]
    pub const fn target_entity(&self) -> Option<EntityId> {
        self.target_entity
    }

    /// Parameter.
    #[must_use]
    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    /// Convert to the six-field wire package.
    pub fn to_package(&self) -> Result<CommandPackage> {
        let recipients = self
            .recipients
            .iter()
            .map(|&id| to_wire_id(id))
            .collect::<Result<Vec<_>>>()?;
        let target_entity = self.target_entity.map_or(Ok(NO_ENTITY), to_wire_id)?;

        Ok(CommandPackage {
            fields: vec![
                WireField::Text(self.command_type.clone().unwrap_or_default()),
                WireField::IntArray(recipients),
                WireField::Long(self.target_position.x.to_bits()),
                WireField::Long(self.target_position.y.to_bits()),
                WireField::Int(target_entity),
                WireField::Text(self.parameter.clone().unwrap_or_default()),
            ],
        })
    }

    /// Rebuild an envelope from a wire package.
    pub fn from_package(package: &CommandPackage) -> Result<Self> {
        let [command, recipients, x, y, target, parameter] = package.fields.as_slice() else {
            return Err(CommandError::MalformedPackage(format!(
                "expected {PACKAGE_FIELDS} fields, got {}",
                package.fields.len()
            )));
        };

        let command = expect_text(command, 0)?;
        let WireField::IntArray(recipients) = recipients else {
            return Err(kind_error(1, "IntArray", recipients));
        };
        let x = expect_long(x, 2)?;
        let y = expect_long(y, 3)?;
        let WireField::Int(target) = *target else {
            return Err(kind_error(4, "Int", target));
        };
        let parameter = expect_text(parameter, 5)?;

        if recipients.is_empty() {
            return Err(CommandError::EmptyRecipientList);
        }
        let recipients = recipients
            .iter()
            .map(|&id| from_wire_id(id))
            .collect::<Result<Vec<_>>>()?;
        let target_entity = match target {
            NO_ENTITY => None,
            id => Some(from_wire_id(id)?),
        };

        Ok(Self {
            command_type: Some(command).filter(|c| !c.is_empty()).map(str::to_string),
            recipients,
            target_position: Vec2Fixed::new(Fixed::from_bits(x), Fixed::from_bits(y)),
            target_entity,
            parameter: Some(parameter).filter(|p| !p.is_empty()).map(str::to_string),
        })
    }

    /// Encode to bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.to_package()?.encode()
    }

    /// Decode from bytes produced by [`CommandEnvelope::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::from_package(&CommandPackage::decode(bytes)?)
    }
}

/// One typed field of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireField {
    /// UTF-8 text.
    Text(String),
    /// Array of 32-bit integers.
    IntArray(Vec<i32>),
    /// 64-bit integer.
    Long(i64),
    /// 32-bit integer.
    Int(i32),
}

impl WireField {
    const fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "Text",
            Self::IntArray(_) => "IntArray",
            Self::Long(_) => "Long",
            Self::Int(_) => "Int",
        }
    }
}

/// Wire package of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPackage {
    /// Fields in wire order.
    pub fields: Vec<WireField>,
}

impl CommandPackage {
    /// Serialize with bincode.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CommandError::MalformedPackage(e.to_string()))
    }

    /// Deserialize with bincode. Layout is checked by [`CommandEnvelope::from_package`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| CommandError::MalformedPackage(e.to_string()))
    }
}

fn to_wire_id(id: EntityId) -> Result<i32> {
    i32::try_from(id)
        .map_err(|_| CommandError::MalformedPackage(format!("entity id {id} does not fit the wire")))
}

fn from_wire_id(id: i32) -> Result<EntityId> {
    EntityId::try_from(id)
        .map_err(|_| CommandError::MalformedPackage(format!("negative entity id {id}")))
}

fn kind_error(index: usize, expected: &str, found: &WireField) -> CommandError {
    CommandError::MalformedPackage(format!(
        "field {index}: expected {expected}, found {}",
        found.kind_name()
    ))
}

fn expect_text(field: &WireField, index: usize) -> Result<&str> {
    match field {
        WireField::Text(text) => Ok(text),
        other => Err(kind_error(index, "Text", other)),
    }
}

fn expect_long(field: &WireField, index: usize) -> Result<i64> {
    match field {
        WireField::Long(value) => Ok(*value),
        other => Err(kind_error(index, "Long", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> CommandEnvelope {
        CommandEnvelope::new(Some("Attack"), vec![3, 1, 2])
            .unwrap()
            .with_target_position(Vec2Fixed::new(
                Fixed::from_bits(-7_516_192_768),
                Fixed::from_num(10),
            ))
            .with_target_entity(9)
            .with_parameter("Marine")
    }

    #[test]
    fn test_package_layout() {
        let package = envelope().to_package().unwrap();
        assert_eq!(package.fields.len(), PACKAGE_FIELDS);
        assert_eq!(package.fields[0], WireField::Text("Attack".to_string()));
        assert_eq!(package.fields[1], WireField::IntArray(vec![3, 1, 2]));
        assert_eq!(package.fields[2], WireField::Long(-7_516_192_768));
        assert_eq!(package.fields[4], WireField::Int(9));
        assert_eq!(package.fields[5], WireField::Text("Marine".to_string()));
    }

    #[test]
    fn test_sentinels_roundtrip() {
        let original = CommandEnvelope::new(None, vec![5]).unwrap();
        let package = original.to_package().unwrap();
        assert_eq!(package.fields[0], WireField::Text(String::new()));
        assert_eq!(package.fields[4], WireField::Int(NO_ENTITY));
        assert_eq!(package.fields[5], WireField::Text(String::new()));

        let decoded = CommandEnvelope::decode(&original.encode().unwrap()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.command_type(), None);
        assert_eq!(decoded.target_entity(), None);
        assert_eq!(decoded.parameter(), None);
    }

    #[test]
    fn test_bytes_roundtrip() {
        let original = envelope();
        let decoded = CommandEnvelope::decode(&original.encode().unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_rejects_wrong_field_count() {
        let mut package = envelope().to_package().unwrap();
        package.fields.pop();
        assert!(matches!(
            CommandEnvelope::from_package(&package),
            Err(CommandError::MalformedPackage(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_field_kind() {
        let mut package = envelope().to_package().unwrap();
        package.fields[2] = WireField::Int(0);
        assert!(matches!(
            CommandEnvelope::from_package(&package),
            Err(CommandError::MalformedPackage(msg)) if msg.contains("field 2")
        ));
    }

    #[test]
    fn test_rejects_negative_and_empty_recipients() {
        let mut package = envelope().to_package().unwrap();
        package.fields[1] = WireField::IntArray(vec![1, -4]);
        assert!(matches!(
            CommandEnvelope::from_package(&package),
            Err(CommandError::MalformedPackage(_))
        ));

        package.fields[1] = WireField::IntArray(Vec::new());
        assert!(matches!(
            CommandEnvelope::from_package(&package),
            Err(CommandError::EmptyRecipientList)
        ));
    }

    #[test]
    fn test_rejects_oversized_id() {
        let envelope = CommandEnvelope::new(Some("Move"), vec![u32::MAX]).unwrap();
        assert!(matches!(
            envelope.to_package(),
            Err(CommandError::MalformedPackage(_))
        ));
    }

    #[test]
    fn test_empty_recipients_rejected_in_memory() {
        assert!(matches!(
            CommandEnvelope::new(Some("Move"), Vec::new()),
            Err(CommandError::EmptyRecipients)
        ));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(CommandEnvelope::decode(&[0xff, 0x00, 0x13]).is_err());
    }
}
