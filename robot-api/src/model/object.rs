//! Objects exchanged between nodes and cached in the node object store.
//!
//! Control objects (start, stop, ...) drive the process state; the others carry
//! data and may be cached per type.

use crate::model::identity::{InstrumentId, ObjectId};
use crate::model::instrument::Instrument;
use crate::model::order::{OrderState, Side};
use crate::model::types::{Price, Qty};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type tag of a node object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    Start,
    Stop,
    Activate,
    Deactivate,
    Reset,
    Reconfig,
    Field,
    Instr,
    Order,
    Signal,
}

impl ObjectType {
    pub fn name(self) -> &'static str {
        match self {
            ObjectType::Start => "start",
            ObjectType::Stop => "stop",
            ObjectType::Activate => "activate",
            ObjectType::Deactivate => "deactivate",
            ObjectType::Reset => "reset",
            ObjectType::Reconfig => "reconfig",
            ObjectType::Field => "field",
            ObjectType::Instr => "instr",
            ObjectType::Order => "order",
            ObjectType::Signal => "signal",
        }
    }

    /// True for objects that drive the process life cycle.
    pub fn is_control(self) -> bool {
        matches!(
            self,
            ObjectType::Start
                | ObjectType::Stop
                | ObjectType::Activate
                | ObjectType::Deactivate
                | ObjectType::Reset
                | ObjectType::Reconfig
        )
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(ObjectType::Start),
            "stop" => Ok(ObjectType::Stop),
            "activate" => Ok(ObjectType::Activate),
            "deactivate" => Ok(ObjectType::Deactivate),
            "reset" => Ok(ObjectType::Reset),
            "reconfig" => Ok(ObjectType::Reconfig),
            "field" => Ok(ObjectType::Field),
            "instr" => Ok(ObjectType::Instr),
            "order" => Ok(ObjectType::Order),
            "signal" => Ok(ObjectType::Signal),
            other => Err(format!("unknown object type '{}'", other)),
        }
    }
}

/// Hint bits of a reset request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResetHint(u32);

impl ResetHint {
    pub const STATISTIC: Self = Self(1);
    pub const FIX_SESSION: Self = Self(2);
    pub const STATE: Self = Self(4);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// The value of a UI field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl FieldValue {
    pub fn as_string(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
        }
    }
}

/// State of an order as propagated by a remote order-management node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub name: String,
    pub instr_id: InstrumentId,
    pub account: String,
    pub side: Side,
    pub qty: Qty,
    pub price: Price,
    pub state: OrderState,
    pub total_qty: Qty,
    pub avg_price: Price,
}

/// Payload of a node object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Start,
    Stop,
    Activate,
    Deactivate,
    Reset { hint: ResetHint },
    Reconfig,
    Field { name: String, value: FieldValue },
    Instr(Instrument),
    Order(OrderRecord),
    Signal { name: String, value: f64 },
}

impl Payload {
    /// Returns a blank payload of the given type.
    pub fn blank(object_type: ObjectType) -> Self {
        match object_type {
            ObjectType::Start => Payload::Start,
            ObjectType::Stop => Payload::Stop,
            ObjectType::Activate => Payload::Activate,
            ObjectType::Deactivate => Payload::Deactivate,
            ObjectType::Reset => Payload::Reset {
                hint: ResetHint::default(),
            },
            ObjectType::Reconfig => Payload::Reconfig,
            ObjectType::Field => Payload::Field {
                name: String::new(),
                value: FieldValue::String(String::new()),
            },
            ObjectType::Instr => Payload::Instr(Instrument::new(0, "", "", "", "")),
            ObjectType::Order => Payload::Order(OrderRecord {
                name: String::new(),
                instr_id: 0,
                account: String::new(),
                side: Side::Buy,
                qty: 0,
                price: 0.0,
                state: OrderState::Initial,
                total_qty: 0,
                avg_price: 0.0,
            }),
            ObjectType::Signal => Payload::Signal {
                name: String::new(),
                value: 0.0,
            },
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            Payload::Start => ObjectType::Start,
            Payload::Stop => ObjectType::Stop,
            Payload::Activate => ObjectType::Activate,
            Payload::Deactivate => ObjectType::Deactivate,
            Payload::Reset { .. } => ObjectType::Reset,
            Payload::Reconfig => ObjectType::Reconfig,
            Payload::Field { .. } => ObjectType::Field,
            Payload::Instr(_) => ObjectType::Instr,
            Payload::Order(_) => ObjectType::Order,
            Payload::Signal { .. } => ObjectType::Signal,
        }
    }
}

/// A typed node object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    id: ObjectId,
    payload: Payload,
}

impl Object {
    pub fn new(id: ObjectId, payload: Payload) -> Self {
        Self { id, payload }
    }

    /// Builds an uncached control object.
    pub fn control(payload: Payload) -> Self {
        Self::new(0, payload)
    }

    pub fn get_id(&self) -> ObjectId {
        self.id
    }

    pub fn get_type(&self) -> ObjectType {
        self.payload.object_type()
    }

    pub fn get_payload(&self) -> &Payload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_round_trip_through_from_str() {
        for ty in [ObjectType::Order, ObjectType::Signal, ObjectType::Reconfig] {
            assert_eq!(ty.name().parse::<ObjectType>().unwrap(), ty);
        }
        assert!("bogus".parse::<ObjectType>().is_err());
    }

    #[test]
    fn test_blank_payload_matches_type() {
        assert_eq!(Payload::blank(ObjectType::Field).object_type(), ObjectType::Field);
        assert!(ObjectType::Reset.is_control());
        assert!(!ObjectType::Order.is_control());
    }
}
