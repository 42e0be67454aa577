#![cfg_attr(docsrs, doc(cfg(feature = "serde")))]

//! Provides [`serde::Serialize`] support for [`Store`], [`Value`] and
//! [`Text`].
//!
//! A store serializes as a map in insertion order. Single-element values
//! serialize as scalars, longer ones as sequences.

use crate::{Store, Text, Value};
use serde::ser::{SerializeMap, SerializeSeq};

fn seq<S, T>(ser: S, items: &[T]) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: serde::Serialize,
{
    let mut seq = ser.serialize_seq(Some(items.len()))?;
    for item in items {
        seq.serialize_element(item)?;
    }
    seq.end()
}

impl serde::Serialize for Value {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Integer(block) => match &block[..] {
                [i] => ser.serialize_i64(*i),
                items => seq(ser, items),
            },
            Value::Double(block) => match &block[..] {
                [f] => ser.serialize_f64(*f),
                items => seq(ser, items),
            },
            Value::String(block) => match &block[..] {
                [s] => ser.serialize_str(s),
                items => seq(ser, items),
            },
        }
    }
}

impl serde::Serialize for Text {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        ser.serialize_str(self)
    }
}

impl serde::Serialize for Store {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = ser.serialize_map(Some(self.len()))?;
        for (name, value) in self.entries() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
