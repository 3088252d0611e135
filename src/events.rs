//! Primitive JSON events in document order.
//!
//! serde_json does the tokenizing; a `DeserializeSeed` visitor forwards each
//! value to an [`EventSink`] as it is read, so no DOM is built and duplicate
//! keys survive. The first sink error stops the stream and is handed back
//! unchanged instead of as a stringified serde error.

use std::fmt;

use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};

use crate::error::SchemaError;
use crate::ir::Scalar;

#[derive(Debug, Clone, PartialEq)]
pub enum JsonEvent {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    Key(String),
    Scalar(Scalar),
}

pub trait EventSink {
    fn process(&mut self, event: JsonEvent) -> Result<(), SchemaError>;
}

/// Collects events; handy for inspecting what the tokenizer produced.
impl EventSink for Vec<JsonEvent> {
    fn process(&mut self, event: JsonEvent) -> Result<(), SchemaError> {
        self.push(event);
        Ok(())
    }
}

/// Feeds every event of `src` to `sink`. Trailing characters after the
/// top-level value are a syntax error.
pub fn stream_events<S: EventSink>(src: &str, sink: &mut S) -> Result<(), SchemaError> {
    let mut relay = Relay { sink, fault: None };
    let mut de = serde_json::Deserializer::from_str(src);
    let streamed = EventSeed { relay: &mut relay }
        .deserialize(&mut de)
        .and_then(|()| de.end());
    match streamed {
        Ok(()) => Ok(()),
        Err(error) => Err(relay.fault.take().unwrap_or_else(|| error.into())),
    }
}

// ------------------------------- Relay ----------------------------------- //

struct Relay<'s, S> {
    sink: &'s mut S,
    fault: Option<SchemaError>,
}

impl<S: EventSink> Relay<'_, S> {
    fn emit<E: de::Error>(&mut self, event: JsonEvent) -> Result<(), E> {
        self.sink.process(event).map_err(|error| {
            let message = error.to_string();
            self.fault = Some(error);
            E::custom(message)
        })
    }
}

struct EventSeed<'r, 's, S> {
    relay: &'r mut Relay<'s, S>,
}

impl<'de, S: EventSink> DeserializeSeed<'de> for EventSeed<'_, '_, S> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de, S: EventSink> Visitor<'de> for EventSeed<'_, '_, S> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        self.relay.emit(JsonEvent::Scalar(Scalar::Null))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<(), E> {
        self.relay.emit(JsonEvent::Scalar(Scalar::Bool(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<(), E> {
        self.relay.emit(JsonEvent::Scalar(Scalar::Number(v.into())))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<(), E> {
        self.relay.emit(JsonEvent::Scalar(Scalar::Number(v.into())))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<(), E> {
        let number = serde_json::Number::from_f64(v)
            .ok_or_else(|| E::custom(format!("non-finite number {v}")))?;
        self.relay.emit(JsonEvent::Scalar(Scalar::Number(number)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<(), E> {
        self.relay.emit(JsonEvent::Scalar(Scalar::String(v.to_owned())))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<(), E> {
        self.relay.emit(JsonEvent::Scalar(Scalar::String(v)))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        self.relay.emit(JsonEvent::StartArray)?;
        while seq.next_element_seed(EventSeed { relay: &mut *self.relay })?.is_some() {}
        self.relay.emit(JsonEvent::EndArray)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        self.relay.emit(JsonEvent::StartObject)?;
        while let Some(key) = map.next_key::<String>()? {
            self.relay.emit(JsonEvent::Key(key))?;
            map.next_value_seed(EventSeed { relay: &mut *self.relay })?;
        }
        self.relay.emit(JsonEvent::EndObject)
    }
}

// ------------------------------- Tests ------------------------------------ //
