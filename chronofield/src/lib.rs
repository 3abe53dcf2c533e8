//! Temporal field codec for persistence frameworks.
//!
//! Validates datetime, date and duration field declarations, encodes application
//! values into their storage form (auto timestamps, timezone pairing, ISO-8601
//! casting) and decodes them back. [`repository::Repo`] is an in-memory host
//! that drives the codec the way an ORM would.

pub mod clock;
pub mod codec;
pub mod config;
pub mod errors;
pub mod repository;
pub mod schema;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock, WriteContext};
pub use codec::{decode, encode, encode_lookup};
pub use errors::*;
pub use repository::{Repo, Row};
pub use schema::{DecodedRecord, FieldDef, ModelSchema, Record, StoredRecord, record};
pub use types::{
    FieldKind, FieldSpec, FieldSpecBuilder, RawValue, StorageValue, TemporalValue, TimezonePair,
};
