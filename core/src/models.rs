mod checkbox;
mod doc;
mod id;
mod tag;
mod view;

pub use checkbox::{record_transition, Checkbox, CheckboxEntry};
pub use doc::{ChildRef, Doc, DocKind, Field, History, Property, TextNode};
pub use id::{
    AnyDoc, DocId, DocIdKind, FieldId, FieldKind, Id, NodeId, NodeKind, PropertyId, PropertyKind,
    TagId, TagKind,
};
pub use tag::{Tag, TagHistory};
pub use view::{CurrentView, NodeView};

use chrono::{DateTime, Local, TimeZone, Utc};
use std::cell::Cell;
use std::rc::Rc;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Convert a millisecond timestamp to DateTime<Utc>
pub fn timestamp_to_datetime(timestamp: Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(timestamp).unwrap_or_default()
}

/// Convert a millisecond timestamp to local time
pub fn timestamp_to_local(timestamp: Timestamp) -> DateTime<Local> {
    Local.from_utc_datetime(&timestamp_to_datetime(timestamp).naive_utc())
}

/// Convert DateTime to a millisecond timestamp
pub fn datetime_to_timestamp<Tz: TimeZone>(datetime: &DateTime<Tz>) -> Timestamp {
    datetime.timestamp_millis()
}

/// Source of "now" for history bookkeeping.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        datetime_to_timestamp(&Utc::now())
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.set(self.now.get() + millis);
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.now.set(timestamp);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}
