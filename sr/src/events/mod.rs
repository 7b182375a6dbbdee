//! Event Bus Architecture for sequence reporting
//!
//! The sequencer publishes lifecycle events; reporters subscribe per topic.
//!
//! # Architecture
//!
//! ```text
//!   Sequencer thread(s)
//!         │ publish(SequenceEvent)
//!         ▼
//! ┌─────────────────────────────────────────────┐
//! │                  EVENT BUS                  │
//! │  topic → [handler, handler, ...]            │
//! │  handlers run inline on publisher's thread  │
//! └─────────────────────────────────────────────┘
//!         │               │               │
//!         ▼               ▼               ▼
//!   CSV reporter     console sink      (others)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use seqreport::events::{create_event_bus, Topic};
//!
//! let bus = create_event_bus();
//! bus.subscribe(Topic::TestStart, |event| {
//!     println!("{:?}", event);
//!     Ok(())
//! });
//!
//! let publisher = bus.publisher();
//! publisher.sequence_update("Running");
//! ```

mod bus;
mod types;

pub use bus::{EventBus, SequencePublisher, SubscriptionId, create_event_bus};
pub use types::{CheckDescriptor, CheckField, CheckKind, ReportValue, SequenceEvent, TestInfo, TestStatus, Topic};
