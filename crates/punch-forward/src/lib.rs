//! punch-forward - Delivery of attendance records to the HR API
//!
//! Records are formatted into [`OutboundRecord`]s and POSTed as one batch.
//! When the batch is refused, [`Forwarder`] falls back to sending each record
//! on its own with a fixed pause between sends, and reports which ones
//! failed. The HR API also serves the employee list used for bulk imports.

pub mod client;
pub mod employees;
pub mod error;
pub mod forwarder;
pub mod record;

pub use client::{HrApi, HrClient, HrClientConfig, HrResponse};
pub use employees::{extract_employees, Employee};
pub use error::{ForwardError, ForwardResult};
pub use forwarder::{FailedRecord, Forwarder, SendReport, SendStatus, DEFAULT_INDIVIDUAL_DELAY};
pub use record::{format_records, OutboundRecord, SkippedRecord, DEFAULT_DEVICE_CODE};
