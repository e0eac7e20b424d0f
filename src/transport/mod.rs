//! Chat transport shims
//!
//! The core only speaks the inbound-event/notice contract; everything
//! network-shaped lives here. `parser` turns raw command text into
//! [`crate::types::InboundEvent`]s, `console` is a line-oriented local
//! transport for development.

pub mod console;
pub mod parser;

// Re-export commonly used types
pub use console::{ConsoleNoticePublisher, ConsoleTransport};
pub use parser::{parse_command, parse_event, ParsedCommand};
