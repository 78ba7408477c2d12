//! M-NET Protocol Library
//!
//! Passive decoding of the M-NET HVAC controller bus. Everything here is
//! synchronous and free of I/O: bytes go in one at a time, events come out.
//!
//! - **Framing**: [`Framer`] reassembles frames from a byte stream using the
//!   self-describing length byte, validates the additive checksum and the
//!   trailing ACK/NAK, and resynchronizes after faults without lookahead
//! - **Filtering**: [`UnitFilter`] limits output to frames to or from one unit
//! - **Dispatch**: [`dispatch()`] classifies a frame against an ordered table of
//!   masked byte patterns ([`FORMAT_TABLE`])
//! - **Decoding**: [`DecodedFrame`] carries the structured meaning (power,
//!   mode, fan speed, temperatures, acknowledgements)
//! - **Per-line glue**: [`LineDecoder`] adds idle-gap handling and frame
//!   timing; [`LineRenderer`] formats the result as text
//!
//! # Example
//!
//! ```rust
//! use std::time::Instant;
//! use mnet_protocol::{encode_frame, DecoderEvent, LineDecoder, UnitFilter, Variant, ACK};
//!
//! // Unit 01 asks unit 02 for its setpoint; 02 acknowledges
//! let bytes = encode_frame([0xBD, 0x01, 0x02, 0x7F], &[0x25, 0x01], ACK);
//!
//! let mut decoder = LineDecoder::new(UnitFilter::disabled());
//! let events = decoder.push_bytes(&bytes, Instant::now());
//!
//! match &events[0] {
//!     DecoderEvent::Frame { frame, .. } => {
//!         assert_eq!(frame.variant, Variant::SetpointGet);
//!         assert_eq!(frame.description(), "get setpoint temp");
//!     }
//!     other => panic!("unexpected event: {:?}", other),
//! }
//! ```

pub mod checksum;
pub mod command;
pub mod decode;
pub mod decoder;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod filter;
pub mod frame;
pub mod framer;

pub use checksum::Checksum;
pub use command::{FanSpeed, Mode, PowerState, RunState, Temperature};
pub use decode::{decode, Decoded, DecodedFrame};
pub use decoder::{DecoderEvent, DeltaClock, LineDecoder, LineInput};
pub use dispatch::{dispatch, FormatRule, Variant, Window, FORMAT_TABLE};
pub use display::{LineRenderer, SessionContext, BRIDGE_COLUMN};
pub use error::{FrameError, ParseError};
pub use filter::UnitFilter;
pub use frame::{
    encode_frame, Address, Frame, Handshake, Role, ACK, BRIDGE_ADDR, MAX_DATA_LEN, NAK,
};
pub use framer::{Framer, Ingested, Phase, SkipReason};
