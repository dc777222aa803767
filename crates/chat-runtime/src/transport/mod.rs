//! WebSocket transport.

pub mod frames;
pub mod ws;

pub use frames::{decode_frame, encode_event, ClientFrame, FrameError};
pub use ws::serve_socket;
