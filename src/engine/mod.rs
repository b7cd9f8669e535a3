//! Audio engine core: buffers, decode, WAV I/O, execution contexts, transport

pub mod buffer;
pub mod context;
pub mod decode;
pub mod io;
pub mod transport;

pub use buffer::AudioBuffer;
pub use context::{AudioEngine, ContextConfig, ExecutionContext};
pub use decode::ProviderFormat;
pub use transport::Transport;
