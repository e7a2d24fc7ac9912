pub mod cpal_device;
pub mod device;
pub mod format;
pub mod keyboard;
pub mod memory_source;
pub mod sample_source;
pub mod tone;

pub use cpal_device::CpalOutputDevice;
pub use device::{AudioOutputDevice, BufferRegion, DeviceError};
pub use format::{AudioFormat, SampleFormat};
pub use keyboard::{ControlInput, KeyboardTone, TerminalControl, ToneCommand};
pub use memory_source::{DecodedMemorySource, MemorySource, PcmSample, RawMemorySource};
pub use sample_source::{FillOutcome, SampleSource};
pub use tone::ToneGenerator;
