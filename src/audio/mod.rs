pub mod ffmpeg;
pub mod recorder;

pub use ffmpeg::FfmpegRecorder;
pub use recorder::{AudioSource, Recorder, RecorderError};
