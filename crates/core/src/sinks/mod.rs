pub mod channel_sink;
pub mod log_sink;
pub mod printer_sink;

pub use channel_sink::ChannelSink;
pub use log_sink::LogSink;
pub use printer_sink::PrinterSink;
