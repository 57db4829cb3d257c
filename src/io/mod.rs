pub mod checkpoint;
pub mod data;
pub mod idx;
pub mod loss_log;
pub mod preview;

pub use checkpoint::{CheckpointSink, JsonCheckpointSink, NetworkRole};
pub use data::{DataProvider, Dataset, JetTableProvider};
pub use idx::MnistProvider;
pub use loss_log::{CsvLossLog, LossLogSink};
