//! Offline training path: feature/label tables, promotion of corrected
//! rows, retraining, and evaluation.

mod feedback;
mod table;
mod trainer;

pub use feedback::{join_labels, promote, FeedbackLoop, FeedbackOutcome, PromotionReport};
pub use table::{
    feature_records, label_records, read_table, read_table_from, write_table, write_table_to,
    CorpusRecord, FeatureRecord, LabelRecord, RowKey,
};
pub use trainer::{build_samples, evaluate, split_indices, train, TrainingParams, TrainingSamples};
