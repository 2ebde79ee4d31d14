//! Well-known embedding models, search strategies and result columns.
//!
//! The worker decides what it actually supports; these lists only drive
//! selection menus and warnings.

/// Embedding models offered by the benchmark form.
pub const KNOWN_MODELS: &[&str] = &[
    "google/bert_uncased_L-12_H-768_A-12",
    "all-MiniLM-L6-v2",
    "allenai/scibert_scivocab_uncased",
    "emilyalsentzer/Bio_ClinicalBERT",
];

/// Euclidean distance.
pub const STRATEGY_L2: &str = "l2";

/// Cosine similarity.
pub const STRATEGY_COSINE: &str = "cosine";

/// Inner product.
pub const STRATEGY_IP: &str = "ip";

/// Vector search strategies offered by the benchmark form.
pub const KNOWN_STRATEGIES: &[&str] = &[STRATEGY_L2, STRATEGY_COSINE, STRATEGY_IP];

/// Column names of the benchmark result table, in display order.
pub const RESULT_COLUMNS: [&str; 7] = [
    "Embedding Model",
    "DB Type",
    "Strategy",
    "Average k",
    "Sigma",
    "Frequency",
    "Queries",
];

pub fn is_known_model(model: &str) -> bool {
    KNOWN_MODELS.contains(&model)
}

pub fn is_known_strategy(strategy: &str) -> bool {
    KNOWN_STRATEGIES.contains(&strategy)
}
