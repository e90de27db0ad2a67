//! The fixed category set the classifier was trained on.
//!
//! Order matters: index `i` of the model's output vector scores
//! `CATEGORIES[i]`.

/// Number of output units the classification head must have.
pub const LABEL_COUNT: usize = 14;

/// Category labels, in classifier output order.
pub const CATEGORIES: [&str; LABEL_COUNT] = [
    "Politics & Government",
    "International Affairs & Defense",
    "Law & Justice",
    "Economics & Finance",
    "Trade & Business",
    "Employment & Labor",
    "Social Affairs & Health",
    "Technology & Science",
    "Transportation",
    "Environment",
    "Agriculture & Food",
    "Energy & Resources",
    "Industry & Manufacturing",
    "Geography & Regional",
];

/// Returns all labels in canonical order.
pub fn all_labels() -> &'static [&'static str] {
    &CATEGORIES
}
