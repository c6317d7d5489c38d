//! Ingredient-list text handling and rule-based risk assessment.
//!
//! - [`normalize`] — canonical text cleanup and comma tokenization into an
//!   [`IngredientList`](normalize::IngredientList).
//! - [`keywords`] — the validated `UNSAFE` / `NEUTRAL_RISK` keyword table.
//! - [`scorer`] — the 0–10 fungal-acne safety score.
//! - [`explain`] — narrative and per-ingredient safe/mild/high highlighting.

pub mod explain;
pub mod keywords;
pub mod normalize;
pub mod scorer;
