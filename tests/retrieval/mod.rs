//! Retrieval scenarios driven through the public API with in-memory stores.

mod support;
mod test_fallback;
mod test_scenarios;
