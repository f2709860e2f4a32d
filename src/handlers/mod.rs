pub mod outcome;

pub use outcome::{OutcomeHandler, RedirectPolicy};
