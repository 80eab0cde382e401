pub mod machine;

pub use machine::{next_status, LifecycleAction, LifecycleTransitionError, TransitionOutcome};
