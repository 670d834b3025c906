//! Re-exports of `mockall`-generated mocks for trait boundaries other
//! crates need to stand up in integration tests without a real agent
//! backend or trigger clock.

pub use crate::nodes::agent::MockAgentRunner;
