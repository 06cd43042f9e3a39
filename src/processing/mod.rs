//! The event normalization and ownership-resolution pipeline.
//!
//! ```text
//! raw block payload ──► BlockEventProcessor ──► BlockResult ──► BatchCoordinator ──► corpus
//!                            │
//!                            ├─ BalanceEventNormalizer (sync)
//!                            ├─ StakeEventNormalizer ──► OwnershipResolver ──► ChainQuery
//!                            └─ legacy stake matcher
//! ```
//!
//! Failures confine themselves to their narrowest scope: a bad field skips one
//! item, a failed resolution skips one event, a failing block skips one block.
//! Nothing here aborts sibling work.

pub mod balance;
pub mod batch;
pub mod block;
pub mod matcher;
pub mod resolver;
pub mod stake;
