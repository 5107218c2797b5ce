pub mod aggregate;
pub mod exec;
pub mod reduce;

pub use aggregate::collect_all;
pub use exec::exec;
pub use reduce::{reduce_commits, reduce_issues, CommitTotals, IssueTotals};
