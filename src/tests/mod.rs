pub mod common;

mod concurrent_issue;
