pub mod issue;
pub mod sprint;
