pub mod changelog;
pub mod issue;
pub mod release;
