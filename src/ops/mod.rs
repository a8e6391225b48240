pub mod cursor;
pub mod edit_session;
pub mod tree_ops;
