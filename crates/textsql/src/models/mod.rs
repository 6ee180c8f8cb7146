pub mod column;
pub mod value;

pub use column::{Column, ColumnType, ResultColumn};
pub use value::Value;
