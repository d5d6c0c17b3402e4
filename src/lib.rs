pub mod bench;
pub mod catalog;
pub mod column;
pub mod config;
pub mod data_type;
pub mod error;
pub mod index;
pub mod interpreter;
pub mod join;
pub mod predicate;
pub mod relation;
pub mod schema;
pub mod sql;
pub mod value;

pub use catalog::Catalog;
pub use column::Column;
pub use config::PlanConfig;
pub use data_type::DataType;
pub use error::{ConfigError, Error, QueryError, SchemaError};
pub use index::{Index, IndexKind};
pub use interpreter::Interpreter;
pub use join::{Algorithm, JoinCondition, JoinContext, join};
pub use predicate::{CompareOp, Predicate};
pub use relation::{Relation, RelationBuilder, Row};
pub use schema::{ColumnDef, ColumnRef, Schema};
pub use value::Value;
