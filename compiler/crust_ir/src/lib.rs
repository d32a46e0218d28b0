//! Intermediate representation for the Crust C99 front-end.
//!
//! The semantic core lowers a translation unit into a [`Module`]: ordered
//! globals, ordered functions, and a [`TypeMap`] of record layouts. Each
//! function body is a linear list of [`Inst`]ructions over a small typed
//! opcode set; during construction the body is an [`InstStream`] — a
//! doubly-linked list with a cursor and a separate alloca-tail cursor so
//! stack allocations stay grouped at function entry.
//!
//! # Pipeline Position
//!
//! ```text
//! crust_ast → crust_sema → **crust_ir** → optimizer / code generation
//! ```

mod inst;
mod module;
mod stream;
mod target;
mod types;
mod value;

pub use inst::{BinOp, CastOp, Inst};
pub use module::{Global, IrFunction, Module};
pub use stream::{InstId, InstStream};
pub use target::Target;
pub use types::{IrType, RecordField, RecordId, RecordLayout, TypeMap};
pub use value::{IrConst, IrValue, IrVar};
