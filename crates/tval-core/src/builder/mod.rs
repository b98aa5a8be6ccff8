/*! Fluent API for constructing program modules in code.
 *
 * The builders hand out fresh value and block numbers and keep block parameters in sync with the
 * function signature, so tests and tools can describe a module as a short sequence of calls
 * instead of assembling instruction vectors by hand.
 */

pub mod block_builder;
pub mod function_builder;
pub mod module_builder;

pub use block_builder::BlockBuilder;
pub use function_builder::FunctionBuilder;
pub use module_builder::ModuleBuilder;
