//! The processing round: validates declarations, resolves every DAO method
//! and writes the implementations.

mod converter_processor;
mod dao_processor;
mod query_method;
mod round;
mod shortcut_method;
mod transaction_method;

pub use converter_processor::process_converters;
pub use dao_processor::{process_dao, DaoEnv};
pub use query_method::{process_query_method, MethodBinder, QueryMethod};
pub use round::{run_round, RoundOutput};
pub use shortcut_method::{process_shortcut_method, ShortcutMethod};
pub use transaction_method::{process_transaction_method, TransactionMethod};
