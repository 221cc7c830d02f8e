pub mod concurrency;
pub mod function;
pub mod invoker;
pub mod logs;
pub mod queue;
pub mod storage;

pub use concurrency::ConcurrencyPlatform;
pub use function::{RowTask, WorkerFunction};
pub use invoker::{FunctionInvoker, LogType, RawInvocationResponse};
pub use logs::{ExecutionLogSource, LogEvent, LogEventsPage};
pub use queue::{BatchEntryFailure, QueueAttributes, SendBatchOutput, WorkQueue};
pub use storage::{list_all, ListPage, ObjectStore, ObjectSummary};
