/// Most entries a durable queue accepts in one batch send
pub const MAX_QUEUE_BATCH: usize = 10;
/// Most work units the fan-out relay accepts in one invocation group
pub const MAX_INVOCATION_GROUP: usize = 50;
/// Largest queue message body accepted by the local queue (256 KiB)
pub const MAX_MESSAGE_BYTES: usize = 256 * 1024;

/// Pending invocations below this get no concurrency reservation
pub const DEFAULT_RESERVATION_THRESHOLD: usize = 100;
/// Slots reserved on top of the pending invocation count
pub const DEFAULT_RESERVATION_HEADROOM: u32 = 10;
pub const DEFAULT_PROPAGATION_DELAY_MS: u64 = 2_000;

pub const DEFAULT_INVOKE_DELAY_MS: u64 = 3_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;

/// Receives before a message moves to the dead-letter queue
pub const DEFAULT_MAX_RECEIVE_COUNT: u32 = 3;

pub const DEFAULT_UNIT_COUNT: u64 = 5;
pub const DEFAULT_ITEMS_PER_UNIT: u64 = 2;
pub const DEFAULT_PROC_COUNT: u32 = 2;

/// Column holding the domain in `rank,tld_rank,domain,...` rows
pub const DEFAULT_DOMAIN_COLUMN: usize = 2;

pub const DEFAULT_OUTPUT_KEY: &str = "robots.json.gz";
pub const DEFAULT_LIST_PAGE_SIZE: usize = 1_000;
/// Most keys removed by one batch delete
pub const MAX_DELETE_BATCH: usize = 1_000;

pub const DEFAULT_ACCOUNT_CONCURRENCY_LIMIT: u32 = 1_000;
pub const DEFAULT_LOG_PAGE_SIZE: usize = 50;
pub const DEFAULT_CONSUMER_POLL_MS: u64 = 20;
