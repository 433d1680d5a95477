use std::num::NonZeroUsize;

pub const DEFAULT_DUMP_DIR: &str = "./dumps";
pub const DEFAULT_TTL_SECS: u64 = 3600;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_KEEP_COUNT: NonZeroUsize = NonZeroUsize::new(3).unwrap();
pub const DEFAULT_PG_DUMP_PROGRAM: &str = "pg_dump";

pub const DEFAULT_LOG_DIR: &str = "./logs";
pub const DEFAULT_LOG_MAX_FILES: usize = 7;

/// Upper bound on generator diagnostics kept in an error message.
pub const MAX_GENERATOR_STDERR_BYTES: usize = 4096;

/// Read size used when compressing generator output.
pub const GENERATOR_READ_CHUNK_BYTES: usize = 64 * 1024;
