/// Database utilities
///
/// - `pool`: connection pool creation with bounded acquire timeouts
/// - `migrations`: embedded migration runner

pub mod migrations;
pub mod pool;
