//! Support for integration tests: throwaway SQLite databases with migrations applied.
pub mod prepare_env;
