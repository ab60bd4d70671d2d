//! modswap Testing Framework
//!
//! Builds real mod modules from WAT and runs them in a throwaway host, so
//! hot reload can be exercised end to end without a host application.

pub mod fixture;
pub mod host;

pub use fixture::{Hooks, ModFixture};
pub use host::{TestHost, Variant};

#[macro_export]
macro_rules! assert_reload_count {
    ($host:expr, $type_name:expr, $expected:expr) => {
        let count = $host.reloader().reload_count_of_type($type_name);
        assert_eq!(
            count, $expected,
            "Expected mod '{}' to be reloaded {} times, but it was reloaded {} times",
            $type_name, $expected, count
        );
    };
}
