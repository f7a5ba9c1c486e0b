/// Build version reported at startup. `HABITS_BUILD_VERSION` set at compile time
/// (e.g. a git describe from CI) wins over the crate version.
pub const VERSION: &str = match option_env!("HABITS_BUILD_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
