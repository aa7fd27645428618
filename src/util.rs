/// Unwraps a `Result` inside a loop body, skipping to the next iteration (with a debug log) on
/// `Err`.
macro_rules! ok_or_continue {
    ( $e:expr ) => {
        match $e {
            Ok(value) => value,
            Err(e) => {
                log::debug!("skipping: {}", e);
                continue;
            }
        }
    };
}
pub(crate) use ok_or_continue;
