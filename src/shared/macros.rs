/***************************************/
/*               Macros                */
/***************************************/

/// Unwraps a start-up result or logs the error and terminates the process.
#[macro_export]
macro_rules! unwrap_or_exit {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => {
                log::error!("ERROR: {}", e);
                std::process::exit(1);
            }
        }
    };
}
