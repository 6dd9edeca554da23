pub const STEP_COUNT: u8 = 4;

pub const HANG_WARNING: &str = "Processing is taking longer than expected. The server may be \
                                stuck on a large or damaged file; you can keep waiting or cancel.";
pub const CANCEL_HINT: &str = "Type 'c' and press Enter to cancel, 'd' to dismiss messages.";
pub const CANCEL_PROMPT: &str =
    "Are you sure you want to cancel the current processing? Any progress will be lost. [y/N]";
pub const CLEAR_CACHE_PROMPT: &str = "Are you sure you want to clear the processing cache? This will \
                                      free up disk space but may result in slower processing for \
                                      repeat files. [y/N]";
pub const ERRORS_DISMISSED: &str = "Messages dismissed.";
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
