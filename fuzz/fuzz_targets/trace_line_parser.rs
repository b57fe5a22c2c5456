#![no_main]

use libfuzzer_sys::fuzz_target;
use latencia::filter::CallFilter;
use latencia::source::{parse_babeltrace_line, parse_json_line};

fuzz_target!(|data: &[u8]| {
    // Decoders and the filter parser must return errors, never panic
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = parse_babeltrace_line(input, 1);
        let _ = parse_json_line(input, 1);
        let _ = CallFilter::from_expr(input);
    }
});
