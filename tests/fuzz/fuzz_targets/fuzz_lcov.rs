#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parser and suggestion engine must not panic on any input.
    let text = String::from_utf8_lossy(data);
    let files = movecov::parsers::lcov::parse(&text);
    let _ = movecov::analyze::LcovReport::build(&files, None);
});
