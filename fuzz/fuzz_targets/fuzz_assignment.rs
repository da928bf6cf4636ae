#![no_main]
use bimorph_core::{Assignment, MoveRequest, SafetyCfg};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let parsed: Result<Vec<Assignment>, _> = data.split_whitespace().map(str::parse).collect();
    let Ok(items) = parsed else {
        return;
    };
    if let Ok(req) = MoveRequest::try_from(items)
        && req.validate(&SafetyCfg::default()).is_ok()
    {
        assert!(req.iter().all(|(_, v)| v.is_finite()));
    }
});
