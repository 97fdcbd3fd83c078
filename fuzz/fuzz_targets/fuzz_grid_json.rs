//! Fuzz target for grid deserialization.
//!
//! # Safety Properties Tested
//! - No panics on arbitrary bytes
//! - Any grid that deserializes has a consistent shape and traces safely

#![no_main]

use libfuzzer_sys::fuzz_target;

use amidakuji::{trace, Lane, RungGrid};

fuzz_target!(|data: &[u8]| {
    let Ok(grid) = serde_json::from_slice::<RungGrid>(data) else {
        return;
    };
    assert!(grid.lane_count() >= amidakuji::MIN_LANES);
    assert!(grid.row_count() >= amidakuji::MIN_ROWS);
    assert_eq!(grid.columns().count(), grid.column_count());
    for start in 0..grid.lane_count().min(64) {
        let path = trace(&grid, Lane::new(start)).expect("start lane is in range");
        assert_eq!(path.start(), Lane::new(start));
    }
});
