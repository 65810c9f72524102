#![no_main]

use dotinterop::metadata::catalog::MetadataCatalog;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = MetadataCatalog::from_metadata(data);
    let _ = MetadataCatalog::from_mem(data.to_vec());
});
