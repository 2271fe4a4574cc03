// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::env;
use std::{fs::File, path::Path};

// Use the "built" crate to generate some useful build-time information,
// including the git hash and compiler version. The file lands in OUT_DIR.
fn write_built() {
    built::write_built_file().expect("Failed to acquire build-time information");
}

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR env. variable not defined!");

    // Force the binary to be rebuilt for every release build, so that the
    // embedded build time is accurate.
    if env::var("DEBUG").unwrap() == "false" {
        let p = Path::new(&out_dir).join("rebuild_stamp");
        File::create(&p).unwrap();
        println!("cargo:rerun-if-changed={}", p.display());
    }

    write_built();
}
