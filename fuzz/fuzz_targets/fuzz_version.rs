// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

#![no_main]

use libfuzzer_sys::fuzz_target;
use lazym::{BumpClass, SemanticVersion, bump_version};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    for class in [BumpClass::Major, BumpClass::Minor, BumpClass::Patch] {
        if let Ok(bumped) = bump_version(input, class) {
            // Bumped output must itself be a valid core version.
            let parsed: SemanticVersion = bumped.parse().expect("bump output must parse");
            assert_eq!(parsed.to_string(), bumped);
        }
    }
});
