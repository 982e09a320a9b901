//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Routec.
//! The Routec project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

use std::borrow::Cow;

/// Escapes `&`, `<` and `"` for use inside an XML attribute value. Input
/// that needs no escaping is returned borrowed.
pub fn xml_quote(text: &str) -> Cow<'_, str> {
    let Some(first) = text.find(['&', '<', '"']) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len() + 8);
    out.push_str(&text[..first]);
    for c in text[first..].chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}
