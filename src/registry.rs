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

//! # Element Class Registry
//!
//! The compiler does not know what element classes exist; an embedding
//! runtime does. A [`ClassRegistry`] answers two questions at compile time:
//! whether a class name resolves to a primitive element, and which
//! capabilities (named interfaces such as `LinkStat`) a class provides.
//!
//! Without a registry every non-compound class is accepted as written and
//! a bare class name in a connection is only recognised once a compound of
//! that name is in scope.

use std::collections::{HashMap, HashSet};

/// Resolves primitive element classes for the compiler.
pub trait ClassRegistry: Send + Sync {
    /// Whether `class` names a primitive element class.
    fn contains(&self, class: &str) -> bool;

    /// Whether `class` provides the named capability. A class always
    /// provides itself.
    fn provides(&self, class: &str, capability: &str) -> bool {
        class == capability && self.contains(class)
    }
}

/// Registry backed by a fixed set of class names.
#[derive(Clone, Debug, Default)]
pub struct StaticRegistry {
    classes: HashSet<String>,
    capabilities: HashMap<String, HashSet<String>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.insert(class.into());
        self
    }

    /// Adds `class`, declaring that it also provides `capabilities`.
    pub fn with_provider<I, S>(mut self, class: impl Into<String>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let class = class.into();
        self.capabilities
            .entry(class.clone())
            .or_default()
            .extend(capabilities.into_iter().map(Into::into));
        self.classes.insert(class);
        self
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for StaticRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            classes: iter.into_iter().map(Into::into).collect(),
            capabilities: HashMap::new(),
        }
    }
}

impl ClassRegistry for StaticRegistry {
    fn contains(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    fn provides(&self, class: &str, capability: &str) -> bool {
        if !self.contains(class) {
            return false;
        }
        class == capability
            || self
                .capabilities
                .get(class)
                .is_some_and(|caps| caps.contains(capability))
    }
}
