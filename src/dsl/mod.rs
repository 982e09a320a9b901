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

//! # Router Configuration Language
//!
//! Lexer and incremental statement parser for router configurations.
//!
//! ## Statements
//!
//! ```text
//! src :: FromDevice(eth0);           // declaration
//! q1, q2 :: Queue(100);              // several at once
//! src -> [0] c :: Classifier(12/0800, -) [1] -> q2;
//! c -> Queue(20) -> Discard;         // anonymous elements
//! elementclass Pipe { $n | input -> Queue($n) -> output; }
//! elementclass Fifo Queue;           // synonym
//! require(library extra.click);      // splice an archive member
//! ```
//!
//! The parser is a pull cursor: [`StatementParser::next_statement`] applies
//! one statement to the graph, [`StatementParser::finish`] drains the rest
//! and finalizes the graph.

pub mod lexer;
pub mod parser;

pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParserConfig, StatementParser};
